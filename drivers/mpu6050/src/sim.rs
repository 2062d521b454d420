//! Simulated bus controller
//!
//! Emulates a single register-file device behind a [`BusController`]: the
//! first byte written after the address sets the register pointer, further
//! bytes are stored with auto-increment, and reads stream out from the
//! pointer. Faults can be injected per register, per address byte, per
//! payload byte, per read, or for the whole device. Every executed
//! transaction is logged.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::bus::{BusConfig, BusController, Direction, Phase, Stage, Transaction};
use crate::{reg, DEFAULT_ADDRESS, WHO_AM_I_RESPONSE};

/// Failure reported by the simulated controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimStatus {
    /// Install rejected (pins already claimed)
    InstallFailed,
    /// Nobody acknowledged the address byte
    AddressNack,
    /// Device NACKed a written byte
    DataNack,
    /// Transaction exceeded its timeout
    Timeout,
}

/// One executed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub stage: Stage,
    pub address: u8,
    pub register: Option<u8>,
    pub len: usize,
    pub timeout: Duration,
    pub ok: bool,
}

struct SimState {
    address: u8,
    registers: [u8; 256],
    pointer: u8,
    present: bool,
    fail_install: bool,
    register_faults: Vec<(u8, usize)>,
    address_faults: Vec<(Direction, usize)>,
    payload_faults: usize,
    read_faults: usize,
    installed: Option<BusConfig>,
    installs: usize,
    open_links: usize,
    peak_links: usize,
    log: Vec<Record>,
    // Set between the write-address byte and the register byte
    pointer_pending: bool,
}

impl SimState {
    fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            pointer: 0,
            present: true,
            fail_install: false,
            register_faults: Vec::new(),
            address_faults: Vec::new(),
            payload_faults: 0,
            read_faults: 0,
            installed: None,
            installs: 0,
            open_links: 0,
            peak_links: 0,
            log: Vec::new(),
            pointer_pending: false,
        }
    }

    fn take_register_fault(&mut self, register: u8) -> bool {
        if let Some(entry) = self
            .register_faults
            .iter_mut()
            .find(|(r, remaining)| *r == register && *remaining > 0)
        {
            entry.1 -= 1;
            return true;
        }
        false
    }

    fn take_address_fault(&mut self, direction: Direction) -> bool {
        if let Some(entry) = self
            .address_faults
            .iter_mut()
            .find(|(d, remaining)| *d == direction && *remaining > 0)
        {
            entry.1 -= 1;
            return true;
        }
        false
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), SimStatus> {
        if self.pointer_pending {
            if self.take_register_fault(byte) {
                return Err(SimStatus::DataNack);
            }
            self.pointer = byte;
            self.pointer_pending = false;
        } else {
            if self.payload_faults > 0 {
                self.payload_faults -= 1;
                return Err(SimStatus::DataNack);
            }
            self.registers[self.pointer as usize] = byte;
            self.pointer = self.pointer.wrapping_add(1);
        }
        Ok(())
    }

    fn apply(&mut self, phase: Phase<'_>) -> Result<(), SimStatus> {
        match phase {
            Phase::Start => {
                self.pointer_pending = false;
                Ok(())
            }
            Phase::Address { address, direction } => {
                if !self.present
                    || address != self.address
                    || self.take_address_fault(direction)
                {
                    return Err(SimStatus::AddressNack);
                }
                self.pointer_pending = direction == Direction::Write;
                Ok(())
            }
            Phase::WriteByte(byte) => self.write_byte(byte),
            Phase::Write(data) => data.iter().try_for_each(|&b| self.write_byte(b)),
            Phase::Read { buf } => {
                if self.read_faults > 0 {
                    self.read_faults -= 1;
                    return Err(SimStatus::Timeout);
                }
                for byte in buf.iter_mut() {
                    *byte = self.registers[self.pointer as usize];
                    self.pointer = self.pointer.wrapping_add(1);
                }
                Ok(())
            }
            Phase::Stop => Ok(()),
        }
    }
}

/// Command resource held for the duration of one `execute`
struct LinkGuard(Rc<RefCell<SimState>>);

impl LinkGuard {
    fn open(state: &Rc<RefCell<SimState>>) -> Self {
        {
            let mut s = state.borrow_mut();
            s.open_links += 1;
            s.peak_links = s.peak_links.max(s.open_links);
        }
        Self(state.clone())
    }
}

impl Drop for LinkGuard {
    fn drop(&mut self) {
        self.0.borrow_mut().open_links -= 1;
    }
}

/// Cloneable handle to a simulated device on a simulated bus
///
/// Clones share state, so a test can keep one handle for inspection while
/// the engine owns another.
#[derive(Clone)]
pub struct SimBus {
    state: Rc<RefCell<SimState>>,
}

impl SimBus {
    /// Empty register file answering at `address`
    pub fn new(address: u8) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState::new(address))),
        }
    }

    /// MPU-6050 at its default address with power-on register values
    pub fn mpu6050() -> Self {
        let sim = Self::new(DEFAULT_ADDRESS);
        sim.set_register(reg::WHO_AM_I, WHO_AM_I_RESPONSE);
        sim.set_register(reg::PWR_MGMT_1, 0x40);
        sim
    }

    pub fn set_register(&self, register: u8, value: u8) {
        self.state.borrow_mut().registers[register as usize] = value;
    }

    /// Store `data` starting at `start`, wrapping at the end of the map
    pub fn set_block(&self, start: u8, data: &[u8]) {
        let mut s = self.state.borrow_mut();
        let mut register = start;
        for &b in data {
            s.registers[register as usize] = b;
            register = register.wrapping_add(1);
        }
    }

    pub fn register(&self, register: u8) -> u8 {
        self.state.borrow().registers[register as usize]
    }

    /// Disconnect or reconnect the device
    pub fn set_present(&self, present: bool) {
        self.state.borrow_mut().present = present;
    }

    /// Reject the next install
    pub fn fail_install(&self) {
        self.state.borrow_mut().fail_install = true;
    }

    /// NACK the next `times` transactions that address `register`
    pub fn fail_register(&self, register: u8, times: usize) {
        self.state
            .borrow_mut()
            .register_faults
            .push((register, times));
    }

    /// NACK the next `times` address bytes sent with `direction`
    pub fn fail_address(&self, direction: Direction, times: usize) {
        self.state
            .borrow_mut()
            .address_faults
            .push((direction, times));
    }

    /// NACK the next `times` data bytes written after the register pointer
    pub fn fail_payload(&self, times: usize) {
        self.state.borrow_mut().payload_faults += times;
    }

    /// Time out the next `times` read transactions
    pub fn fail_reads(&self, times: usize) {
        self.state.borrow_mut().read_faults += times;
    }

    pub fn installs(&self) -> usize {
        self.state.borrow().installs
    }

    pub fn installed_config(&self) -> Option<BusConfig> {
        self.state.borrow().installed
    }

    /// Command resources currently held
    pub fn open_links(&self) -> usize {
        self.state.borrow().open_links
    }

    /// Highest number of command resources ever held at once
    pub fn peak_links(&self) -> usize {
        self.state.borrow().peak_links
    }

    pub fn log(&self) -> Vec<Record> {
        self.state.borrow().log.clone()
    }

    /// Number of executed transactions of a given kind
    pub fn count(&self, stage: Stage) -> usize {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|r| r.stage == stage)
            .count()
    }

    /// Number of select transactions that targeted `register`
    pub fn selects_of(&self, register: u8) -> usize {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|r| r.stage == Stage::Select && r.register == Some(register))
            .count()
    }
}

impl BusController for SimBus {
    type Status = SimStatus;

    fn install(&mut self, config: &BusConfig) -> Result<(), SimStatus> {
        let mut s = self.state.borrow_mut();
        if s.fail_install {
            s.fail_install = false;
            return Err(SimStatus::InstallFailed);
        }
        s.installs += 1;
        s.installed = Some(*config);
        Ok(())
    }

    fn execute(
        &mut self,
        transaction: &mut Transaction<'_>,
        timeout: Duration,
    ) -> Result<(), SimStatus> {
        let _link = LinkGuard::open(&self.state);
        let mut s = self.state.borrow_mut();

        let stage = transaction.stage();
        let address = transaction.address();
        let register = transaction.register();
        let len = transaction.data_len();

        let result = transaction.visit(|phase| s.apply(phase));

        s.log.push(Record {
            stage,
            address,
            register,
            len,
            timeout,
            ok: result.is_ok(),
        });
        result
    }
}
