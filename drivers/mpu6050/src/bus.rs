//! Phase-level I2C transaction engine
//!
//! Register access is expressed as short, single-use [`Transaction`]s that
//! expand into an ordered list of [`Phase`]s (start, address byte, register,
//! data, stop). A [`BusController`] executes one transaction atomically with
//! a timeout; [`BusEngine`] chains them into register reads and writes.
//!
//! The engine performs no retries and no locking. Exclusive access to the bus
//! is expressed through `&mut self`.

use core::fmt::Debug;
use core::time::Duration;

#[cfg(feature = "logging")]
use log::info;

use crate::Error;

/// Default I2C port
pub const DEFAULT_PORT: u8 = 0;
/// Default SDA GPIO
pub const DEFAULT_SDA_PIN: i32 = 14;
/// Default SCL GPIO
pub const DEFAULT_SCL_PIN: i32 = 2;
/// Default clock-stretch allowance in controller ticks
pub const DEFAULT_CLOCK_STRETCH_TICKS: u32 = 300;
/// Standard mode (100 kHz)
pub const DEFAULT_CLOCK_HZ: u32 = 100_000;

/// Transfer direction, encoded in the low bit of the address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    /// Master writes to the device (0)
    Write = 0,
    /// Master reads from the device (1)
    Read = 1,
}

/// Compose the byte sent right after a start condition
///
/// The 7-bit address is shifted left by one to make room for the direction
/// bit.
pub const fn address_byte(address: u8, direction: Direction) -> u8 {
    (address << 1) | direction as u8
}

/// One step of a bus transaction
#[derive(Debug)]
pub enum Phase<'a> {
    /// Start (or repeated start) condition
    Start,
    /// Address byte with direction bit, ACK checked
    Address { address: u8, direction: Direction },
    /// Single byte written by the master, ACK checked
    WriteByte(u8),
    /// Byte run written by the master, ACK checked on each byte
    Write(&'a [u8]),
    /// Byte run read into `buf`; the master ACKs every byte but the last
    Read { buf: &'a mut [u8] },
    /// Stop condition
    Stop,
}

/// Which engine transaction a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Register pointer write ahead of a read
    Select,
    /// Data read following a select
    Read,
    /// Register write
    Write,
}

/// An atomic, single-use bus command sequence
#[derive(Debug)]
pub enum Transaction<'a> {
    /// start, address|W, register, stop
    Select { address: u8, register: u8 },
    /// start, address|R, read `buf.len()` bytes (last NACKed), stop
    Read { address: u8, buf: &'a mut [u8] },
    /// start, address|W, register, data..., stop
    Write {
        address: u8,
        register: u8,
        data: &'a [u8],
    },
}

impl<'a> Transaction<'a> {
    pub fn stage(&self) -> Stage {
        match self {
            Transaction::Select { .. } => Stage::Select,
            Transaction::Read { .. } => Stage::Read,
            Transaction::Write { .. } => Stage::Write,
        }
    }

    /// 7-bit device address this transaction targets
    pub fn address(&self) -> u8 {
        match self {
            Transaction::Select { address, .. }
            | Transaction::Read { address, .. }
            | Transaction::Write { address, .. } => *address,
        }
    }

    /// Register byte carried by the transaction, if any
    pub fn register(&self) -> Option<u8> {
        match self {
            Transaction::Select { register, .. } | Transaction::Write { register, .. } => {
                Some(*register)
            }
            Transaction::Read { .. } => None,
        }
    }

    /// Number of payload bytes moved after the register byte
    pub fn data_len(&self) -> usize {
        match self {
            Transaction::Select { .. } => 0,
            Transaction::Read { buf, .. } => buf.len(),
            Transaction::Write { data, .. } => data.len(),
        }
    }

    /// Walk the phases in bus order
    ///
    /// Stops at the first phase the visitor rejects and returns its error.
    pub fn visit<E>(&mut self, mut visit: impl FnMut(Phase<'_>) -> Result<(), E>) -> Result<(), E> {
        match self {
            Transaction::Select { address, register } => {
                visit(Phase::Start)?;
                visit(Phase::Address {
                    address: *address,
                    direction: Direction::Write,
                })?;
                visit(Phase::WriteByte(*register))?;
                visit(Phase::Stop)
            }
            Transaction::Read { address, buf } => {
                visit(Phase::Start)?;
                visit(Phase::Address {
                    address: *address,
                    direction: Direction::Read,
                })?;
                visit(Phase::Read { buf: &mut **buf })?;
                visit(Phase::Stop)
            }
            Transaction::Write {
                address,
                register,
                data,
            } => {
                visit(Phase::Start)?;
                visit(Phase::Address {
                    address: *address,
                    direction: Direction::Write,
                })?;
                visit(Phase::WriteByte(*register))?;
                visit(Phase::Write(*data))?;
                visit(Phase::Stop)
            }
        }
    }
}

/// Physical bus instance settings
///
/// Created once at startup and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Controller index
    pub port: u8,
    /// Data line GPIO
    pub sda_pin: i32,
    /// Clock line GPIO
    pub scl_pin: i32,
    /// Internal pull-ups on both lines
    pub pullups: bool,
    /// How long a slave may hold SCL low, in controller ticks.
    ///
    /// Needs validation against the target hardware; the default is an
    /// empirical value.
    pub clock_stretch_ticks: u32,
    /// SCL frequency
    pub clock_hz: u32,
}

impl BusConfig {
    /// Master configuration with pull-ups enabled on both lines
    pub const fn new(port: u8, sda_pin: i32, scl_pin: i32) -> Self {
        Self {
            port,
            sda_pin,
            scl_pin,
            pullups: true,
            clock_stretch_ticks: DEFAULT_CLOCK_STRETCH_TICKS,
            clock_hz: DEFAULT_CLOCK_HZ,
        }
    }

    pub const fn with_clock_stretch(mut self, ticks: u32) -> Self {
        self.clock_stretch_ticks = ticks;
        self
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT, DEFAULT_SDA_PIN, DEFAULT_SCL_PIN)
    }
}

/// Low-level bus controller able to run one transaction at a time
///
/// Implementations allocate whatever command resource the hardware needs for
/// a single `execute` call and must release it on every exit path.
pub trait BusController {
    /// Controller-specific status reported on failure
    type Status: Debug;

    /// Claim the pins and install the controller in master mode
    fn install(&mut self, config: &BusConfig) -> Result<(), Self::Status>;

    /// Run every phase of `transaction` as one atomic command
    fn execute(
        &mut self,
        transaction: &mut Transaction<'_>,
        timeout: Duration,
    ) -> Result<(), Self::Status>;
}

/// Register-level access to a single bus instance
///
/// Only obtainable through [`BusEngine::initialize`], which consumes the
/// controller, so a bus cannot be installed twice.
pub struct BusEngine<C> {
    controller: C,
    config: BusConfig,
}

impl<C: BusController> BusEngine<C> {
    /// Install the controller in master mode
    ///
    /// Fails with [`Error::BusConfig`] if the pins are already claimed or the
    /// controller rejects the configuration.
    pub fn initialize(mut controller: C, config: BusConfig) -> Result<Self, Error<C::Status>> {
        controller.install(&config).map_err(Error::BusConfig)?;

        #[cfg(feature = "logging")]
        info!(
            "I2C{} master ready (sda={}, scl={}, stretch={})",
            config.port, config.sda_pin, config.scl_pin, config.clock_stretch_ticks
        );

        Ok(Self { controller, config })
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Read `out.len()` bytes starting at `register`
    ///
    /// Runs a select transaction followed by a read transaction, each with
    /// the full `timeout`. The read is never attempted if the select fails.
    pub fn read_register(
        &mut self,
        address: u8,
        timeout: Duration,
        register: u8,
        out: &mut [u8],
    ) -> Result<(), Error<C::Status>> {
        self.submit(Transaction::Select { address, register }, timeout)?;
        self.submit(Transaction::Read { address, buf: out }, timeout)
    }

    /// Write all of `data` starting at `register` in one transaction
    pub fn write_register(
        &mut self,
        address: u8,
        timeout: Duration,
        register: u8,
        data: &[u8],
    ) -> Result<(), Error<C::Status>> {
        self.submit(
            Transaction::Write {
                address,
                register,
                data,
            },
            timeout,
        )
    }

    fn submit(
        &mut self,
        mut transaction: Transaction<'_>,
        timeout: Duration,
    ) -> Result<(), Error<C::Status>> {
        let stage = transaction.stage();
        self.controller
            .execute(&mut transaction, timeout)
            .map_err(|status| Error::Bus { stage, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBus, SimStatus};

    const TIMEOUT: Duration = Duration::from_millis(1000);

    fn phases(transaction: &mut Transaction<'_>) -> Vec<String> {
        let mut out = Vec::new();
        transaction
            .visit(|phase| {
                out.push(match phase {
                    Phase::Start => "start".to_string(),
                    Phase::Address { address, direction } => {
                        format!("addr {:#04x}", address_byte(address, direction))
                    }
                    Phase::WriteByte(b) => format!("byte {:#04x}", b),
                    Phase::Write(data) => format!("write {}", data.len()),
                    Phase::Read { buf } => format!("read {}", buf.len()),
                    Phase::Stop => "stop".to_string(),
                });
                Ok::<(), ()>(())
            })
            .unwrap();
        out
    }

    #[test]
    fn test_address_byte() {
        assert_eq!(address_byte(0x68, Direction::Write), 0xD0);
        assert_eq!(address_byte(0x68, Direction::Read), 0xD1);
        assert_eq!(address_byte(0x7F, Direction::Read), 0xFF);
    }

    #[test]
    fn test_select_phases() {
        let mut txn = Transaction::Select {
            address: 0x68,
            register: 0x75,
        };
        assert_eq!(
            phases(&mut txn),
            ["start", "addr 0xd0", "byte 0x75", "stop"]
        );
        assert_eq!(txn.stage(), Stage::Select);
        assert_eq!(txn.register(), Some(0x75));
    }

    #[test]
    fn test_read_phases_nack_last() {
        let mut buf = [0u8; 14];
        let mut txn = Transaction::Read {
            address: 0x68,
            buf: &mut buf,
        };
        assert_eq!(
            phases(&mut txn),
            ["start", "addr 0xd1", "read 14", "stop"]
        );
        assert_eq!(txn.data_len(), 14);
        assert_eq!(txn.register(), None);
    }

    #[test]
    fn test_write_phases() {
        let data = [0x04];
        let mut txn = Transaction::Write {
            address: 0x68,
            register: 0x1A,
            data: &data,
        };
        assert_eq!(
            phases(&mut txn),
            ["start", "addr 0xd0", "byte 0x1a", "write 1", "stop"]
        );
    }

    #[test]
    fn test_visit_stops_at_first_error() {
        let mut txn = Transaction::Select {
            address: 0x68,
            register: 0x75,
        };
        let mut seen = 0;
        let result = txn.visit(|phase| {
            seen += 1;
            match phase {
                Phase::Address { .. } => Err("nack"),
                _ => Ok(()),
            }
        });
        assert_eq!(result, Err("nack"));
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_initialize_installs_once() {
        let sim = SimBus::mpu6050();
        let config = BusConfig::default().with_clock_stretch(450);
        let engine = BusEngine::initialize(sim.clone(), config).unwrap();

        assert_eq!(sim.installs(), 1);
        assert_eq!(sim.installed_config(), Some(config));
        assert!(engine.config().pullups);
        assert_eq!(engine.config().clock_stretch_ticks, 450);
    }

    #[test]
    fn test_initialize_failure() {
        let sim = SimBus::mpu6050();
        sim.fail_install();
        match BusEngine::initialize(sim.clone(), BusConfig::default()) {
            Err(Error::BusConfig(SimStatus::InstallFailed)) => {}
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let sim = SimBus::mpu6050();
        let mut engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();

        let cases: [(u8, &[u8]); 4] = [
            (0x00, &[0xAB]),
            (0x1A, &[0x04]),
            (0x3B, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]),
            (0xFE, &[0x55, 0xAA]),
        ];

        for (register, data) in cases {
            engine.write_register(0x68, TIMEOUT, register, data).unwrap();
            let mut out = [0u8; 14];
            let out = &mut out[..data.len()];
            engine.read_register(0x68, TIMEOUT, register, out).unwrap();
            assert_eq!(out, data, "register {:#04x}", register);
        }
    }

    #[test]
    fn test_read_skips_data_phase_when_select_fails() {
        let sim = SimBus::mpu6050();
        let mut engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();
        sim.fail_register(0x75, 1);

        let mut out = [0u8; 1];
        match engine.read_register(0x68, TIMEOUT, 0x75, &mut out) {
            Err(Error::Bus {
                stage: Stage::Select,
                status: SimStatus::DataNack,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(sim.count(Stage::Select), 1);
        assert_eq!(sim.count(Stage::Read), 0);
    }

    #[test]
    fn test_read_phase_failure() {
        let sim = SimBus::mpu6050();
        let mut engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();
        sim.fail_reads(1);

        let mut out = [0u8; 14];
        match engine.read_register(0x68, TIMEOUT, 0x3B, &mut out) {
            Err(Error::Bus {
                stage: Stage::Read,
                status: SimStatus::Timeout,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }

        // Next read goes through
        engine.read_register(0x68, TIMEOUT, 0x3B, &mut out).unwrap();
    }

    #[test]
    fn test_read_address_nack_after_select() {
        let sim = SimBus::mpu6050();
        let mut engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();
        sim.fail_address(Direction::Read, 1);

        let mut out = [0u8; 1];
        match engine.read_register(0x68, TIMEOUT, 0x75, &mut out) {
            Err(Error::Bus {
                stage: Stage::Read,
                status: SimStatus::AddressNack,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(sim.count(Stage::Select), 1);
        assert_eq!(sim.count(Stage::Read), 1);
        assert_eq!(out, [0]);

        engine.read_register(0x68, TIMEOUT, 0x75, &mut out).unwrap();
        assert_eq!(out, [0x68]);
    }

    #[test]
    fn test_write_payload_nack() {
        let sim = SimBus::mpu6050();
        let mut engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();
        sim.fail_payload(1);

        match engine.write_register(0x68, TIMEOUT, 0x1A, &[0x04]) {
            Err(Error::Bus {
                stage: Stage::Write,
                status: SimStatus::DataNack,
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(sim.register(0x1A), 0x00);

        engine.write_register(0x68, TIMEOUT, 0x1A, &[0x04]).unwrap();
        assert_eq!(sim.register(0x1A), 0x04);
    }

    #[test]
    fn test_write_fails_on_any_nacked_phase() {
        let inject: [fn(&SimBus); 3] = [
            |sim| sim.fail_address(Direction::Write, 1),
            |sim| sim.fail_register(0x6B, 1),
            |sim| sim.fail_payload(1),
        ];
        for (i, fault) in inject.iter().enumerate() {
            let sim = SimBus::mpu6050();
            let mut engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();
            fault(&sim);

            assert!(
                matches!(
                    engine.write_register(0x68, TIMEOUT, 0x6B, &[0x01]),
                    Err(Error::Bus {
                        stage: Stage::Write,
                        ..
                    })
                ),
                "fault {}",
                i
            );
            assert_eq!(sim.register(0x6B), 0x40, "fault {}", i);
            assert_eq!(sim.open_links(), 0);
        }
    }

    #[test]
    fn test_absent_device_nacks_every_operation() {
        let sim = SimBus::mpu6050();
        let mut engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();
        sim.set_present(false);

        let mut out = [0u8; 2];
        assert!(matches!(
            engine.read_register(0x68, TIMEOUT, 0x3B, &mut out),
            Err(Error::Bus {
                stage: Stage::Select,
                status: SimStatus::AddressNack
            })
        ));
        assert!(matches!(
            engine.write_register(0x68, TIMEOUT, 0x6B, &[1]),
            Err(Error::Bus {
                stage: Stage::Write,
                status: SimStatus::AddressNack
            })
        ));
        // Wrong address behaves like an absent device
        sim.set_present(true);
        assert!(matches!(
            engine.write_register(0x69, TIMEOUT, 0x6B, &[1]),
            Err(Error::Bus {
                status: SimStatus::AddressNack,
                ..
            })
        ));
    }

    #[test]
    fn test_links_released_on_every_path() {
        let sim = SimBus::mpu6050();
        let mut engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();
        let mut out = [0u8; 14];

        engine.read_register(0x68, TIMEOUT, 0x3B, &mut out).unwrap();
        sim.fail_register(0x3B, 1);
        engine.read_register(0x68, TIMEOUT, 0x3B, &mut out).ok();
        sim.fail_reads(1);
        engine.read_register(0x68, TIMEOUT, 0x3B, &mut out).ok();
        sim.set_present(false);
        engine.write_register(0x68, TIMEOUT, 0x1A, &[4]).ok();

        assert_eq!(sim.open_links(), 0);
        assert_eq!(sim.peak_links(), 1);
    }

    #[test]
    fn test_timeout_passed_to_every_transaction() {
        let sim = SimBus::mpu6050();
        let mut engine = BusEngine::initialize(sim.clone(), BusConfig::default()).unwrap();
        let timeout = Duration::from_millis(20);
        let mut out = [0u8; 1];

        engine.read_register(0x68, timeout, 0x75, &mut out).unwrap();
        engine.write_register(0x68, timeout, 0x6B, &[1]).unwrap();

        let log = sim.log();
        assert_eq!(log.len(), 3);
        assert!(log.iter().all(|r| r.timeout == timeout));
    }
}
