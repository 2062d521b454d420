//! Sampling supervisor
//!
//! Owns the bus engine and drives the device through its lifecycle:
//!
//! ```text
//! Boot ──ok──▶ Ready ──start──▶ Sampling ◀──▶ Degraded
//!   │
//!   └─fail──▶ Fatal ──backoff──▶ restart
//! ```
//!
//! Boot failures are unrecoverable and end in a device restart. Failures
//! inside the sampling loop only ever degrade a single iteration: the loop
//! logs, pauses, and retries on the next tick.

use core::fmt::{Debug, Display};
use std::sync::Arc;

use log::{debug, error, info, warn};
use mpu6050::bus::{BusConfig, BusController, BusEngine};
use mpu6050::{Mpu6050, MEASUREMENT_LEN};

use crate::cadence::Cadence;
use crate::config::SupervisorConfig;
use crate::fault::Fault;
use crate::link::LinkState;
use crate::platform::{Restart, Scheduler};
use crate::sample::{MeasurementBlock, Sample};
use crate::sink::{SendError, TelemetrySink};
use crate::stats::{LoopStats, Outcome};

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Boot,
    Ready,
    Sampling,
    Degraded,
    Fatal,
}

/// What one sampling iteration did
#[derive(Debug)]
pub enum Iteration<S: Debug> {
    /// Block sent
    Published,
    /// Block read but the link was down
    LinkDown,
    /// Block read, transport failed
    SendFailed(SendError),
    /// Sensor failure, iteration abandoned
    Degraded(Fault<S>),
}

impl<S: Debug> Iteration<S> {
    pub fn outcome(&self) -> Outcome {
        match self {
            Iteration::Published => Outcome::Published,
            Iteration::LinkDown => Outcome::LinkDown,
            Iteration::SendFailed(_) => Outcome::SendFailed,
            Iteration::Degraded(_) => Outcome::Degraded,
        }
    }
}

/// Boot sequence plus fixed-rate sample/publish loop
pub struct Supervisor<D, T, R> {
    config: SupervisorConfig,
    bus_config: BusConfig,
    device: Mpu6050,
    scheduler: D,
    sink: T,
    restart: R,
    link: Arc<LinkState>,
    state: State,
    cadence: Option<Cadence>,
    stats: LoopStats,
}

impl<D, T, R> Supervisor<D, T, R>
where
    D: Scheduler,
    T: TelemetrySink,
    R: Restart,
{
    pub fn new(
        config: SupervisorConfig,
        bus_config: BusConfig,
        scheduler: D,
        sink: T,
        restart: R,
        link: Arc<LinkState>,
    ) -> Self {
        let stats = LoopStats::new(scheduler.now_ms(), config.report_interval_ms);

        Self {
            device: Mpu6050::new(config.device_address, config.bus_timeout()),
            config,
            bus_config,
            scheduler,
            sink,
            restart,
            link,
            state: State::Boot,
            cadence: None,
            stats,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn cadence(&self) -> Option<&Cadence> {
        self.cadence.as_ref()
    }

    /// Boot, then sample forever; a failed boot ends in a restart
    pub fn run<C: BusController>(mut self, controller: C) -> ! {
        match self.boot(controller) {
            Ok(mut bus) => {
                self.start();
                loop {
                    self.tick(&mut bus);
                }
            }
            Err(fault) => self.escalate(fault),
        }
    }

    /// Install the bus, let the sensor settle, configure it and open the
    /// transport
    ///
    /// On success the supervisor is `Ready` and owns nothing else; the
    /// returned engine is the only handle to the bus.
    pub fn boot<C: BusController>(
        &mut self,
        controller: C,
    ) -> Result<BusEngine<C>, Fault<C::Status>> {
        self.state = State::Boot;

        let mut bus = BusEngine::initialize(controller, self.bus_config).map_err(|e| {
            error!("Unable to initialize I2C: {}", e);
            Fault::from(e)
        })?;

        self.scheduler.delay_ms(self.config.settle_ms);

        self.device.configure(&mut bus).map_err(|e| {
            error!("Unable to initialize MPU: {}", e);
            Fault::from(e)
        })?;

        self.sink.open().map_err(|e| {
            error!("Unable to open telemetry transport: {}", e);
            Fault::from(e)
        })?;

        self.state = State::Ready;
        info!(
            "Initialized (MPU at {:#04x}, {} Hz)",
            self.device.address(),
            self.config.rate_hz()
        );
        Ok(bus)
    }

    /// Anchor the cadence at the current time
    pub fn start(&mut self) {
        let now = self.scheduler.now_ms();
        self.cadence = Some(Cadence::new(now, self.config.period_ms));
        self.stats = LoopStats::new(now, self.config.report_interval_ms);
        self.state = State::Sampling;
    }

    /// One sampling iteration, including the wait for the next tick
    pub fn tick<C: BusController>(&mut self, bus: &mut BusEngine<C>) -> Iteration<C::Status> {
        if self.cadence.is_none() {
            self.start();
        }

        let iteration = match self.acquire(bus) {
            Ok(block) => {
                self.state = State::Sampling;
                self.publish(&block)
            }
            Err(fault) => {
                self.state = State::Degraded;
                self.recover();
                Iteration::Degraded(fault)
            }
        };

        self.stats.record(iteration.outcome());
        if let Some(report) = self.stats.take_report(self.scheduler.now_ms()) {
            info!("{}", report);
        }

        self.wait_for_next_tick();
        iteration
    }

    /// Log the fault, back off, and restart the device
    pub fn escalate(&mut self, fault: impl Display) -> ! {
        self.state = State::Fatal;
        error!(
            "Fatal: {}; restarting in {} ms",
            fault, self.config.fatal_backoff_ms
        );
        self.scheduler.delay_ms(self.config.fatal_backoff_ms);
        self.restart.restart()
    }

    fn acquire<C: BusController>(
        &mut self,
        bus: &mut BusEngine<C>,
    ) -> Result<MeasurementBlock, Fault<C::Status>> {
        self.device.verify_identity(bus).map_err(|e| {
            error!("MPU not found: {}", e);
            Fault::from(e)
        })?;

        let mut block = [0u8; MEASUREMENT_LEN];
        self.device.read_measurement(bus, &mut block).map_err(|e| {
            error!("Bad response from MPU: {}", e);
            Fault::from(e)
        })?;

        let sample = Sample::from_block(&block);
        debug!(
            "Net: {} Sensor Data: {} ({:.1} C)",
            if self.link.is_ready() { "yes" } else { "no" },
            sample,
            sample.temperature_celsius()
        );
        Ok(block)
    }

    fn publish<S: Debug>(&mut self, block: &MeasurementBlock) -> Iteration<S> {
        if !self.link.is_ready() {
            return Iteration::LinkDown;
        }

        match self.sink.send(block) {
            Ok(()) => Iteration::Published,
            Err(e) => {
                error!("Unable to send network packet: {}", e);
                Iteration::SendFailed(e)
            }
        }
    }

    /// Pause after a sensor failure, then drop the ticks that passed
    fn recover(&mut self) {
        self.scheduler.delay_ms(self.config.error_pause_ms);

        let now = self.scheduler.now_ms();
        if let Some(cadence) = self.cadence.as_mut() {
            let skipped = cadence.resync(now);
            if skipped > 0 {
                warn!("Skipped {} sample periods while degraded", skipped);
            }
        }
    }

    fn wait_for_next_tick(&mut self) {
        if let Some(cadence) = self.cadence.as_mut() {
            let deadline = cadence.advance();
            self.scheduler.delay_until_ms(deadline);
        }
    }
}
