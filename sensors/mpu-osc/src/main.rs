mod config;
mod i2c;
mod system;
mod udp_stream;
mod wifi;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use config::SystemConfig;
use esp_idf_hal::{delay::FreeRtos, peripherals::Peripherals, task::thread::ThreadSpawnConfiguration};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use i2c::EspI2cBus;
use imu_telemetry::{LinkState, Restart, Supervisor};
use log::{error, info};
use system::{EspRestart, EspScheduler};
use udp_stream::UdpTelemetryStream;
use wifi::WifiManager;

fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let config = SystemConfig::from_env();

    info!("=== MPU-6050 OSC Telemetry ===");
    info!(
        "SSID: {}, Target: {}, Rate: {}Hz, SDA: {}, SCL: {}",
        config.network.wifi_ssid,
        config.network.udp_server,
        config.supervisor.rate_hz(),
        config.bus.sda_pin,
        config.bus.scl_pin
    );

    if let Err(e) = run(&config) {
        error!("Startup failed: {}", e);
        FreeRtos::delay_ms(config.supervisor.fatal_backoff_ms);
        EspRestart.restart();
    }
}

fn run(config: &SystemConfig) -> Result<(), Box<dyn std::error::Error>> {
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let link = Arc::new(LinkState::new());

    info!("Initializing WiFi, SSID is {}", config.network.wifi_ssid);
    let _wifi = WifiManager::start_station(
        peripherals.modem,
        sysloop,
        config.network.wifi_ssid,
        config.network.wifi_password,
        Arc::clone(&link),
    )?;

    // Pins are fixed by the board wiring; BusConfig must name the same ones
    let bus = EspI2cBus::new(peripherals.i2c0, peripherals.pins.gpio14, peripherals.pins.gpio2);

    let sampler = spawn_sampler(config, bus, link)?;

    // The sampling task never returns; keep WiFi alive alongside it
    sampler.join().map_err(|_| "sampling task panicked")?;
    Ok(())
}

fn spawn_sampler(
    config: &SystemConfig,
    bus: EspI2cBus,
    link: Arc<LinkState>,
) -> Result<JoinHandle<()>, Box<dyn std::error::Error>> {
    ThreadSpawnConfiguration {
        name: Some(config.task.name),
        stack_size: config.task.stack_size,
        priority: config.task.priority,
        ..Default::default()
    }
    .set()?;

    let supervisor = Supervisor::new(
        config.supervisor,
        config.bus,
        EspScheduler,
        UdpTelemetryStream::new(config.network.udp_server),
        EspRestart,
        link,
    );

    let handle = thread::Builder::new()
        .stack_size(config.task.stack_size)
        .spawn(move || {
            supervisor.run(bus);
        })?;

    ThreadSpawnConfiguration::default().set()?;

    Ok(handle)
}
