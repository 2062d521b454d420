//! WiFi station manager
//!
//! Keeps the shared link flag in sync with connectivity and reconnects on
//! every disconnect.

use std::sync::Arc;

use esp_idf_hal::peripheral;
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::netif::IpEvent;
use esp_idf_svc::sys::{esp, esp_wifi_connect, esp_wifi_set_storage, wifi_storage_t_WIFI_STORAGE_RAM};
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent};
use imu_telemetry::LinkState;
use log::{info, warn};

pub struct WifiManager {
    _wifi: EspWifi<'static>,
    _wifi_events: EspSubscription<'static, System>,
    _ip_events: EspSubscription<'static, System>,
}

impl WifiManager {
    /// Join `ssid` in station mode; connection completes in the background
    pub fn start_station(
        modem: impl peripheral::Peripheral<P = esp_idf_hal::modem::Modem> + 'static,
        sysloop: EspSystemEventLoop,
        ssid: &str,
        password: &str,
        link: Arc<LinkState>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut wifi = EspWifi::new(modem, sysloop.clone(), None)?;
        esp!(unsafe { esp_wifi_set_storage(wifi_storage_t_WIFI_STORAGE_RAM) })?;

        let wifi_events = {
            let link = Arc::clone(&link);
            sysloop.subscribe::<WifiEvent, _>(move |event| match event {
                WifiEvent::StaStarted => {
                    info!("WiFi started, connecting");
                    reconnect();
                }
                WifiEvent::StaDisconnected(_) => {
                    link.set_ready(false);
                    warn!("WiFi disconnected, reconnecting");
                    reconnect();
                }
                _ => {}
            })?
        };

        let ip_events = sysloop.subscribe::<IpEvent, _>(move |event| {
            if let IpEvent::DhcpIpAssigned(_) = event {
                link.set_ready(true);
                info!("Network ready");
            }
        })?;

        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| "SSID too long")?,
            password: password.try_into().map_err(|_| "password too long")?,
            auth_method,
            ..Default::default()
        }))?;

        info!("Starting WiFi");
        wifi.start()?;

        Ok(Self {
            _wifi: wifi,
            _wifi_events: wifi_events,
            _ip_events: ip_events,
        })
    }
}

// Event callbacks run on the sysloop task and cannot borrow the `EspWifi`
// owned by `WifiManager`, so they call the driver directly.
fn reconnect() {
    if let Err(e) = esp!(unsafe { esp_wifi_connect() }) {
        warn!("esp_wifi_connect failed: {}", e);
    }
}
