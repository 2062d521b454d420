//! Platform services for the supervisor: FreeRTOS clock and chip reset

use esp_idf_hal::delay::FreeRtos;
use imu_telemetry::{Restart, Scheduler};

/// High-resolution timer clock with FreeRTOS delays
pub struct EspScheduler;

impl Scheduler for EspScheduler {
    fn now_ms(&self) -> u64 {
        unsafe { (esp_idf_svc::sys::esp_timer_get_time() / 1000) as u64 }
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }

    fn delay_until_ms(&mut self, deadline_ms: u64) {
        let now = self.now_ms();
        if deadline_ms > now {
            FreeRtos::delay_ms((deadline_ms - now).min(u64::from(u32::MAX)) as u32);
        }
    }
}

pub struct EspRestart;

impl Restart for EspRestart {
    fn restart(&mut self) -> ! {
        esp_idf_hal::reset::restart()
    }
}
