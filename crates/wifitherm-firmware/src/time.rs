use embassy_time::Instant;
use wifitherm_core::control_loop::Clock;

/// Monotonic time from the embassy time driver.
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
