//! Wall-clock source for message timestamps.
//!
//! Composed messages carry a human-readable display timestamp stamped at
//! send time; nothing in this codebase orders by it. The [`Clock`] trait
//! keeps the wall-clock read injectable so tests stamp known values.

/// Source of display timestamps for composed messages.
pub trait Clock {
    /// Current local time formatted for display, e.g. `14:05 08/25`.
    fn display_timestamp(&self) -> String;
}

/// Production clock reading local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::disallowed_methods, reason = "The one place that reads the real clock")]
    fn display_timestamp(&self) -> String {
        chrono::Local::now().format("%H:%M %m/%d").to_string()
    }
}
