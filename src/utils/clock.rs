use chrono::{DateTime, Utc};

/// Injectable time source.
///
/// Every component that needs "now" receives a clock at construction instead
/// of reading a global, so tests can pin time and signatures stay
/// reproducible.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
