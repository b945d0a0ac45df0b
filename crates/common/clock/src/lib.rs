use mockall::automock;
use time::OffsetDateTime;
use time::UtcOffset;

pub type Timestamp = OffsetDateTime;

#[automock]
pub trait Clock: Sync + Send + 'static {
    fn now(&self) -> Timestamp;
}

/// The system clock, using the local offset when it can be determined
#[derive(Clone, Debug)]
pub struct WallClock {
    offset: UtcOffset,
}

impl WallClock {
    pub fn new() -> Self {
        // The local offset can only be read reliably before the runtime spawns threads
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        WallClock { offset }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl Default for WallClock {
    fn default() -> Self {
        WallClock::new()
    }
}

impl Clock for WallClock {
    fn now(&self) -> Timestamp {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}
