//! TTL evaluation

use chrono::{DateTime, Duration, Utc};

/// Time-to-live requested for a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Whole seconds; zero or negative means "delete now"
    Seconds(i64),
    /// Signed duration; a non-positive duration means "delete now"
    Duration(Duration),
}

impl From<i64> for Ttl {
    fn from(seconds: i64) -> Self {
        Ttl::Seconds(seconds)
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Duration(duration)
    }
}

impl From<std::time::Duration> for Ttl {
    fn from(duration: std::time::Duration) -> Self {
        // Durations beyond chrono's range saturate to its maximum
        Ttl::Duration(Duration::from_std(duration).unwrap_or(Duration::MAX))
    }
}

/// Outcome of an expiry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Lives until explicitly deleted
    Never,
    /// Dead from this instant on (inclusive)
    At(DateTime<Utc>),
    /// Must be deleted instead of written
    Immediate,
}

impl Expiry {
    /// Absolute timestamp to store, `None` for "no TTL"
    ///
    /// `Immediate` has nothing to store and also yields `None`; callers
    /// branch on it before writing.
    pub fn timestamp(self) -> Option<DateTime<Utc>> {
        match self {
            Expiry::At(at) => Some(at),
            Expiry::Never | Expiry::Immediate => None,
        }
    }
}

/// Decide the expiry of a write happening at `now`
///
/// `ttl` falls back to `default_ttl`; with neither there is no expiry.
pub fn expiry_for(ttl: Option<Ttl>, default_ttl: Option<Ttl>, now: DateTime<Utc>) -> Expiry {
    let ttl = match ttl.or(default_ttl) {
        Some(ttl) => ttl,
        None => return Expiry::Never,
    };

    match ttl {
        Ttl::Seconds(seconds) if seconds <= 0 => Expiry::Immediate,
        Ttl::Seconds(seconds) => match Duration::try_seconds(seconds) {
            Some(delta) => after(now, delta),
            None => Expiry::Never,
        },
        Ttl::Duration(delta) => after(now, delta),
    }
}

fn after(now: DateTime<Utc>, delta: Duration) -> Expiry {
    match now.checked_add_signed(delta) {
        Some(at) if at > now => Expiry::At(at),
        Some(_) => Expiry::Immediate,
        // Past the end of representable time
        None if delta > Duration::zero() => Expiry::Never,
        None => Expiry::Immediate,
    }
}

/// An item is dead once `now` reaches its expiry
#[inline]
pub fn is_expired(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(expiry, Some(at) if at <= now)
}
