use chrono::{DateTime, Duration, DurationRound, Utc};
use parking_lot::Mutex;

/// Assigns server timestamps. Successive calls return strictly increasing
/// millisecond instants even if the wall clock stalls or steps back.
#[derive(Default)]
pub struct ServerClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl ServerClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now();
        let wall = wall
            .duration_trunc(Duration::milliseconds(1))
            .unwrap_or(wall);

        let mut last = self.last.lock();
        let next = match *last {
            Some(previous) if wall <= previous => previous + Duration::milliseconds(1),
            _ => wall,
        };
        *last = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_strictly_increase() {
        let clock = ServerClock::new();
        let mut previous = clock.now();
        for _ in 0..1_000 {
            let next = clock.now();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn timestamps_have_millisecond_precision() {
        let clock = ServerClock::new();
        let stamp = clock.now();
        assert_eq!(DateTime::from_timestamp_millis(stamp.timestamp_millis()), Some(stamp));
    }
}
