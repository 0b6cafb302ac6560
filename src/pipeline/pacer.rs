//! Drift-compensated real-time pacing.

use crate::codec::Rational;
use std::time::{Duration, Instant};

/// What the worker should do after producing a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Sleep until this instant before emitting the next packet.
    Wait(Instant),
    /// The deadline already passed; the overrun is recorded as dropped time.
    Late {
        /// How far behind real time the stream was.
        overrun: Duration,
        /// The overrun in time-base units.
        dropped_samples: u64,
    },
}

/// Running deadline for packet emission.
///
/// Each packet pushes the deadline forward by its own duration, so sleep
/// jitter does not accumulate. When the producer falls behind, the deadline
/// snaps to the present instead of bursting to catch up.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    deadline: Instant,
}

impl Pacer {
    /// Start pacing from `now`.
    pub fn new(now: Instant) -> Self {
        Self { deadline: now }
    }

    /// Restart from `now`, forgetting any time spent suspended.
    pub fn reset(&mut self, now: Instant) {
        self.deadline = now;
    }

    /// The instant the next packet is due.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Account for a packet of `duration` units of `time_base`.
    pub fn schedule(&mut self, duration: i64, time_base: Rational, now: Instant) -> Pace {
        let seconds = time_base.seconds(duration.max(0));
        self.deadline += Duration::try_from_secs_f64(seconds).unwrap_or_default();

        if now <= self.deadline {
            return Pace::Wait(self.deadline);
        }

        let overrun = now - self.deadline;
        let dropped_samples = if time_base.num > 0 && time_base.den > 0 {
            (overrun.as_secs_f64() * time_base.den as f64 / time_base.num as f64).round() as u64
        } else {
            0
        };
        self.deadline = now;
        Pace::Late {
            overrun,
            dropped_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPUS: Rational = Rational::per(48_000);

    #[test]
    fn test_on_time_packets_wait_for_their_deadline() {
        let start = Instant::now();
        let mut pacer = Pacer::new(start);

        assert_eq!(
            pacer.schedule(960, OPUS, start),
            Pace::Wait(start + Duration::from_millis(20))
        );
        assert_eq!(
            pacer.schedule(960, OPUS, start + Duration::from_millis(25)),
            Pace::Wait(start + Duration::from_millis(40))
        );
    }

    #[test]
    fn test_late_packet_records_overrun_and_resets() {
        let start = Instant::now();
        let mut pacer = Pacer::new(start);
        pacer.schedule(960, OPUS, start);

        let late = start + Duration::from_millis(100);
        assert_eq!(
            pacer.schedule(960, OPUS, late),
            Pace::Late {
                overrun: Duration::from_millis(60),
                dropped_samples: 2880,
            }
        );
        assert_eq!(pacer.deadline(), late);
    }

    #[test]
    fn test_reset_after_pause_drops_nothing() {
        let start = Instant::now();
        let mut pacer = Pacer::new(start);
        pacer.schedule(960, OPUS, start);

        // Ten seconds paused.
        let resumed = start + Duration::from_secs(10);
        pacer.reset(resumed);

        assert_eq!(
            pacer.schedule(960, OPUS, resumed),
            Pace::Wait(resumed + Duration::from_millis(20))
        );
    }
}
