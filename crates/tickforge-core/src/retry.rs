//! Wait schedules for readiness probing and failure cooldown.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay after every attempt.
    Fixed {
        #[serde(with = "millis")]
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally jittered by +/- 50%.
    Exponential {
        #[serde(with = "millis")]
        base: Duration,
        factor: f64,
        #[serde(with = "millis")]
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed {
            delay: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    /// Delay to wait after the 0-based `attempt`.
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = base.as_secs_f64() * factor.powi(exponent);
                let capped = seconds.min(max.as_secs_f64());
                let mut delay = Duration::from_secs_f64(capped.max(0.0));

                if jitter {
                    let spread = (delay.as_millis() / 2) as u64;
                    let offset = fastrand::u64(0..=spread * 2);
                    let total = (delay.as_millis() as u64 + offset).saturating_sub(spread);
                    delay = Duration::from_millis(total);
                }

                delay
            }
        }
    }
}

/// Bounded readiness probing: at most `max_attempts` probes, `backoff` apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbePolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5), 10)
    }
}

impl ProbePolicy {
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_never_grows() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(9), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_half_of_the_delay() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(200),
            factor: 1.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        for attempt in 0..20 {
            let delay = backoff.delay(attempt).as_millis();
            assert!((100..=300).contains(&delay), "delay {delay}ms out of range");
        }
    }

    #[test]
    fn default_probe_policy_waits_five_seconds_ten_times() {
        let policy = ProbePolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(5));
    }

    #[test]
    fn backoff_reads_from_json_millis() {
        let backoff: Backoff =
            serde_json::from_str(r#"{"kind":"fixed","delay":250}"#).expect("backoff");
        assert_eq!(
            backoff,
            Backoff::Fixed {
                delay: Duration::from_millis(250)
            }
        );
    }
}
