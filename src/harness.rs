//! Repeat-and-time comparison harness.
//!
//! Deliberately raw: no warm-up, no outlier rejection, no statistics. The
//! harness reports a summed wall-clock total per `(function, repeat_count)`
//! and leaves derived metrics (averages, speedup ratios) to the caller.

use std::error::Error;
use std::fmt;
use std::hint::black_box;
use std::time::{Duration, Instant};

use clap::ValueEnum;

/// Workload parameter scale for the interactive menu.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum Scale {
    /// Small parameters so every menu option returns quickly.
    Quick,
    /// The full demo sizes; recursive Fibonacci and the large matrix are
    /// intentionally slow.
    #[default]
    Full,
}

impl Scale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Quick => "quick",
            Scale::Full => "full",
        }
    }

    pub fn fibonacci_recursive_n(&self) -> u64 {
        match self {
            Scale::Quick => 24,
            Scale::Full => 30,
        }
    }

    // fib(93) is the last index representable in u64; 90 leaves headroom.
    pub fn fibonacci_iterative_n(&self) -> u64 {
        match self {
            Scale::Quick => 64,
            Scale::Full => 90,
        }
    }

    pub fn matrix_size(&self) -> usize {
        match self {
            Scale::Quick => 40,
            Scale::Full => 100,
        }
    }

    pub fn factorization_target(&self) -> u64 {
        match self {
            Scale::Quick => 987_654_321,
            Scale::Full => 123_456_789_012_345,
        }
    }

    pub fn string_iterations(&self) -> usize {
        match self {
            Scale::Quick => 2_000,
            Scale::Full => 10_000,
        }
    }
}

/// Total elapsed wall-clock time for one repeated-call measurement.
#[derive(Clone, Copy, Debug)]
pub struct TimingSample {
    pub repeats: u64,
    pub total: Duration,
}

impl TimingSample {
    pub fn per_call(&self) -> Duration {
        self.total / self.repeats.max(1) as u32
    }
}

/// Call `f` exactly `repeat_count` times back-to-back on the calling thread
/// and return the summed elapsed time. Results pass through `black_box` so
/// the calls cannot be elided.
pub fn time_repeated<T>(repeat_count: u64, mut f: impl FnMut() -> T) -> TimingSample {
    assert!(repeat_count >= 1, "repeat_count must be at least 1");
    let start = Instant::now();
    for _ in 0..repeat_count {
        black_box(f());
    }
    TimingSample {
        repeats: repeat_count,
        total: start.elapsed(),
    }
}

/// Error for a speedup ratio over a zero-duration candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroCandidateTime;

impl fmt::Display for ZeroCandidateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "candidate elapsed time is zero; speedup ratio is undefined")
    }
}

impl Error for ZeroCandidateTime {}

/// `time(baseline) / time(candidate)`; fails when the candidate total is
/// exactly zero.
pub fn speedup_ratio(
    baseline: &TimingSample,
    candidate: &TimingSample,
) -> Result<f64, ZeroCandidateTime> {
    let candidate_s = candidate.total.as_secs_f64();
    if candidate_s == 0.0 {
        return Err(ZeroCandidateTime);
    }
    Ok(baseline.total.as_secs_f64() / candidate_s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_repeated_calls_exactly_repeat_count_times() {
        let mut calls = 0u64;
        let sample = time_repeated(7, || {
            calls += 1;
            calls
        });
        assert_eq!(calls, 7);
        assert_eq!(sample.repeats, 7);
    }

    #[test]
    fn total_is_monotonic_and_covers_all_calls() {
        let sample = time_repeated(3, || std::thread::sleep(Duration::from_millis(2)));
        assert!(sample.total >= Duration::from_millis(6));
        assert!(sample.per_call() >= Duration::from_millis(2));
    }

    #[test]
    #[should_panic(expected = "repeat_count must be at least 1")]
    fn zero_repeats_is_a_precondition_violation() {
        time_repeated(0, || ());
    }

    #[test]
    fn speedup_ratio_from_raw_totals() {
        let baseline = TimingSample {
            repeats: 10,
            total: Duration::from_millis(400),
        };
        let candidate = TimingSample {
            repeats: 10,
            total: Duration::from_millis(100),
        };
        let ratio = speedup_ratio(&baseline, &candidate).unwrap();
        assert!((ratio - 4.0).abs() < 1e-9);
    }

    #[test]
    fn speedup_ratio_rejects_zero_candidate() {
        let baseline = TimingSample {
            repeats: 1,
            total: Duration::from_millis(1),
        };
        let candidate = TimingSample {
            repeats: 1,
            total: Duration::ZERO,
        };
        assert_eq!(speedup_ratio(&baseline, &candidate), Err(ZeroCandidateTime));
    }

    #[test]
    fn scale_parameters_stay_within_u64_fibonacci_range() {
        for scale in [Scale::Quick, Scale::Full] {
            assert!(scale.fibonacci_iterative_n() <= 93);
            assert!(scale.fibonacci_recursive_n() <= 93);
        }
        assert_eq!(Scale::Full.as_str(), "full");
    }
}
