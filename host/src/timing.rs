//! Times real and dummy kernels.

use std::time::{Duration, Instant};

use log::{trace, warn};
use memsweep::kernels::STATUS_OK;
use memsweep::region::Region;
use memsweep::selector::{KernelKey, KernelPair};
use memsweep::Error;

/// The fastest observed run of a real kernel and of its dummy counterpart, over the same region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelTiming {
    pub key: KernelKey,
    /// The number of words each run accessed.
    pub accesses: usize,
    pub real: Duration,
    pub dummy: Duration,
}

impl KernelTiming {
    pub fn real_ns_per_access(&self) -> f64 {
        per_access_ns(self.real, self.accesses)
    }

    pub fn dummy_ns_per_access(&self) -> f64 {
        per_access_ns(self.dummy, self.accesses)
    }

    /// Whether the dummy kernel took longer than the real one, which usually means the
    /// measurement was disturbed.
    pub fn is_anomalous(&self) -> bool {
        self.dummy > self.real
    }
}

fn per_access_ns(elapsed: Duration, accesses: usize) -> f64 {
    elapsed.as_nanos() as f64 / accesses.max(1) as f64
}

/// Runs the pair's real and dummy kernels `reps` times each over `region`, after one untimed
/// warm-up run of each, and returns the fastest run of each.
///
/// Random-chase pairs need a chained region. Real write kernels overwrite the region's contents.
pub fn measure(
    pair: &KernelPair,
    region: &mut Region<'_>,
    reps: usize,
) -> Result<KernelTiming, Error> {
    let reps = reps.max(1);
    let dummy = fastest_run(pair, reps, || region.run_dummy(pair), "dummy")?;
    let real = fastest_run(pair, reps, || region.run_real(pair), "real")?;
    let timing = KernelTiming {
        key: pair.key,
        accesses: region.len(),
        real,
        dummy,
    };
    trace!("{timing:?}");
    Ok(timing)
}

fn fastest_run(
    pair: &KernelPair,
    reps: usize,
    mut run: impl FnMut() -> Result<i32, Error>,
    kind: &str,
) -> Result<Duration, Error> {
    check_status(pair, run()?, kind);
    let mut fastest = Duration::MAX;
    for _ in 0..reps {
        let start = Instant::now();
        let status = run()?;
        let elapsed = start.elapsed();
        check_status(pair, status, kind);
        fastest = fastest.min(elapsed);
    }
    Ok(fastest)
}

fn check_status(pair: &KernelPair, status: i32, kind: &str) {
    if status != STATUS_OK {
        warn!("The {kind} kernel of {} returned status {status}", pair.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memsweep::delay::DelayLevel;
    use memsweep::selector::{select, Direction, Operation, Pattern, MAX_GRANULARITY_WORDS};

    use crate::WordBuffer;

    #[test]
    fn per_access() {
        let timing = KernelTiming {
            key: KernelKey::latency(),
            accesses: 1000,
            real: Duration::from_micros(5),
            dummy: Duration::from_micros(1),
        };
        assert_eq!(timing.real_ns_per_access(), 5.0);
        assert_eq!(timing.dummy_ns_per_access(), 1.0);
        assert!(!timing.is_anomalous());
    }

    #[test]
    fn measure_rejects_unchained_chase() {
        let pair = select(KernelKey::latency());
        let mut buffer = WordBuffer::new(MAX_GRANULARITY_WORDS, 1);
        assert_eq!(
            measure(&pair, &mut buffer.region(), 3),
            Err(Error::NotChained)
        );
    }

    #[test]
    fn measure_reports_region_size() {
        let pair = select(KernelKey::new(
            Pattern::Sequential,
            Operation::Read,
            Direction::Reverse,
            DelayLevel::D4,
        ));
        let mut buffer = WordBuffer::new(MAX_GRANULARITY_WORDS, pair.granularity_words());
        let timing = measure(&pair, &mut buffer.region(), 2).unwrap();
        assert_eq!(timing.key, pair.key);
        assert_eq!(timing.accesses, buffer.len());
    }
}
