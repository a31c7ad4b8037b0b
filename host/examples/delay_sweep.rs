//! Sweeps every delay level for a few access patterns, logging the time the real and the dummy
//! kernel spend per access.
//!
//! Run with `RUST_LOG=info cargo run --release -p memsweep_host --example delay_sweep`. As the
//! delay grows, the real and dummy times per access should converge: the memory accesses get
//! hidden behind the delay once it exceeds the time the memory system needs per access.

use log::info;
use memsweep::delay::DelayLevel;
use memsweep::selector::{
    select, Direction, KernelKey, Operation, Pattern, Stride, MAX_GRANULARITY_WORDS,
};
use memsweep::Error;
use memsweep_host::{report, timing, WordBuffer};

/// The region size, chosen to be well beyond the size of a typical L2 cache.
const REGION_BYTES: usize = 32 << 20;
const REPETITIONS: usize = 5;
const CHAIN_SEED: u64 = 0x5eed;

const PATTERNS: [(Pattern, Operation, Direction); 5] = [
    (Pattern::Sequential, Operation::Read, Direction::Forward),
    (Pattern::Sequential, Operation::Read, Direction::Reverse),
    (Pattern::Sequential, Operation::Write, Direction::Forward),
    (Pattern::Strided(Stride::S8), Operation::Read, Direction::Forward),
    (Pattern::RandomChase, Operation::Read, Direction::Forward),
];

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting the delay sweep");

    let mut buffer = WordBuffer::with_bytes(REGION_BYTES, MAX_GRANULARITY_WORDS);
    for (pattern, operation, direction) in PATTERNS {
        let base = KernelKey::new(pattern, operation, direction, DelayLevel::D0);
        report::log_sweep_header(&base.to_string(), buffer.size_bytes(), REPETITIONS);
        let mut region = if pattern == Pattern::RandomChase {
            buffer.chained_region(CHAIN_SEED)
        } else {
            buffer.region()
        };
        for delay in DelayLevel::ALL {
            let pair = select(base.with_delay(delay));
            let timing = timing::measure(&pair, &mut region, REPETITIONS)?;
            report::log_timing(&timing);
        }
    }
    Ok(())
}
