//! Measures the unloaded memory latency with random pointer chases over regions of growing size.
//!
//! The time per hop steps up each time the region outgrows a level of the cache hierarchy.

use log::info;
use memsweep::selector::{select, KernelKey};
use memsweep::Error;
use memsweep_host::{report, timing, WordBuffer};

const MIN_REGION_BYTES: usize = 4 << 10;
const MAX_REGION_BYTES: usize = 256 << 20;
const REPETITIONS: usize = 3;
const CHAIN_SEED: u64 = 42;

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let pair = select(KernelKey::latency());
    info!(
        "--- Latency of {} (granularity {} bytes) ---",
        pair.key,
        pair.granularity_bytes()
    );
    let mut region_bytes = MIN_REGION_BYTES.max(pair.granularity_bytes());
    while region_bytes <= MAX_REGION_BYTES {
        let mut buffer = WordBuffer::with_bytes(region_bytes, pair.granularity_words());
        let timing = timing::measure(&pair, &mut buffer.chained_region(CHAIN_SEED), REPETITIONS)?;
        report::log_latency(buffer.size_bytes(), &timing);
        region_bytes *= 2;
    }
    Ok(())
}
