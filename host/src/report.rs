//! Logs measurement results as aligned table rows.

use log::info;
use memsweep::debug_util::FormatBytes;

use crate::timing::KernelTiming;

/// Logs the header of a sweep, naming the region size and the table's columns.
pub fn log_sweep_header(title: &str, region_bytes: usize, reps: usize) {
    info!("--- {title} ---");
    info!("Region: {}, fastest of {reps} runs", FormatBytes(region_bytes));
    info!(
        "{:<36} {:>12} {:>12} {:>12} {:>12}",
        "kernel", "real ns", "dummy ns", "real ns/acc", "dummy ns/acc"
    );
}

/// Logs one measurement. Measurements in which the dummy kernel was slower than the real one are
/// logged as warnings.
pub fn log_timing(timing: &KernelTiming) {
    let level = if timing.is_anomalous() {
        log::Level::Warn
    } else {
        log::Level::Info
    };
    log::log!(
        level,
        "{:<36} {:>12} {:>12} {:>12.3} {:>12.3}",
        timing.key.to_string(),
        timing.real.as_nanos(),
        timing.dummy.as_nanos(),
        timing.real_ns_per_access(),
        timing.dummy_ns_per_access(),
    );
}

/// Logs a latency measurement of a random chase over a region of `region_bytes` bytes, as the
/// real and dummy time per hop.
pub fn log_latency(region_bytes: usize, timing: &KernelTiming) {
    info!(
        "{:>10}: real {:>9.3} ns/hop, dummy {:>9.3} ns/hop",
        FormatBytes(region_bytes).to_string(),
        timing.real_ns_per_access(),
        timing.dummy_ns_per_access(),
    );
}
