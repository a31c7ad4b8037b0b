//! Driver-side support for the `memsweep` kernels: heap-allocated word buffers, timing of real and
//! dummy kernels, and logging of the results.
//!
//! Timings of a real kernel and of its dummy counterpart are always reported as separate values.
//! How to combine them (e.g. subtracting the dummy time to isolate memory time) is left to the
//! caller.

mod buffer;
pub mod report;
pub mod timing;

pub use buffer::WordBuffer;
pub use memsweep;
