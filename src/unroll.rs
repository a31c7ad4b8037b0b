//! Compile-time loop unrolling.
//!
//! An [Unroll] implementation turns a loop body into a fixed number of literal, back-to-back
//! copies of that body. Kernels call [Unroll::repeat] once per loop iteration, so the loop's
//! branch only executes once every [Unroll::FACTOR] accesses.

use memsweep_proc_macros::unroll_impls;

/// A loop body repetition strategy.
pub trait Unroll {
    /// The number of times [Unroll::repeat] invokes its body.
    const FACTOR: usize;

    /// Invokes `body` exactly [Unroll::FACTOR] times, in sequence.
    fn repeat<F: FnMut()>(body: F);
}

/// Repeats a loop body `FACTOR` times. Only implemented for powers of two up to 512, and using
/// any other factor fails to compile.
pub struct Unrolled<const FACTOR: usize>;

unroll_impls!(1, 2, 4, 8, 16, 32, 64, 128, 256, 512);

#[cfg(test)]
mod tests {
    use super::*;

    fn count_repetitions<U: Unroll>() -> usize {
        let mut count = 0;
        U::repeat(|| count += 1);
        count
    }

    #[test]
    fn repeats_factor_times() {
        assert_eq!(count_repetitions::<Unrolled<1>>(), 1);
        assert_eq!(count_repetitions::<Unrolled<2>>(), 2);
        assert_eq!(count_repetitions::<Unrolled<4>>(), 4);
        assert_eq!(count_repetitions::<Unrolled<8>>(), 8);
        assert_eq!(count_repetitions::<Unrolled<16>>(), 16);
        assert_eq!(count_repetitions::<Unrolled<32>>(), 32);
        assert_eq!(count_repetitions::<Unrolled<64>>(), 64);
        assert_eq!(count_repetitions::<Unrolled<128>>(), 128);
        assert_eq!(count_repetitions::<Unrolled<256>>(), 256);
        assert_eq!(count_repetitions::<Unrolled<512>>(), 512);
    }

    // The repetitions must run in order, each one observing the effects of the previous one.
    #[test]
    fn repetitions_run_in_sequence() {
        let mut seen = Vec::new();
        let mut next = 0;
        Unrolled::<16>::repeat(|| {
            seen.push(next);
            next += 1;
        });
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
    }
}
