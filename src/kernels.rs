//! The kernels: generic loop bodies that are instantiated once per combination of memory
//! operation, delay primitive, unroll factor, direction, and stride.
//!
//! A dummy kernel is simply the same function instantiated with [Skip](crate::access::Skip) as its
//! memory operation. The loop structure, the number of loop iterations, the cursor arithmetic and
//! the sequence of delay calls are therefore identical between a real kernel and its dummy, which
//! is what makes the dummy's elapsed time a valid estimate of the real kernel's overhead.
//!
//! # Preconditions
//!
//! None of these are checked by the kernels. Violating them is undefined behavior.
//!
//! * `start < end`, and both are aligned to [WORD_SIZE].
//! * `[start, end)` is valid for reads and writes for the duration of the call.
//! * `end - start` is a multiple of `WORD_SIZE * U::FACTOR * STRIDE` (with a stride of 1 for the
//!   sequential and chase kernels).
//! * For [chase] with a memory-touching operation, the region holds a pointer chain (see
//!   [crate::chain]) that contains `start`.

use crate::access::Access;
use crate::delay::Delay;
use crate::unroll::Unroll;
use crate::{Word, WORD_SIZE};

/// The status returned by every kernel.
pub const STATUS_OK: i32 = 0;

/// The calling convention shared by all kernels: the start and (exclusive) end address of the
/// region, returning [STATUS_OK].
pub type KernelFn = unsafe fn(*mut Word, *mut Word) -> i32;

/// The direction in which a kernel walks through a region.
///
/// Cursors are moved with wrapping pointer arithmetic, since the last step of a walk moves the
/// cursor past the end of the region (without ever dereferencing it).
pub trait Walk {
    /// The address of the first word accessed by lane `lane` of the walk.
    fn origin(start: *mut Word, end: *mut Word, lane: usize) -> *mut Word;

    /// Moves `cursor` by `words` words in this direction.
    fn step(cursor: *mut Word, words: usize) -> *mut Word;
}

/// Walks from the lowest address to the highest.
pub struct Forward;

/// Walks from the highest address to the lowest.
pub struct Reverse;

impl Walk for Forward {
    #[inline(always)]
    fn origin(start: *mut Word, _end: *mut Word, lane: usize) -> *mut Word {
        start.wrapping_add(lane)
    }

    #[inline(always)]
    fn step(cursor: *mut Word, words: usize) -> *mut Word {
        cursor.wrapping_add(words)
    }
}

impl Walk for Reverse {
    #[inline(always)]
    fn origin(_start: *mut Word, end: *mut Word, lane: usize) -> *mut Word {
        end.wrapping_sub(1 + lane)
    }

    #[inline(always)]
    fn step(cursor: *mut Word, words: usize) -> *mut Word {
        cursor.wrapping_sub(words)
    }
}

/// The number of unrolled loop iterations needed to cover one lane of the region.
#[inline(always)]
fn groups_per_lane<U: Unroll>(start: *mut Word, end: *mut Word, stride: usize) -> usize {
    (end as usize).wrapping_sub(start as usize) / (WORD_SIZE * U::FACTOR * stride)
}

/// Walks the region in `STRIDE` interleaved lanes. Lane `i` starts `i` words away from the walk's
/// origin and touches every `STRIDE`-th word from there, so that every word is touched exactly
/// once over all lanes.
#[inline(always)]
unsafe fn walk<A: Access, D: Delay, U: Unroll, W: Walk, const STRIDE: usize>(
    start: *mut Word,
    end: *mut Word,
) -> i32 {
    const { assert!(STRIDE > 0) };
    let groups = groups_per_lane::<U>(start, end, STRIDE);
    let mut lane = 0;
    while lane < STRIDE {
        let mut cursor = W::origin(start, end, lane);
        let mut remaining = groups;
        while remaining != 0 {
            U::repeat(|| {
                // SAFETY: the caller guarantees that the region is valid and that its length is a
                // multiple of the group size, so the cursor stays within the region until the
                // last access of the lane.
                unsafe { A::touch(cursor) };
                cursor = W::step(cursor, STRIDE);
                D::delay();
            });
            remaining -= 1;
        }
        lane += 1;
    }
    STATUS_OK
}

/// Touches every word of the region once, in address order.
///
/// # Safety
///
/// See the [module documentation](self) for the preconditions.
#[inline(never)]
pub unsafe fn sequential<A: Access, D: Delay, U: Unroll, W: Walk>(
    start: *mut Word,
    end: *mut Word,
) -> i32 {
    unsafe { walk::<A, D, U, W, 1>(start, end) }
}

/// Touches every word of the region once, `STRIDE` words apart.
///
/// # Safety
///
/// See the [module documentation](self) for the preconditions.
#[inline(never)]
pub unsafe fn strided<A: Access, D: Delay, U: Unroll, W: Walk, const STRIDE: usize>(
    start: *mut Word,
    end: *mut Word,
) -> i32 {
    unsafe { walk::<A, D, U, W, STRIDE>(start, end) }
}

/// Follows the pointer chain starting at `start`, for as many hops as the region has words. Each
/// hop's address depends on the previous hop's load, which serializes the accesses and exposes
/// the full load-to-use latency.
///
/// # Safety
///
/// See the [module documentation](self) for the preconditions.
#[inline(never)]
pub unsafe fn chase<A: Access, D: Delay, U: Unroll>(start: *mut Word, end: *mut Word) -> i32 {
    let mut cursor = start;
    let mut remaining = groups_per_lane::<U>(start, end, 1);
    while remaining != 0 {
        U::repeat(|| {
            // SAFETY: the caller guarantees that every link of the chain points into the region.
            cursor = unsafe { A::chase(cursor) };
            D::delay();
        });
        remaining -= 1;
    }
    STATUS_OK
}
