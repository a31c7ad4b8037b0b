//! Instrumented [Access], [Delay] and [Unroll] implementations, for checking what a kernel does
//! without having to time it.
//!
//! The counters are thread-local, so tests running in parallel don't observe each other.

use core::marker::PhantomData;
use std::cell::{Cell, RefCell};

use crate::access::Access;
use crate::delay::Delay;
use crate::kernels::KernelFn;
use crate::unroll::Unroll;
use crate::{Word, WORD_SIZE};

thread_local! {
    static COUNTS: Cell<Counts> = const { Cell::new(Counts::ZERO) };
    static TOUCHED: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// What a kernel did during one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    /// Calls of [Access::touch] or [Access::chase], whether or not they touched memory.
    pub touches: usize,
    /// Calls of [Access::touch] or [Access::chase] that issued a memory instruction.
    pub memory_accesses: usize,
    /// Calls of [Delay::delay].
    pub delays: usize,
    /// Calls of [Unroll::repeat], i.e. loop iterations.
    pub groups: usize,
}

impl Counts {
    const ZERO: Counts = Counts {
        touches: 0,
        memory_accesses: 0,
        delays: 0,
        groups: 0,
    };
}

fn update_counts(f: impl FnOnce(&mut Counts)) {
    COUNTS.with(|counts| {
        let mut value = counts.get();
        f(&mut value);
        counts.set(value);
    });
}

/// Wraps an [Access], counting its invocations and recording the addresses it's applied to.
pub struct Counted<A>(PhantomData<A>);

impl<A: Access> Counted<A> {
    fn record(word: *mut Word) {
        update_counts(|counts| {
            counts.touches += 1;
            if A::TOUCHES_MEMORY {
                counts.memory_accesses += 1;
            }
        });
        TOUCHED.with(|touched| touched.borrow_mut().push(word as usize));
    }
}

impl<A: Access> Access for Counted<A> {
    const TOUCHES_MEMORY: bool = A::TOUCHES_MEMORY;

    unsafe fn touch(word: *mut Word) {
        Self::record(word);
        unsafe { A::touch(word) }
    }

    unsafe fn chase(word: *mut Word) -> *mut Word {
        Self::record(word);
        unsafe { A::chase(word) }
    }
}

/// Wraps a [Delay], counting its invocations.
pub struct CountedDelay<D>(PhantomData<D>);

impl<D: Delay> Delay for CountedDelay<D> {
    const UNITS: u32 = D::UNITS;

    fn delay() {
        update_counts(|counts| counts.delays += 1);
        D::delay();
    }
}

/// Wraps an [Unroll], counting the loop iterations.
pub struct CountedUnroll<U>(PhantomData<U>);

impl<U: Unroll> Unroll for CountedUnroll<U> {
    const FACTOR: usize = U::FACTOR;

    fn repeat<F: FnMut()>(body: F) {
        update_counts(|counts| counts.groups += 1);
        U::repeat(body);
    }
}

/// The outcome of [run_counted].
#[derive(Debug, PartialEq, Eq)]
pub struct Observed {
    pub status: i32,
    pub counts: Counts,
    /// The indices of the words the kernel was applied to, in order.
    pub order: Vec<usize>,
}

/// Runs `kernel` over `words` with fresh counters. The kernel should be instantiated with the
/// instrumented types in this module, or the counts will stay at zero.
pub fn run_counted(kernel: KernelFn, words: &mut [Word]) -> Observed {
    COUNTS.with(|counts| counts.set(Counts::ZERO));
    TOUCHED.with(|touched| touched.borrow_mut().clear());

    let range = words.as_mut_ptr_range();
    let base = range.start as usize;
    // SAFETY: the range covers exactly the `words` slice. The remaining preconditions are the
    // caller's responsibility, as always.
    let status = unsafe { kernel(range.start, range.end) };

    let order = TOUCHED.with(|touched| {
        touched
            .borrow()
            .iter()
            .map(|&addr| (addr - base) / WORD_SIZE)
            .collect()
    });
    Observed {
        status,
        counts: COUNTS.with(Cell::get),
        order,
    }
}
