//! The memory operations performed by kernels.
//!
//! Every real access is a volatile load or store, which the compiler may neither elide nor
//! reorder with respect to other volatile accesses, nor merge into wider accesses. The [Skip]
//! operation is what turns a kernel into its dummy counterpart.

use core::hint::black_box;
use core::ptr;

use crate::Word;

/// The value that write kernels store into each word.
pub const WRITE_PATTERN: Word = 0xFFFF_FFFF_FFFF_FFFF;

/// A memory operation applied to one word at a time.
pub trait Access {
    /// Whether this operation issues a memory instruction at all.
    const TOUCHES_MEMORY: bool;

    /// Applies the operation to the word at `word`.
    ///
    /// # Safety
    ///
    /// For operations that touch memory `word` must be valid for reads and writes and aligned.
    unsafe fn touch(word: *mut Word);

    /// Applies the operation to the word at `word`, which holds the address of the next word in a
    /// pointer chain, and returns the address of the word to visit next.
    ///
    /// # Safety
    ///
    /// For operations that touch memory `word` must be valid for reads and writes, aligned, and
    /// hold the address of another such word.
    unsafe fn chase(word: *mut Word) -> *mut Word;
}

/// Loads each word into a local that is never written back.
pub struct Read;

/// Stores [WRITE_PATTERN] into each word. When chasing, the loaded link is stored back instead, so
/// that the chain survives the traversal.
pub struct Write;

/// Performs no memory operation. Chasing only advances the cursor to the adjacent word, using
/// pointer arithmetic.
///
/// The cursor is passed through [black_box] on every access. Without a memory instruction or a
/// delay the loop would otherwise have no observable effect, and the optimizer would delete it.
pub struct Skip;

impl Access for Read {
    const TOUCHES_MEMORY: bool = true;

    #[inline(always)]
    unsafe fn touch(word: *mut Word) {
        let _value = unsafe { ptr::read_volatile(word) };
    }

    #[inline(always)]
    unsafe fn chase(word: *mut Word) -> *mut Word {
        (unsafe { ptr::read_volatile(word) }) as usize as *mut Word
    }
}

impl Access for Write {
    const TOUCHES_MEMORY: bool = true;

    #[inline(always)]
    unsafe fn touch(word: *mut Word) {
        unsafe { ptr::write_volatile(word, WRITE_PATTERN) };
    }

    #[inline(always)]
    unsafe fn chase(word: *mut Word) -> *mut Word {
        let next = unsafe { ptr::read_volatile(word) };
        unsafe { ptr::write_volatile(word, next) };
        next as usize as *mut Word
    }
}

impl Access for Skip {
    const TOUCHES_MEMORY: bool = false;

    #[inline(always)]
    unsafe fn touch(word: *mut Word) {
        black_box(word);
    }

    #[inline(always)]
    unsafe fn chase(word: *mut Word) -> *mut Word {
        black_box(word).wrapping_add(1)
    }
}
