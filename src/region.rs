//! A checked way of running kernels over a region of memory.

use log::debug;

use crate::chain;
use crate::selector::{KernelPair, Operation, Pattern};
use crate::{Error, Word};

/// A region of words that kernels can be run over.
///
/// Tracks whether the region currently holds a pointer chain, since random-chase kernels
/// dereference the region's contents and must never run over anything else.
pub struct Region<'a> {
    words: &'a mut [Word],
    chained: bool,
}

impl<'a> Region<'a> {
    /// Wraps `words` without changing its contents. The region isn't chained.
    pub fn new(words: &'a mut [Word]) -> Region<'a> {
        Region {
            words,
            chained: false,
        }
    }

    /// Wraps `words` after filling it with a random single-cycle chain derived from `seed`.
    pub fn chained(words: &'a mut [Word], seed: u64) -> Region<'a> {
        chain::build_random_cycle(words, seed);
        Region {
            words,
            chained: true,
        }
    }

    /// Whether the region currently holds a chain that random-chase kernels can follow.
    pub fn is_chained(&self) -> bool {
        self.chained
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[Word] {
        self.words
    }

    /// Runs the pair's real kernel over the region.
    pub fn run_real(&mut self, pair: &KernelPair) -> Result<i32, Error> {
        self.check(pair)?;
        let range = self.words.as_mut_ptr_range();
        // SAFETY: `check` verified the length and, for chases, that the region holds a chain of
        // links into itself. The range covers exactly the exclusively borrowed slice.
        let status = unsafe { (pair.real)(range.start, range.end) };
        if pair.key.operation == Operation::Write && pair.key.pattern != Pattern::RandomChase {
            // The write pattern overwrote any links.
            self.chained = false;
        }
        Ok(status)
    }

    /// Runs the pair's dummy kernel over the region. The region's contents are left untouched.
    pub fn run_dummy(&mut self, pair: &KernelPair) -> Result<i32, Error> {
        self.check(pair)?;
        let range = self.words.as_mut_ptr_range();
        // SAFETY: as in `run_real`. Dummy kernels never dereference the region.
        Ok(unsafe { (pair.dummy)(range.start, range.end) })
    }

    fn check(&self, pair: &KernelPair) -> Result<(), Error> {
        let result = pair.check_len(self.words.len()).and_then(|_| {
            if pair.key.pattern == Pattern::RandomChase && !self.chained {
                Err(Error::NotChained)
            } else {
                Ok(())
            }
        });
        if let Err(err) = result {
            debug!("Refusing to run {} over {} words: {err}", pair.key, self.words.len());
        }
        result
    }
}
