use bitvec::prelude::*;
use log::debug;
use memsweep::debug_util::FormatBytes;
use memsweep::region::Region;
use memsweep::{chain, Word, WORD_SIZE};

/// A heap-allocated buffer of words whose length is a multiple of some kernel granularity.
pub struct WordBuffer {
    words: Vec<Word>,
}

impl WordBuffer {
    /// Allocates a zeroed buffer of at least `words` words, rounded up to a multiple of
    /// `granularity` words. Always allocates at least one granule.
    pub fn new(words: usize, granularity: usize) -> WordBuffer {
        let granularity = granularity.max(1);
        let len = words.max(1).div_ceil(granularity) * granularity;
        debug!(
            "Allocating {} ({len} words, granularity {granularity})",
            FormatBytes(len * WORD_SIZE)
        );
        WordBuffer {
            words: vec![0; len],
        }
    }

    /// Allocates a buffer of at least `bytes` bytes. See [WordBuffer::new].
    pub fn with_bytes(bytes: usize, granularity: usize) -> WordBuffer {
        WordBuffer::new(bytes.div_ceil(WORD_SIZE), granularity)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.words.len() * WORD_SIZE
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Returns a region over the buffer's current contents.
    pub fn region(&mut self) -> Region<'_> {
        Region::new(&mut self.words)
    }

    /// Fills the buffer with a random pointer chain and returns a region that random-chase kernels
    /// can run over.
    pub fn chained_region(&mut self, seed: u64) -> Region<'_> {
        Region::chained(&mut self.words, seed)
    }

    /// Checks that the buffer holds a single pointer cycle through every one of its words.
    pub fn verify_chain(&self) -> bool {
        let mut visited = bitvec![0; self.words.len()];
        let mut idx = 0;
        for _ in 0..self.words.len() {
            if visited[idx] {
                return false;
            }
            visited.set(idx, true);
            match chain::successor_index(&self.words, idx) {
                Some(next) => idx = next,
                None => return false,
            }
        }
        // After one hop per word the walk must be back at the start, having seen every word.
        idx == 0 && visited.all()
    }
}
