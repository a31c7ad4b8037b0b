//! Builds the pointer chains followed by the random-chase kernels.
//!
//! A chain stores, in every word of a region, the address of the next word to visit. The chains
//! built here are always a single cycle through every word of the region, so a chase starting at
//! any word visits each word exactly once before returning to where it started.

use log::{debug, trace};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::{debug_util, Word, WORD_SIZE};

/// Fills `words` with a chain that visits every word in a random order, determined by `seed`.
///
/// Uses Sattolo's algorithm, which produces a uniformly random permutation consisting of exactly
/// one cycle. Each word first holds the index of its successor, which is then converted into an
/// address in place, so no extra memory is needed.
pub fn build_random_cycle(words: &mut [Word], seed: u64) {
    for (idx, word) in words.iter_mut().enumerate() {
        *word = idx as Word;
    }
    let mut rng = SmallRng::seed_from_u64(seed);
    for i in (1..words.len()).rev() {
        let j = rng.gen_range(0..i);
        words.swap(i, j);
    }
    indices_to_addresses(words);
    debug!(
        "Built a random chain over {} words (seed {seed})",
        words.len()
    );
    log_chain(words);
}

/// Fills `words` with a chain that visits every word in ascending address order, wrapping around
/// from the last word to the first.
pub fn build_sequential_cycle(words: &mut [Word]) {
    let len = words.len();
    for (idx, word) in words.iter_mut().enumerate() {
        *word = ((idx + 1) % len) as Word;
    }
    indices_to_addresses(words);
    debug!("Built a sequential chain over {len} words");
    log_chain(words);
}

/// Converts successor indices into successor addresses.
fn indices_to_addresses(words: &mut [Word]) {
    let base = words.as_ptr() as usize;
    for word in words.iter_mut() {
        *word = (base + *word as usize * WORD_SIZE) as Word;
    }
}

/// Returns the index of the word that the word at `idx` links to, or `None` if the link doesn't
/// point at a word within `words`.
pub fn successor_index(words: &[Word], idx: usize) -> Option<usize> {
    let base = words.as_ptr() as usize;
    let offset = (*words.get(idx)? as usize).checked_sub(base)?;
    if offset % WORD_SIZE != 0 || offset / WORD_SIZE >= words.len() {
        return None;
    }
    Some(offset / WORD_SIZE)
}

fn log_chain(words: &[Word]) {
    if log::log_enabled!(log::Level::Trace) {
        trace!("--- Chain links, as word addresses");
        debug_util::log_words_hex(log::Level::Trace, words);
    }
}
