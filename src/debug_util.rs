//! Contains debug utilities that may be useful for users of this crate.

use crate::{Word, WORD_SIZE};

/// The number of words printed per row. Four 16-digit words plus the offset keep a row under 80
/// columns, and 32 bytes per row makes the offsets easy to scan.
const WORDS_PER_ROW: usize = 4;

/// A wrapper struct whose [core::fmt::Display] implementation prints the provided words in rows,
/// with each row containing 4 words in up to two groups of up to 2 words each, with each word
/// formatted by the provided formatting function. Each row starts with the byte offset of its
/// first word.
struct FormatWordsInRowsAndGroups<'a, F> {
    words: &'a [Word],
    elem_formatter: F,
}
impl<'a, F, R> core::fmt::Display for FormatWordsInRowsAndGroups<'a, F>
where
    F: Fn(&'a Word) -> R,
    R: core::fmt::Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (row_idx, row_values) in self.words.chunks(WORDS_PER_ROW).enumerate() {
            if row_idx > 0 {
                writeln!(f)?;
            }
            let offset = row_idx * WORDS_PER_ROW * WORD_SIZE;
            write!(f, "{offset:06x}: ")?;

            // Print values in groups of 2, each group separated by two spaces, and each element
            // within a group separated by a space.
            for (group_idx, group_values) in row_values.chunks(WORDS_PER_ROW / 2).enumerate() {
                if group_idx > 0 {
                    write!(f, "  ")?;
                }
                for (elem_idx, elem) in group_values.iter().enumerate() {
                    if elem_idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", (self.elem_formatter)(elem))?;
                }
            }
        }
        Ok(())
    }
}

fn log_words<'a, F, R>(log_level: log::Level, words: &'a [Word], fmt: F)
where
    F: Fn(&'a Word) -> R,
    R: core::fmt::Display,
{
    log::log!(
        log_level,
        "Length: {} words\n{}",
        words.len(),
        FormatWordsInRowsAndGroups {
            words,
            elem_formatter: &fmt
        }
    );
}

/// A word formatter that prints the value in hexadecimal format.
struct HexFormatter<'a>(&'a Word);
impl<'a> core::fmt::Display for HexFormatter<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Logs the given words in a human-readable format, with each word printed in its hexadecimal
/// representation, similar to how a hex dump prints memory.
pub fn log_words_hex(log_level: log::Level, words: &[Word]) {
    log_words(log_level, words, HexFormatter)
}

/// A formatter for byte counts that picks a binary unit, e.g. `32 KiB` or `1.5 MiB`.
pub struct FormatBytes(pub usize);
impl core::fmt::Display for FormatBytes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
        let mut unit = 0;
        let mut whole = self.0;
        let mut rest = 0;
        while whole >= 1024 && unit < UNITS.len() - 1 {
            rest = whole % 1024;
            whole /= 1024;
            unit += 1;
        }
        if rest == 0 {
            write!(f, "{whole} {}", UNITS[unit])
        } else {
            // One decimal is plenty for region sizes.
            write!(f, "{whole}.{} {}", rest * 10 / 1024, UNITS[unit])
        }
    }
}
