//! Maps kernel configurations to the kernels implementing them.
//!
//! The mapping is total: every [KernelKey] that can be constructed has a real and a dummy kernel,
//! generated at build time by the `kernel_table!` macro. Adding a [DelayLevel] or [Stride]
//! variant without adding it to the table is a build error.
//!
//! Kernel keys also have a textual form, `<direction>-<pattern>-<operation>-delay<N>`, e.g.
//! `forward-sequential-read-delay8` or `reverse-stride4-write-delay0`. Random chases have no
//! direction and are named `random-<operation>-delay<N>`.

use core::fmt;
use core::str::FromStr;
use log::trace;
use memsweep_proc_macros::kernel_table;

pub use crate::delay::DelayLevel;
use crate::kernels::KernelFn;
use crate::{Error, WORD_SIZE};

/// The distance between consecutive accesses of a strided kernel, in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stride {
    S2,
    S4,
    S8,
    S16,
}

impl Stride {
    pub const ALL: [Stride; 4] = [Stride::S2, Stride::S4, Stride::S8, Stride::S16];

    pub const fn words(self) -> usize {
        match self {
            Stride::S2 => 2,
            Stride::S4 => 4,
            Stride::S8 => 8,
            Stride::S16 => 16,
        }
    }
}

impl TryFrom<usize> for Stride {
    type Error = Error;

    fn try_from(words: usize) -> Result<Self, Self::Error> {
        Stride::ALL
            .into_iter()
            .find(|stride| stride.words() == words)
            .ok_or(Error::UnsupportedStride(words))
    }
}

/// The order in which a kernel visits the words of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Every word, one after the other.
    Sequential,
    /// Every word, in interleaved passes that each skip ahead by the stride.
    Strided(Stride),
    /// Every word, in the order of the pointer chain stored in the region.
    RandomChase,
}

impl Pattern {
    /// Every pattern, in the order used by [KernelKey::all].
    pub const ALL: [Pattern; 6] = [
        Pattern::Sequential,
        Pattern::Strided(Stride::S2),
        Pattern::Strided(Stride::S4),
        Pattern::Strided(Stride::S8),
        Pattern::Strided(Stride::S16),
        Pattern::RandomChase,
    ];

    /// The number of words between consecutive accesses.
    pub const fn stride_words(self) -> usize {
        match self {
            Pattern::Sequential | Pattern::RandomChase => 1,
            Pattern::Strided(stride) => stride.words(),
        }
    }
}

/// Whether a kernel loads or stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Write,
}

/// Whether a kernel walks towards higher or lower addresses. Has no effect on random chases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Identifies one kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelKey {
    pub pattern: Pattern,
    pub operation: Operation,
    pub direction: Direction,
    pub delay: DelayLevel,
}

impl KernelKey {
    pub const fn new(
        pattern: Pattern,
        operation: Operation,
        direction: Direction,
        delay: DelayLevel,
    ) -> KernelKey {
        KernelKey {
            pattern,
            operation,
            direction,
            delay,
        }
    }

    /// A random-chase read without delay, which measures unloaded latency.
    pub const fn latency() -> KernelKey {
        KernelKey::new(
            Pattern::RandomChase,
            Operation::Read,
            Direction::Forward,
            DelayLevel::D0,
        )
    }

    /// Returns every distinct kernel key. Random chases are only listed in the forward direction,
    /// since both directions select the same kernels.
    pub fn all() -> impl Iterator<Item = KernelKey> {
        Pattern::ALL.into_iter().flat_map(|pattern| {
            [Operation::Read, Operation::Write]
                .into_iter()
                .flat_map(move |operation| {
                    let directions: &'static [Direction] = match pattern {
                        Pattern::RandomChase => &[Direction::Forward],
                        _ => &[Direction::Forward, Direction::Reverse],
                    };
                    directions.iter().flat_map(move |&direction| {
                        DelayLevel::ALL.into_iter().map(move |delay| {
                            KernelKey::new(pattern, operation, direction, delay)
                        })
                    })
                })
        })
    }

    /// Returns the same key at another delay level.
    pub const fn with_delay(self, delay: DelayLevel) -> KernelKey {
        KernelKey { delay, ..self }
    }
}

impl fmt::Display for KernelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operation = match self.operation {
            Operation::Read => "read",
            Operation::Write => "write",
        };
        let direction = match self.direction {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        };
        match self.pattern {
            Pattern::RandomChase => write!(f, "random-{operation}-{}", self.delay),
            Pattern::Sequential => {
                write!(f, "{direction}-sequential-{operation}-{}", self.delay)
            }
            Pattern::Strided(stride) => write!(
                f,
                "{direction}-stride{}-{operation}-{}",
                stride.words(),
                self.delay
            ),
        }
    }
}

impl FromStr for KernelKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        let first = parts.next().ok_or(Error::UnknownKernel)?;
        let (direction, pattern) = if first == "random" {
            (Direction::Forward, Pattern::RandomChase)
        } else {
            let direction = match first {
                "forward" => Direction::Forward,
                "reverse" => Direction::Reverse,
                _ => return Err(Error::UnknownKernel),
            };
            let pattern = match parts.next().ok_or(Error::UnknownKernel)? {
                "sequential" => Pattern::Sequential,
                other => {
                    let words = other
                        .strip_prefix("stride")
                        .and_then(|words| words.parse::<usize>().ok())
                        .ok_or(Error::UnknownKernel)?;
                    Pattern::Strided(Stride::try_from(words)?)
                }
            };
            (direction, pattern)
        };
        let operation = match parts.next().ok_or(Error::UnknownKernel)? {
            "read" => Operation::Read,
            "write" => Operation::Write,
            _ => return Err(Error::UnknownKernel),
        };
        let units = parts
            .next()
            .and_then(|delay| delay.strip_prefix("delay"))
            .and_then(|units| units.parse::<u32>().ok())
            .ok_or(Error::UnknownKernel)?;
        if parts.next().is_some() {
            return Err(Error::UnknownKernel);
        }
        Ok(KernelKey::new(
            pattern,
            operation,
            direction,
            DelayLevel::try_from(units)?,
        ))
    }
}

/// A real kernel and the dummy kernel that calibrates it.
#[derive(Clone, Copy)]
pub struct KernelPair {
    pub key: KernelKey,
    /// Performs the memory accesses.
    pub real: KernelFn,
    /// Runs the same loop as `real`, without touching memory.
    pub dummy: KernelFn,
    /// The unroll factor both kernels were instantiated with.
    pub unroll: usize,
}

impl KernelPair {
    const fn new(key: KernelKey, unroll: usize, real: KernelFn, dummy: KernelFn) -> KernelPair {
        KernelPair {
            key,
            real,
            dummy,
            unroll,
        }
    }

    /// The number of words a region's length must be a multiple of.
    pub const fn granularity_words(&self) -> usize {
        self.unroll * self.key.pattern.stride_words()
    }

    /// The number of bytes a region's length must be a multiple of.
    pub const fn granularity_bytes(&self) -> usize {
        self.granularity_words() * WORD_SIZE
    }

    /// Checks that a region of `words` words satisfies this pair's size requirements.
    pub fn check_len(&self, words: usize) -> Result<(), Error> {
        if words == 0 {
            return Err(Error::EmptyRegion);
        }
        let granularity = self.granularity_words();
        if words % granularity != 0 {
            return Err(Error::RegionSize { words, granularity });
        }
        Ok(())
    }
}

impl fmt::Debug for KernelPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelPair")
            .field("key", &self.key)
            .field("real", &(self.real as *const ()))
            .field("dummy", &(self.dummy as *const ()))
            .field("unroll", &self.unroll)
            .finish()
    }
}

/// Returns the real and dummy kernel for `key`.
pub fn select(key: KernelKey) -> KernelPair {
    let pair = lookup(key);
    trace!(
        "Selected {key} (unroll {}, granularity {} words)",
        pair.unroll,
        pair.granularity_words()
    );
    pair
}

// The unroll budget is split across the delay units of each level; see `unroll_factor`.
#[cfg(feature = "unroll-512")]
kernel_table! {
    unroll_budget: 512,
    delays: [0, 1, 2, 4, 8, 16, 32, 64, 128, 256],
    strides: [2, 4, 8, 16],
}

#[cfg(all(feature = "unroll-256", not(feature = "unroll-512")))]
kernel_table! {
    unroll_budget: 256,
    delays: [0, 1, 2, 4, 8, 16, 32, 64, 128, 256],
    strides: [2, 4, 8, 16],
}

#[cfg(all(
    feature = "unroll-128",
    not(any(feature = "unroll-256", feature = "unroll-512"))
))]
kernel_table! {
    unroll_budget: 128,
    delays: [0, 1, 2, 4, 8, 16, 32, 64, 128, 256],
    strides: [2, 4, 8, 16],
}

#[cfg(all(
    feature = "unroll-64",
    not(any(feature = "unroll-128", feature = "unroll-256", feature = "unroll-512"))
))]
kernel_table! {
    unroll_budget: 64,
    delays: [0, 1, 2, 4, 8, 16, 32, 64, 128, 256],
    strides: [2, 4, 8, 16],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::WRITE_PATTERN;
    use crate::chain;
    use crate::kernels::STATUS_OK;

    fn addresses(pair: &KernelPair) -> (usize, usize) {
        (pair.real as usize, pair.dummy as usize)
    }

    #[test]
    fn every_key_has_a_pair() {
        let mut count = 0;
        for key in KernelKey::all() {
            let pair = select(key);
            assert_eq!(pair.key, key);
            assert!(pair.unroll.is_power_of_two());
            assert_eq!(pair.unroll, unroll_factor(key.delay));
            assert!(pair.granularity_words() <= MAX_GRANULARITY_WORDS);
            assert_eq!(MAX_GRANULARITY_WORDS % pair.granularity_words(), 0);
            count += 1;
        }
        // Sequential and 4 strides, in 2 directions, plus the random chase, for 2 operations and
        // 10 delay levels.
        assert_eq!(count, (5 * 2 + 1) * 2 * 10);
    }

    #[test]
    fn real_and_dummy_differ() {
        for key in KernelKey::all() {
            let (real, dummy) = addresses(&select(key));
            assert_ne!(real, dummy, "{key}");
        }
    }

    #[test]
    fn random_chase_ignores_direction() {
        let forward = KernelKey::latency();
        let reverse = KernelKey {
            direction: Direction::Reverse,
            ..forward
        };
        assert_eq!(addresses(&select(forward)), addresses(&select(reverse)));
    }

    #[test]
    fn unroll_shrinks_with_delay() {
        for pair in DelayLevel::ALL.windows(2) {
            assert!(unroll_factor(pair[0]) >= unroll_factor(pair[1]));
        }
    }

    #[test]
    fn names_round_trip() {
        for key in KernelKey::all() {
            let name = key.to_string();
            assert_eq!(name.parse::<KernelKey>(), Ok(key), "{name}");
        }
    }

    #[test]
    fn names() {
        let key = KernelKey::new(
            Pattern::Sequential,
            Operation::Read,
            Direction::Forward,
            DelayLevel::D8,
        );
        assert_eq!(key.to_string(), "forward-sequential-read-delay8");
        let key = KernelKey::new(
            Pattern::Strided(Stride::S4),
            Operation::Write,
            Direction::Reverse,
            DelayLevel::D0,
        );
        assert_eq!(key.to_string(), "reverse-stride4-write-delay0");
        assert_eq!(KernelKey::latency().to_string(), "random-read-delay0");
    }

    #[test]
    fn bad_names() {
        for name in [
            "",
            "forward",
            "sideways-sequential-read-delay0",
            "forward-sequential-peek-delay0",
            "forward-sequential-read",
            "forward-sequential-read-delay0-extra",
            "forward-stridex-read-delay0",
        ] {
            assert_eq!(name.parse::<KernelKey>(), Err(Error::UnknownKernel), "{name}");
        }
        assert_eq!(
            "forward-stride3-read-delay0".parse::<KernelKey>(),
            Err(Error::UnsupportedStride(3))
        );
        assert_eq!(
            "random-write-delay3".parse::<KernelKey>(),
            Err(Error::UnsupportedDelay(3))
        );
    }

    #[test]
    fn check_len() {
        let pair = select(KernelKey::new(
            Pattern::Strided(Stride::S16),
            Operation::Read,
            Direction::Forward,
            DelayLevel::D0,
        ));
        let granularity = pair.granularity_words();
        assert_eq!(pair.check_len(0), Err(Error::EmptyRegion));
        assert_eq!(pair.check_len(granularity * 3), Ok(()));
        assert_eq!(
            pair.check_len(granularity + 1),
            Err(Error::RegionSize {
                words: granularity + 1,
                granularity
            })
        );
    }

    // Runs every kernel of the table over a real region.
    #[test]
    fn every_kernel_runs() {
        let mut words = vec![0; MAX_GRANULARITY_WORDS];
        for key in KernelKey::all() {
            let pair = select(key);
            if key.pattern == Pattern::RandomChase {
                chain::build_random_cycle(&mut words, 11);
            }
            let range = words.as_mut_ptr_range();
            assert_eq!(unsafe { (pair.dummy)(range.start, range.end) }, STATUS_OK);
            assert_eq!(unsafe { (pair.real)(range.start, range.end) }, STATUS_OK);
            if key.operation == Operation::Write && key.pattern != Pattern::RandomChase {
                assert!(words.iter().all(|&word| word == WRITE_PATTERN), "{key}");
                words.fill(0);
            }
        }
    }
}
