//! The delay primitives that kernels invoke after every memory access.
//!
//! A delay of `K` units is a chain of `K` dependent register increments. It never touches memory,
//! so its cost is independent of the memory subsystem, and it grows linearly with `K`. Sweeping
//! the delay level lets a driver trade off injected bandwidth against observed latency.

use core::fmt;
use memsweep_proc_macros::delay_impls;

use crate::Error;

/// A delay primitive, spinning for [Delay::UNITS] delay units each time it's invoked.
pub trait Delay {
    /// The number of delay units spent per invocation of [Delay::delay].
    const UNITS: u32;

    /// Spins for [Delay::UNITS] delay units.
    fn delay();
}

/// The delay primitive for `UNITS` delay units. Only implemented for the levels in [DelayLevel].
pub struct Spin<const UNITS: u32>;

delay_impls!(0, 1, 2, 4, 8, 16, 32, 64, 128, 256);

/// The set of supported delay levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DelayLevel {
    D0,
    D1,
    D2,
    D4,
    D8,
    D16,
    D32,
    D64,
    D128,
    D256,
}

impl DelayLevel {
    /// Every delay level, in ascending order.
    pub const ALL: [DelayLevel; 10] = [
        DelayLevel::D0,
        DelayLevel::D1,
        DelayLevel::D2,
        DelayLevel::D4,
        DelayLevel::D8,
        DelayLevel::D16,
        DelayLevel::D32,
        DelayLevel::D64,
        DelayLevel::D128,
        DelayLevel::D256,
    ];

    /// The number of delay units inserted after each access.
    pub const fn units(self) -> u32 {
        match self {
            DelayLevel::D0 => Spin::<0>::UNITS,
            DelayLevel::D1 => Spin::<1>::UNITS,
            DelayLevel::D2 => Spin::<2>::UNITS,
            DelayLevel::D4 => Spin::<4>::UNITS,
            DelayLevel::D8 => Spin::<8>::UNITS,
            DelayLevel::D16 => Spin::<16>::UNITS,
            DelayLevel::D32 => Spin::<32>::UNITS,
            DelayLevel::D64 => Spin::<64>::UNITS,
            DelayLevel::D128 => Spin::<128>::UNITS,
            DelayLevel::D256 => Spin::<256>::UNITS,
        }
    }

    /// Returns the level with twice as many delay units, if there is one. Level 0 doubles to
    /// level 1, since doubling zero units would get a sweep stuck.
    pub fn doubled(self) -> Option<DelayLevel> {
        DelayLevel::try_from((self.units() * 2).max(1)).ok()
    }

    /// Invokes the delay primitive of this level once.
    pub fn spin(self) {
        match self {
            DelayLevel::D0 => Spin::<0>::delay(),
            DelayLevel::D1 => Spin::<1>::delay(),
            DelayLevel::D2 => Spin::<2>::delay(),
            DelayLevel::D4 => Spin::<4>::delay(),
            DelayLevel::D8 => Spin::<8>::delay(),
            DelayLevel::D16 => Spin::<16>::delay(),
            DelayLevel::D32 => Spin::<32>::delay(),
            DelayLevel::D64 => Spin::<64>::delay(),
            DelayLevel::D128 => Spin::<128>::delay(),
            DelayLevel::D256 => Spin::<256>::delay(),
        }
    }
}

impl TryFrom<u32> for DelayLevel {
    type Error = Error;

    fn try_from(units: u32) -> Result<Self, Self::Error> {
        DelayLevel::ALL
            .into_iter()
            .find(|level| level.units() == units)
            .ok_or(Error::UnsupportedDelay(units))
    }
}

impl fmt::Display for DelayLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delay{}", self.units())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ascending_powers_of_two() {
        assert_eq!(DelayLevel::ALL[0].units(), 0);
        for pair in DelayLevel::ALL[1..].windows(2) {
            assert!(pair[0].units().is_power_of_two());
            assert_eq!(pair[0].units() * 2, pair[1].units());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn units_round_trip() {
        for level in DelayLevel::ALL {
            assert_eq!(DelayLevel::try_from(level.units()), Ok(level));
        }
        assert_eq!(DelayLevel::try_from(3), Err(Error::UnsupportedDelay(3)));
        assert_eq!(DelayLevel::try_from(512), Err(Error::UnsupportedDelay(512)));
    }

    #[test]
    fn doubling_walks_every_level() {
        let mut level = DelayLevel::D0;
        let mut visited = vec![level];
        while let Some(next) = level.doubled() {
            visited.push(next);
            level = next;
        }
        assert_eq!(visited, DelayLevel::ALL);
    }

    // The primitives have no observable effect besides elapsed time, so all we can check here is
    // that every one of them runs to completion.
    #[test]
    fn every_level_completes() {
        for level in DelayLevel::ALL {
            for _ in 0..100 {
                level.spin();
            }
        }
    }

    #[test]
    fn display() {
        assert_eq!(DelayLevel::D0.to_string(), "delay0");
        assert_eq!(DelayLevel::D128.to_string(), "delay128");
    }
}
