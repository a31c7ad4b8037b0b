//! Memory access kernels for measuring memory-subsystem throughput and latency.
//!
//! Each kernel walks a caller-supplied region of [Word]s under a given access pattern, performing
//! a volatile load or store per word and spinning for a configurable number of delay units after
//! every access. Each real kernel has a dummy counterpart with the exact same loop shape and delay
//! calls but without the memory instruction, so that the time spent on loop and delay overhead
//! can be measured separately from the time spent accessing memory.
//!
//! Kernels are obtained through [selector::select], keyed by a [selector::KernelKey]. The
//! [region::Region] type provides a checked way of invoking them.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(not(any(
    feature = "unroll-64",
    feature = "unroll-128",
    feature = "unroll-256",
    feature = "unroll-512"
)))]
compile_error!("pick an unroll budget feature: unroll-64, unroll-128, unroll-256 or unroll-512");

pub mod access;
pub mod chain;
pub mod debug_util;
pub mod delay;
mod error;
pub mod kernels;
pub mod region;
pub mod selector;
#[cfg(test)]
mod testing;
pub mod unroll;

pub use error::Error;

/// The access granule of every kernel.
pub type Word = u64;

/// The size of a [Word], in bytes.
pub const WORD_SIZE: usize = core::mem::size_of::<Word>();
