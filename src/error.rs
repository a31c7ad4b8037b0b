use thiserror::Error;

/// Errors reported at the boundary between a driver and the kernels. The kernels themselves never
/// fail: these are all detected before a kernel is invoked.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("the region contains no words")]
    EmptyRegion,

    #[error("a region of {words} words is not a multiple of the kernel's {granularity}-word granularity")]
    RegionSize { words: usize, granularity: usize },

    #[error("random-chase kernels need a region holding a pointer chain")]
    NotChained,

    #[error("{0} is not a supported delay level")]
    UnsupportedDelay(u32),

    #[error("{0} is not a supported stride")]
    UnsupportedStride(usize),

    #[error("not a known kernel name")]
    UnknownKernel,
}
