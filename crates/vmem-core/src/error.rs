//! Error types for vmem

use nix::errno::Errno;
use thiserror::Error;

use crate::region::AccessMode;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid mapping request: {0}")]
    InvalidArgument(String),

    #[error("mmap of {size} bytes at offset {offset} ({mode:?}) failed: {errno}")]
    Map {
        mode: AccessMode,
        offset: u64,
        size: u64,
        errno: Errno,
    },

    #[error("munmap of {len} bytes at {addr:#x} failed: {errno}")]
    Unmap { addr: usize, len: usize, errno: Errno },

    #[error("index {index} out of bounds: capacity {capacity}")]
    OutOfBounds { index: usize, capacity: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
