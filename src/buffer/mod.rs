//! Buffer management: pinned page frames and the pluggable manager the
//! tree pins and unpins pages through.

mod frame;
mod lru;
mod manager;

pub use frame::Frame;
pub use manager::{BufferManager, InMemoryBufferManager, PagedBufferManager};
