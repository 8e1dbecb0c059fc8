//! Concurrency substrate: SPSC ring buffer and bounded thread pool

pub mod pool;
pub mod ring;

pub use pool::{TaskHandle, ThreadPool};
pub use ring::{ring, Consumer, Producer};
