//! Dispatch strategies: configuration, result merging, and the sequential
//! and layered-concurrent dispatchers.

mod concurrent;
mod config;
mod merge;
mod sync;

pub use concurrent::AsyncDispatcher;
pub use config::{ClockSource, DispatcherConfig, IdSource};
pub use merge::MergedResult;
pub use sync::Dispatcher;
