//! Watch list: pinned addresses displayed alongside the search

pub mod set;
pub mod watcher;

pub use set::WatcherSet;
pub use watcher::Watcher;
