pub mod poller;
pub mod types;

pub use poller::SnapshotPoller;
pub use types::Snapshot;
