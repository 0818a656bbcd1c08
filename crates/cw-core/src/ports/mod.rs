//! Ports (trait seams) implemented by the outer layers.

mod snapshot_sink;

pub use snapshot_sink::SnapshotSink;
