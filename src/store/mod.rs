pub mod disk;
pub mod memory;

pub use disk::DiskSnapshotStore;
pub use memory::MemorySnapshotStore;
