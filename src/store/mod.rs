pub mod kv;
pub mod redis;
pub mod snapshot;

pub use kv::{KvStore, MemoryStore};
pub use self::redis::RedisStore;
pub use snapshot::SnapshotStore;
