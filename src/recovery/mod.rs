pub mod bus;
pub mod publisher;

pub use bus::{MemoryBus, NatsBus, RecoveryBus};
pub use publisher::{RecoveryPublisher, RecoveryRequest, RecoveryWorker};
