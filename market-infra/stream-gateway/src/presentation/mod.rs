pub mod dispatch_bus;

pub use dispatch_bus::{DEFAULT_QUEUE_CAPACITY, DispatchBus};
