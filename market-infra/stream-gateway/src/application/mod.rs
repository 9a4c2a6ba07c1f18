pub mod client;
pub mod config;
pub mod market_data_handler;
pub mod reconciler;
pub mod registry;
pub mod retry;
pub mod supervisor;

pub use client::StreamClient;
pub use config::ClientConfig;
pub use market_data_handler::MarketDataHandler;
pub use reconciler::{DiffOutcome, OrderBookReconciler};
pub use registry::{ActiveSubscription, DeliveryGate, Registration, Subscriber, SubscriptionRegistry};
pub use retry::{RetryError, RetryPolicy, retry};
pub use supervisor::ConnectionSupervisor;
