mod connection_state;
mod error;
mod events;
mod sync_status;
mod topic;
mod traits;

pub use connection_state::ConnectionState;
pub use error::{DecodeError, ReconcileError, StreamError, TransportError};
pub use events::{EventCallback, StreamEvent};
pub use sync_status::SyncStatus;
pub use topic::{Channel, ChannelParams, SubscriptionId, Topic};
pub use traits::{
    Connector, ExchangeProtocol, Frame, FrameDecoder, FrameSink, FrameSource, SubscriptionEncoder,
};
