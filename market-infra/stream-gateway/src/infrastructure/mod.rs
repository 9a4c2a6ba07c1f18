pub mod cobinhood;
pub mod parsers;
pub mod ws_client;

pub use cobinhood::CobinhoodProtocol;
pub use parsers::GateIoProtocol;
pub use ws_client::WsConnector;
