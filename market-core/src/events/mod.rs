mod market_events;

pub use market_events::CanonicalEvent;
