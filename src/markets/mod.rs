pub mod market;
pub mod polymarket;
pub mod venue;

pub use market::{parse_market_type, Market, MarketKind, MarketType, Usd};
pub use polymarket::PolymarketSettings;
pub use venue::{DefaultVenueConnector, MarketVenue, OrderSide, Trade, VenueConnector};
