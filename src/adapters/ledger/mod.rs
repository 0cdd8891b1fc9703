//! BidLedger implementations.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryBidLedger;
pub use postgres::PostgresBidLedger;
