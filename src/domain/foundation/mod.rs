//! Foundation value objects shared across the domain.

mod errors;
mod ids;
mod money;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{AuctionId, BidderId};
pub use money::Amount;
pub use timestamp::Timestamp;
