//! Auction bidding rules.

mod evaluation;

pub use evaluation::{bid_floor, validate_bid, BidTooLow};
