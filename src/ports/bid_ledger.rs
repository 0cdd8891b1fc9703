//! BidLedger port - durable store of products and their bids.
//!
//! The auction room delegates all persistence to this port. The room's own
//! event loop serializes bids *within* one auction, but the ledger is shared
//! process-wide (and potentially with writers outside this engine), so
//! `record_bid` must itself be atomic: the implementation re-checks the
//! floor and inserts in a single step.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{Amount, AuctionId, BidderId, Timestamp};

/// Product listing data the engine needs for bid evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Product {
    /// Price every bid must strictly exceed.
    pub base_price: Amount,
}

/// A recorded bid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bid {
    pub auction_id: AuctionId,
    pub bidder_id: BidderId,
    pub amount: Amount,
    pub placed_at: Timestamp,
}

/// Errors surfaced by ledger operations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// No product exists for the auction id.
    #[error("auction not found: {0}")]
    NotFound(AuctionId),

    /// The conditional insert found a bid at or above the offered amount.
    ///
    /// Returned by `record_bid` when a writer outside this room's event loop
    /// got there first; the room treats it like any other too-low rejection.
    #[error("the bid value is too low")]
    BidTooLow,

    /// Any persistence failure on read or write.
    #[error("bid store failure: {0}")]
    Store(String),
}

/// Durable store of products and bids.
#[async_trait]
pub trait BidLedger: Send + Sync {
    /// Fetch the product under auction.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no product exists for the id
    /// - `Store` on persistence failure
    async fn get_product(&self, auction_id: AuctionId) -> Result<Product, LedgerError>;

    /// Fetch the highest recorded bid, `None` if nobody has bid yet.
    async fn get_highest_bid(&self, auction_id: AuctionId)
        -> Result<Option<Bid>, LedgerError>;

    /// Atomically record a bid strictly above the current floor.
    ///
    /// Implementations must perform the floor check and the insert in one
    /// atomic step so concurrent writers cannot interleave.
    ///
    /// # Errors
    ///
    /// - `BidTooLow` if the amount no longer clears the floor at insert time
    /// - `Store` on persistence failure
    async fn record_bid(
        &self,
        auction_id: AuctionId,
        bidder_id: BidderId,
        amount: Amount,
    ) -> Result<Bid, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bid_ledger_is_object_safe() {
        fn _accepts_dyn(_ledger: &dyn BidLedger) {}
    }
}
