//! In-memory implementation of BidLedger.
//!
//! Backs the engine in tests and local development. The whole store sits
//! behind one mutex, so the floor check and insert in `record_bid` are
//! atomic by construction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{Amount, AuctionId, BidderId, Timestamp};
use crate::ports::{Bid, BidLedger, LedgerError, Product};

struct Listing {
    product: Product,
    bids: Vec<Bid>,
}

/// In-memory implementation of BidLedger.
#[derive(Default)]
pub struct InMemoryBidLedger {
    listings: Mutex<HashMap<AuctionId, Listing>>,
    fail_next_record: AtomicBool,
}

impl InMemoryBidLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a product so an auction can run against it.
    pub fn add_product(&self, auction_id: AuctionId, base_price: Amount) {
        self.listings.lock().expect("lock").insert(
            auction_id,
            Listing {
                product: Product { base_price },
                bids: Vec::new(),
            },
        );
    }

    /// Make the next `record_bid` call fail with a store error.
    pub fn fail_next_record(&self) {
        self.fail_next_record.store(true, Ordering::SeqCst);
    }

    /// Number of bids recorded for an auction.
    pub fn bid_count(&self, auction_id: AuctionId) -> usize {
        self.listings
            .lock()
            .expect("lock")
            .get(&auction_id)
            .map(|listing| listing.bids.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl BidLedger for InMemoryBidLedger {
    async fn get_product(&self, auction_id: AuctionId) -> Result<Product, LedgerError> {
        self.listings
            .lock()
            .expect("lock")
            .get(&auction_id)
            .map(|listing| listing.product)
            .ok_or(LedgerError::NotFound(auction_id))
    }

    async fn get_highest_bid(
        &self,
        auction_id: AuctionId,
    ) -> Result<Option<Bid>, LedgerError> {
        let listings = self.listings.lock().expect("lock");
        let listing = listings
            .get(&auction_id)
            .ok_or(LedgerError::NotFound(auction_id))?;

        Ok(listing
            .bids
            .iter()
            .copied()
            .max_by(|a, b| a.amount.partial_cmp(&b.amount).expect("finite amounts")))
    }

    async fn record_bid(
        &self,
        auction_id: AuctionId,
        bidder_id: BidderId,
        amount: Amount,
    ) -> Result<Bid, LedgerError> {
        if self.fail_next_record.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Store("injected store failure".to_string()));
        }

        let mut listings = self.listings.lock().expect("lock");
        let listing = listings
            .get_mut(&auction_id)
            .ok_or(LedgerError::NotFound(auction_id))?;

        let floor_not_cleared = listing.product.base_price >= amount
            || listing.bids.iter().any(|bid| bid.amount >= amount);
        if floor_not_cleared {
            return Err(LedgerError::BidTooLow);
        }

        let bid = Bid {
            auction_id,
            bidder_id,
            amount,
            placed_at: Timestamp::now(),
        };
        listing.bids.push(bid);
        Ok(bid)
    }
}
