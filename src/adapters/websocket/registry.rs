//! Process-wide registry of running auction rooms.
//!
//! The registry owns the map from auction id to room handle. Rooms remove
//! themselves when their task exits, so a missing entry always means the
//! auction is not running, never that cleanup is pending somewhere else.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::time::Instant;

use crate::config::AuctionConfig;
use crate::domain::foundation::{AuctionId, BidderId, Timestamp};
use crate::ports::{BidLedger, LedgerError, MessageSink, MessageSource};

use super::participant::ParticipantActor;
use super::room::{AuctionRoom, RoomHandle};

/// Failure to start an auction.
#[derive(Debug, Error)]
pub enum StartError {
    /// A room for this auction is already running.
    #[error("auction {0} is already running")]
    AlreadyRunning(AuctionId),

    /// No product exists to run an auction against.
    #[error("no product found for auction {0}")]
    UnknownProduct(AuctionId),

    /// The ledger could not be consulted.
    #[error("ledger failure: {0}")]
    Ledger(LedgerError),
}

/// Failure to join an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinError {
    /// No room is running for this auction.
    #[error("auction {0} has ended or never started")]
    AuctionEnded(AuctionId),
}

/// Registry of live auction rooms, shared across all connections.
pub struct AuctionRegistry {
    rooms: Mutex<HashMap<AuctionId, RoomHandle>>,
    ledger: Arc<dyn BidLedger>,
    config: AuctionConfig,
}

impl AuctionRegistry {
    pub fn new(ledger: Arc<dyn BidLedger>, config: AuctionConfig) -> Arc<Self> {
        Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            ledger,
            config,
        })
    }

    /// Start a room for `auction_id` closing at `closes_at`.
    ///
    /// The room's task holds only a weak reference back to the registry,
    /// so dropping the registry never deadlocks on running rooms.
    ///
    /// # Errors
    ///
    /// Fails with [`StartError::AlreadyRunning`] when a live room exists,
    /// [`StartError::UnknownProduct`] when the ledger has no product for
    /// this auction, or [`StartError::Ledger`] when the lookup itself
    /// fails.
    pub async fn start_auction(
        self: &Arc<Self>,
        auction_id: AuctionId,
        closes_at: Timestamp,
    ) -> Result<RoomHandle, StartError> {
        self.ledger
            .get_product(auction_id)
            .await
            .map_err(|e| match e {
                LedgerError::NotFound(id) => StartError::UnknownProduct(id),
                other => StartError::Ledger(other),
            })?;

        let deadline = Instant::now() + closes_at.until();
        let (room, handle) = AuctionRoom::new(auction_id, deadline, self.ledger.clone());

        {
            let mut rooms = self.rooms.lock().expect("lock");
            if rooms.contains_key(&auction_id) {
                return Err(StartError::AlreadyRunning(auction_id));
            }
            rooms.insert(auction_id, handle.clone());
        }

        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            room.run().await;
            if let Some(registry) = registry.upgrade() {
                registry.remove_room(auction_id);
            }
        });

        tracing::info!(auction_id = %auction_id, closes_at = %closes_at, "auction started");
        Ok(handle)
    }

    /// Attach a connection to a running auction as `bidder`.
    ///
    /// # Errors
    ///
    /// Fails with [`JoinError::AuctionEnded`] when no room is running, or
    /// when the room terminates between lookup and admission.
    pub async fn join_auction(
        &self,
        auction_id: AuctionId,
        bidder: BidderId,
        reader: impl MessageSource + 'static,
        writer: impl MessageSink + 'static,
    ) -> Result<(), JoinError> {
        let handle = self
            .room(auction_id)
            .ok_or(JoinError::AuctionEnded(auction_id))?;

        ParticipantActor::spawn(auction_id, bidder, handle, reader, writer, self.config)
            .await
            .map_err(|_| JoinError::AuctionEnded(auction_id))
    }

    /// Whether a room is currently running for this auction.
    pub fn is_running(&self, auction_id: AuctionId) -> bool {
        self.rooms.lock().expect("lock").contains_key(&auction_id)
    }

    /// Number of rooms currently running.
    pub fn running_count(&self) -> usize {
        self.rooms.lock().expect("lock").len()
    }

    fn room(&self, auction_id: AuctionId) -> Option<RoomHandle> {
        self.rooms.lock().expect("lock").get(&auction_id).cloned()
    }

    fn remove_room(&self, auction_id: AuctionId) {
        if self.rooms.lock().expect("lock").remove(&auction_id).is_some() {
            tracing::info!(auction_id = %auction_id, "auction removed from registry");
        }
    }
}
