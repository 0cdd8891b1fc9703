//! Per-auction room: the serialization point for bids.
//!
//! Exactly one task runs a room. It multiplexes admissions, departures and
//! bid submissions against the auction deadline, so every bid is evaluated
//! against the ledger strictly in arrival order without any locking. Two
//! concurrent bids from different connections are totally ordered; the
//! second one sees the first one's effect on the highest bid.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::domain::auction::validate_bid;
use crate::domain::foundation::{Amount, AuctionId, BidderId};
use crate::ports::{BidLedger, LedgerError};

use super::messages::Message;

/// Capacity of the room's inbound bid channel.
const SUBMIT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the admit/remove channels.
const MEMBERSHIP_CHANNEL_CAPACITY: usize = 16;

/// A bid request already tagged with the authenticated sender.
#[derive(Debug, Clone, Copy)]
pub struct BidRequest {
    pub bidder: BidderId,
    pub amount: Amount,
}

/// One admitted participant: identity plus the outbound queue owned by its
/// connection actor.
#[derive(Debug)]
pub struct Participant {
    pub bidder: BidderId,
    pub outbound: mpsc::Sender<Message>,
}

/// The room's task has exited; the auction is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the auction has ended")]
pub struct AuctionEnded;

/// Cloneable handle for talking to a running room.
///
/// Every operation fails with [`AuctionEnded`] once the room's task has
/// returned, which is how callers distinguish a live auction from a
/// finished one.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    admit_tx: mpsc::Sender<Participant>,
    remove_tx: mpsc::Sender<Participant>,
    submit_tx: mpsc::Sender<BidRequest>,
}

impl RoomHandle {
    /// Add a participant to the live set. A participant with the same
    /// identity is replaced; the old entry's queue is dropped.
    pub async fn admit(&self, participant: Participant) -> Result<(), AuctionEnded> {
        self.admit_tx
            .send(participant)
            .await
            .map_err(|_| AuctionEnded)
    }

    /// Drop a departing participant from the live set. Idempotent. The
    /// entry is only evicted when it still belongs to this session, so a
    /// stale connection winding down cannot evict its replacement.
    pub async fn remove(&self, departing: Participant) -> Result<(), AuctionEnded> {
        self.remove_tx
            .send(departing)
            .await
            .map_err(|_| AuctionEnded)
    }

    /// Queue a bid for serialized evaluation.
    pub async fn submit(&self, request: BidRequest) -> Result<(), AuctionEnded> {
        self.submit_tx.send(request).await.map_err(|_| AuctionEnded)
    }
}

/// Single-task event loop coordinating one auction.
pub struct AuctionRoom {
    id: AuctionId,
    deadline: Instant,
    ledger: Arc<dyn BidLedger>,
    participants: HashMap<BidderId, mpsc::Sender<Message>>,
    admit_rx: mpsc::Receiver<Participant>,
    remove_rx: mpsc::Receiver<Participant>,
    submit_rx: mpsc::Receiver<BidRequest>,
}

enum Rejection {
    TooLow,
    NotRecorded,
}

impl AuctionRoom {
    /// Build a room closing at `deadline`, returning the handle used to
    /// reach it. The room does nothing until [`AuctionRoom::run`] is
    /// spawned.
    pub fn new(
        id: AuctionId,
        deadline: Instant,
        ledger: Arc<dyn BidLedger>,
    ) -> (Self, RoomHandle) {
        let (admit_tx, admit_rx) = mpsc::channel(MEMBERSHIP_CHANNEL_CAPACITY);
        let (remove_tx, remove_rx) = mpsc::channel(MEMBERSHIP_CHANNEL_CAPACITY);
        let (submit_tx, submit_rx) = mpsc::channel(SUBMIT_CHANNEL_CAPACITY);

        let room = Self {
            id,
            deadline,
            ledger,
            participants: HashMap::new(),
            admit_rx,
            remove_rx,
            submit_rx,
        };
        let handle = RoomHandle {
            admit_tx,
            remove_tx,
            submit_tx,
        };
        (room, handle)
    }

    /// Run the event loop until the deadline fires.
    ///
    /// Consumes the room; when this returns, all channels are dropped and
    /// every handle operation fails with [`AuctionEnded`].
    pub async fn run(mut self) {
        tracing::info!(auction_id = %self.id, "auction room started");

        let deadline = tokio::time::sleep_until(self.deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    self.close_all();
                    break;
                }
                Some(participant) = self.admit_rx.recv() => self.admit(participant),
                Some(departing) = self.remove_rx.recv() => self.remove(departing),
                Some(request) = self.submit_rx.recv() => self.place_bid(request).await,
                else => break,
            }
        }

        tracing::info!(auction_id = %self.id, "auction room stopped");
    }

    fn admit(&mut self, participant: Participant) {
        tracing::info!(
            auction_id = %self.id,
            bidder = %participant.bidder,
            "participant joined"
        );
        // Same identity replaces: dropping the previous sender abandons the
        // old connection's outbound half.
        self.participants
            .insert(participant.bidder, participant.outbound);
    }

    fn remove(&mut self, departing: Participant) {
        // Match on channel identity, not just bidder id: the departing
        // session may already have been replaced by a reconnect.
        let is_current = self
            .participants
            .get(&departing.bidder)
            .is_some_and(|current| current.same_channel(&departing.outbound));
        if is_current {
            self.participants.remove(&departing.bidder);
            tracing::info!(
                auction_id = %self.id,
                bidder = %departing.bidder,
                "participant left"
            );
        }
    }

    async fn place_bid(&mut self, request: BidRequest) {
        tracing::debug!(
            auction_id = %self.id,
            bidder = %request.bidder,
            amount = %request.amount,
            "bid received"
        );

        match self.evaluate(request).await {
            Ok(()) => {
                self.deliver(request.bidder, Message::bid_accepted(request.bidder));
                let broadcast = Message::new_bid(request.bidder, request.amount);
                for (bidder, outbound) in &self.participants {
                    if *bidder == request.bidder {
                        continue;
                    }
                    Self::push(self.id, *bidder, outbound, broadcast.clone());
                }
            }
            Err(Rejection::TooLow) => {
                self.deliver(
                    request.bidder,
                    Message::bid_rejected(request.bidder, "the bid value is too low"),
                );
            }
            Err(Rejection::NotRecorded) => {
                self.deliver(
                    request.bidder,
                    Message::bid_rejected(request.bidder, "your bid could not be recorded"),
                );
            }
        }
    }

    /// Serial bid evaluation: floor check against the ledger, then atomic
    /// record. This runs on the room task only, so within one auction no
    /// two evaluations ever interleave.
    async fn evaluate(&self, request: BidRequest) -> Result<(), Rejection> {
        let product = self
            .ledger
            .get_product(self.id)
            .await
            .map_err(|e| self.store_failure("product lookup", e))?;
        let highest = self
            .ledger
            .get_highest_bid(self.id)
            .await
            .map_err(|e| self.store_failure("highest bid lookup", e))?;

        validate_bid(
            product.base_price,
            highest.map(|bid| bid.amount),
            request.amount,
        )
        .map_err(|_| Rejection::TooLow)?;

        match self
            .ledger
            .record_bid(self.id, request.bidder, request.amount)
            .await
        {
            Ok(bid) => {
                tracing::info!(
                    auction_id = %self.id,
                    bidder = %bid.bidder_id,
                    amount = %bid.amount,
                    "bid recorded"
                );
                Ok(())
            }
            // An outside writer may still beat us to the ledger; same
            // rejection as a serial too-low bid.
            Err(LedgerError::BidTooLow) => Err(Rejection::TooLow),
            Err(e) => Err(self.store_failure("bid record", e)),
        }
    }

    fn store_failure(&self, operation: &str, error: LedgerError) -> Rejection {
        tracing::error!(
            auction_id = %self.id,
            operation,
            error = %error,
            "ledger failure during bid evaluation"
        );
        Rejection::NotRecorded
    }

    fn deliver(&self, bidder: BidderId, message: Message) {
        if let Some(outbound) = self.participants.get(&bidder) {
            Self::push(self.id, bidder, outbound, message);
        }
    }

    fn push(
        auction_id: AuctionId,
        bidder: BidderId,
        outbound: &mpsc::Sender<Message>,
        message: Message,
    ) {
        // try_send: a stalled peer must not block the room's event loop.
        if let Err(e) = outbound.try_send(message) {
            tracing::warn!(
                auction_id = %auction_id,
                bidder = %bidder,
                error = %e,
                "dropped outbound message"
            );
        }
    }

    fn close_all(&mut self) {
        tracing::info!(
            auction_id = %self.id,
            participants = self.participants.len(),
            "auction deadline reached, closing room"
        );
        let closed = Message::auction_closed();
        for (bidder, outbound) in &self.participants {
            Self::push(self.id, *bidder, outbound, closed.clone());
        }
        self.participants.clear();
    }
}
