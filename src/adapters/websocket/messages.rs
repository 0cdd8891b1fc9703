//! Wire protocol for live auction traffic.
//!
//! One JSON object per frame, shared by both directions:
//! `{kind, message?, amount?, user_id?}`. The numeric kind tags are a
//! versioned contract with deployed clients and must never be renumbered.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Amount, BidderId};

/// Message kind with stable numeric wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Kind {
    /// Client asks to place a bid.
    PlaceBid = 0,
    /// The requester's bid was recorded.
    BidAccepted = 1,
    /// Someone else's bid was recorded.
    NewBid = 2,
    /// The auction reached its deadline.
    AuctionClosed = 3,
    /// The requester's bid was refused.
    BidRejected = 4,
    /// The last inbound frame could not be understood.
    MalformedRequest = 5,
}

impl From<Kind> for u8 {
    fn from(kind: Kind) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for Kind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Kind::PlaceBid),
            1 => Ok(Kind::BidAccepted),
            2 => Ok(Kind::NewBid),
            3 => Ok(Kind::AuctionClosed),
            4 => Ok(Kind::BidRejected),
            5 => Ok(Kind::MalformedRequest),
            other => Err(format!("unknown message kind: {}", other)),
        }
    }
}

/// One frame of auction traffic.
///
/// The same shape travels in both directions and between tasks inside the
/// engine; senders fill only the fields their kind needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub kind: Kind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<BidderId>,
}

impl Message {
    /// Ack to the bidder whose bid was just recorded.
    pub fn bid_accepted(bidder: BidderId) -> Self {
        Self {
            kind: Kind::BidAccepted,
            message: Some("Your bid has been placed!".to_string()),
            amount: None,
            user_id: Some(bidder),
        }
    }

    /// Broadcast to everyone else after a recorded bid.
    pub fn new_bid(bidder: BidderId, amount: Amount) -> Self {
        Self {
            kind: Kind::NewBid,
            message: Some("New bid has been placed!".to_string()),
            amount: Some(amount.value()),
            user_id: Some(bidder),
        }
    }

    /// Rejection sent only to the bidder.
    pub fn bid_rejected(bidder: BidderId, reason: impl Into<String>) -> Self {
        Self {
            kind: Kind::BidRejected,
            message: Some(reason.into()),
            amount: None,
            user_id: Some(bidder),
        }
    }

    /// Final notification when the deadline fires.
    pub fn auction_closed() -> Self {
        Self {
            kind: Kind::AuctionClosed,
            message: Some("Auction has finished".to_string()),
            amount: None,
            user_id: None,
        }
    }

    /// Notice back to a participant that sent an unreadable frame.
    pub fn malformed(bidder: BidderId) -> Self {
        Self {
            kind: Kind::MalformedRequest,
            message: Some("this message is invalid".to_string()),
            amount: None,
            user_id: Some(bidder),
        }
    }
}
