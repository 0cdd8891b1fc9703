//! Ports: trait boundaries between the auction engine and its collaborators.

mod bid_ledger;
mod connection;

pub use bid_ledger::{Bid, BidLedger, LedgerError, Product};
pub use connection::{ConnectionError, Frame, MessageSink, MessageSource};
