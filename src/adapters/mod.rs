//! Adapters: concrete implementations of the ports.

pub mod ledger;
pub mod websocket;
