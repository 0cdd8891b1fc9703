//! Bidhall - Real-Time Auction Backend
//!
//! This crate implements the live-bidding core of an auction platform:
//! per-auction rooms that serialize bid evaluation, per-connection actors
//! that bridge WebSocket traffic into those rooms, and the ports the
//! engine uses to reach durable storage.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
