//! Live auction delivery over WebSockets.
//!
//! One [`room::AuctionRoom`] task per auction serializes every bid; one
//! [`participant::ParticipantActor`] per connection bridges the socket into
//! the room. The [`registry::AuctionRegistry`] is the process-wide map from
//! auction id to running room.

pub mod handler;
pub mod messages;
pub mod mock;
pub mod participant;
pub mod registry;
pub mod room;
pub mod socket;

pub use handler::{auction_router, AuctionWsState, AuthenticatedBidder};
pub use messages::{Kind, Message};
pub use registry::{AuctionRegistry, JoinError, StartError};
pub use room::{AuctionRoom, BidRequest, Participant, RoomHandle};
