//! Integration tests for the live auction flow.
//!
//! These tests verify the end-to-end path:
//! 1. A room is started through the registry
//! 2. Connections join over the connection port and become participants
//! 3. Bids travel through the room's serialization point to the ledger
//! 4. Outcomes fan out to the right participants
//! 5. The deadline closes the room and unregisters it
//!
//! Uses the in-memory ledger and connection pair, so no sockets or
//! database are involved.

use std::sync::Arc;
use std::time::Duration;

use bidhall::adapters::ledger::InMemoryBidLedger;
use bidhall::adapters::websocket::{mock, AuctionRegistry, JoinError, Kind, Message};
use bidhall::config::AuctionConfig;
use bidhall::domain::foundation::{Amount, AuctionId, BidderId, Timestamp};
use bidhall::ports::{BidLedger, Frame};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Auction {
    registry: Arc<AuctionRegistry>,
    ledger: Arc<InMemoryBidLedger>,
    id: AuctionId,
}

/// Registry with one running auction over a product at base price 100.
async fn start_auction(closes_in_secs: i64) -> Auction {
    start_auction_with(closes_in_secs, AuctionConfig::default()).await
}

async fn start_auction_with(closes_in_secs: i64, config: AuctionConfig) -> Auction {
    let ledger = Arc::new(InMemoryBidLedger::new());
    let id = AuctionId::new();
    ledger.add_product(id, Amount::new(100.0).unwrap());

    let registry = AuctionRegistry::new(ledger.clone(), config);
    registry
        .start_auction(id, Timestamp::now().plus_seconds(closes_in_secs))
        .await
        .expect("auction should start");

    Auction {
        registry,
        ledger,
        id,
    }
}

async fn join(auction: &Auction, bidder: BidderId) -> mock::PeerEnd {
    let (peer, source, sink) = mock::duplex();
    auction
        .registry
        .join_auction(auction.id, bidder, source, sink)
        .await
        .expect("join should succeed");
    peer
}

fn bid(peer: &mock::PeerEnd, amount: f64) {
    peer.send_text(&format!(r#"{{"kind":0,"amount":{}}}"#, amount));
}

async fn next(peer: &mut mock::PeerEnd) -> Message {
    tokio::time::timeout(Duration::from_secs(10), peer.next_message())
        .await
        .expect("timed out waiting for a message")
        .expect("connection closed unexpectedly")
}

// =============================================================================
// Bidding Flow
// =============================================================================

#[tokio::test]
async fn competing_bids_fan_out_to_the_right_participants() {
    let auction = start_auction(300).await;
    let (alice, bob, carol) = (BidderId::new(), BidderId::new(), BidderId::new());
    let mut alice_peer = join(&auction, alice).await;
    let mut bob_peer = join(&auction, bob).await;
    let mut carol_peer = join(&auction, carol).await;

    // Alice opens at 150: ack to her, broadcast to the others.
    bid(&alice_peer, 150.0);
    let ack = next(&mut alice_peer).await;
    assert_eq!(ack.kind, Kind::BidAccepted);
    assert_eq!(ack.user_id, Some(alice));

    for peer in [&mut bob_peer, &mut carol_peer] {
        let seen = next(peer).await;
        assert_eq!(seen.kind, Kind::NewBid);
        assert_eq!(seen.amount, Some(150.0));
        assert_eq!(seen.user_id, Some(alice));
    }

    // Bob undercuts at 140: rejection to him alone.
    bid(&bob_peer, 140.0);
    let rejection = next(&mut bob_peer).await;
    assert_eq!(rejection.kind, Kind::BidRejected);
    assert_eq!(rejection.message.as_deref(), Some("the bid value is too low"));

    // Carol takes the lead at 200.
    bid(&carol_peer, 200.0);
    assert_eq!(next(&mut carol_peer).await.kind, Kind::BidAccepted);
    for peer in [&mut alice_peer, &mut bob_peer] {
        let seen = next(peer).await;
        assert_eq!(seen.kind, Kind::NewBid);
        assert_eq!(seen.amount, Some(200.0));
        assert_eq!(seen.user_id, Some(carol));
    }

    // Only the two accepted bids reached the ledger.
    assert_eq!(auction.ledger.bid_count(auction.id), 2);
    let highest = auction
        .ledger
        .get_highest_bid(auction.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(highest.amount, Amount::new(200.0).unwrap());
    assert_eq!(highest.bidder_id, carol);
}

#[tokio::test]
async fn unreadable_frame_is_answered_without_touching_the_ledger() {
    let auction = start_auction(300).await;
    let mut peer = join(&auction, BidderId::new()).await;

    peer.send_text("{definitely not json");
    assert_eq!(next(&mut peer).await.kind, Kind::MalformedRequest);

    // The connection survives and a proper bid still works.
    bid(&peer, 150.0);
    assert_eq!(next(&mut peer).await.kind, Kind::BidAccepted);
    assert_eq!(auction.ledger.bid_count(auction.id), 1);
}

#[tokio::test]
async fn ledger_failure_is_reported_to_the_bidder() {
    let auction = start_auction(300).await;
    let mut peer = join(&auction, BidderId::new()).await;

    auction.ledger.fail_next_record();
    bid(&peer, 150.0);

    let notice = next(&mut peer).await;
    assert_eq!(notice.kind, Kind::BidRejected);
    assert_eq!(
        notice.message.as_deref(),
        Some("your bid could not be recorded")
    );
    assert_eq!(auction.ledger.bid_count(auction.id), 0);
}

#[tokio::test]
async fn reconnecting_bidder_replaces_the_previous_session() {
    // A short read deadline so the abandoned session winds down quickly.
    let config = AuctionConfig {
        read_deadline_secs: 2,
        write_deadline_secs: 1,
        ..AuctionConfig::default()
    };
    let auction = start_auction_with(300, config).await;
    let bidder = BidderId::new();

    let mut first = join(&auction, bidder).await;
    let mut second = join(&auction, bidder).await;

    bid(&second, 150.0);
    assert_eq!(next(&mut second).await.kind, Kind::BidAccepted);

    // The first session's outbound side is torn down with a close frame.
    let mut saw_close = false;
    while let Some(frame) =
        tokio::time::timeout(Duration::from_secs(10), first.next_frame())
            .await
            .expect("timed out waiting for teardown")
    {
        if frame == Frame::Close {
            saw_close = true;
            break;
        }
    }
    assert!(saw_close);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn deadline_closes_participants_and_unregisters_the_room() {
    // A read deadline beyond the auction's lifetime, so the idle peer is
    // still admitted when the close fires.
    let config = AuctionConfig {
        read_deadline_secs: 120,
        write_deadline_secs: 10,
        ..AuctionConfig::default()
    };
    let auction = start_auction_with(60, config).await;
    let bidder = BidderId::new();
    let mut peer = join(&auction, bidder).await;

    tokio::time::advance(Duration::from_secs(61)).await;

    let farewell = peer.next_message().await.expect("closing event");
    assert_eq!(farewell.kind, Kind::AuctionClosed);
    assert_eq!(farewell.message.as_deref(), Some("Auction has finished"));

    // The socket closes after the final event.
    let mut saw_close = false;
    while let Some(frame) = peer.next_frame().await {
        if frame == Frame::Close {
            saw_close = true;
            break;
        }
    }
    assert!(saw_close);

    // The registry forgets the room, so a rejoin is refused.
    for _ in 0..100 {
        if !auction.registry.is_running(auction.id) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(!auction.registry.is_running(auction.id));

    let (_peer, source, sink) = mock::duplex();
    let result = auction
        .registry
        .join_auction(auction.id, bidder, source, sink)
        .await;
    assert_eq!(result, Err(JoinError::AuctionEnded(auction.id)));
}

#[tokio::test]
async fn joining_an_auction_that_never_started_is_refused() {
    let registry = AuctionRegistry::new(
        Arc::new(InMemoryBidLedger::new()),
        AuctionConfig::default(),
    );

    let auction = AuctionId::new();
    let (_peer, source, sink) = mock::duplex();
    let result = registry
        .join_auction(auction, BidderId::new(), source, sink)
        .await;
    assert_eq!(result, Err(JoinError::AuctionEnded(auction)));
}
