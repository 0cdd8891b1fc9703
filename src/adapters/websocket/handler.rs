//! HTTP surface for joining a live auction.
//!
//! `GET /auctions/:auction_id/ws` upgrades the connection and attaches it
//! to the running room. Participant identity arrives as a request
//! extension set by the authentication layer in front of this router.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};

use crate::config::AuctionConfig;
use crate::domain::foundation::{AuctionId, BidderId};

use super::registry::AuctionRegistry;
use super::socket::split_socket;

/// Identity of the authenticated participant, inserted upstream.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedBidder(pub BidderId);

/// Shared state for the auction routes.
#[derive(Clone)]
pub struct AuctionWsState {
    pub registry: Arc<AuctionRegistry>,
    pub config: AuctionConfig,
}

/// Router exposing the live auction endpoint.
pub fn auction_router() -> Router<AuctionWsState> {
    Router::new().route("/auctions/:auction_id/ws", get(ws_handler))
}

// The upgrade is taken as an Option so a request can be refused with a
// plain status before any upgrade negotiation happens.
async fn ws_handler(
    State(state): State<AuctionWsState>,
    Path(auction_id): Path<String>,
    bidder: Option<Extension<AuthenticatedBidder>>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let Ok(auction_id) = auction_id.parse::<AuctionId>() else {
        return (StatusCode::BAD_REQUEST, "invalid auction id").into_response();
    };

    let Some(Extension(AuthenticatedBidder(bidder))) = bidder else {
        return (StatusCode::UNAUTHORIZED, "missing participant identity").into_response();
    };

    if !state.registry.is_running(auction_id) {
        return (StatusCode::GONE, "the auction has ended").into_response();
    }

    let Some(ws) = ws else {
        return (StatusCode::UPGRADE_REQUIRED, "websocket upgrade required").into_response();
    };

    ws.max_message_size(state.config.max_frame_bytes)
        .on_upgrade(move |socket| async move {
            let (source, sink) = split_socket(socket);
            if let Err(e) = state
                .registry
                .join_auction(auction_id, bidder, source, sink)
                .await
            {
                tracing::info!(
                    auction_id = %auction_id,
                    bidder = %bidder,
                    error = %e,
                    "join refused after upgrade"
                );
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ledger::InMemoryBidLedger;
    use crate::domain::foundation::{Amount, Timestamp};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn request(path: &str, bidder: Option<BidderId>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(bidder) = bidder {
            builder = builder.extension(AuthenticatedBidder(bidder));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn app(registry: Arc<AuctionRegistry>) -> Router {
        auction_router().with_state(AuctionWsState {
            registry,
            config: AuctionConfig::default(),
        })
    }

    fn empty_registry() -> Arc<AuctionRegistry> {
        AuctionRegistry::new(
            Arc::new(InMemoryBidLedger::new()),
            AuctionConfig::default(),
        )
    }

    #[tokio::test]
    async fn unparseable_auction_id_is_a_bad_request() {
        let response = app(empty_registry())
            .oneshot(request("/auctions/not-a-uuid/ws", Some(BidderId::new())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let auction = AuctionId::new();
        let response = app(empty_registry())
            .oneshot(request(&format!("/auctions/{}/ws", auction), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn joining_a_stopped_auction_is_gone() {
        let auction = AuctionId::new();
        let response = app(empty_registry())
            .oneshot(request(
                &format!("/auctions/{}/ws", auction),
                Some(BidderId::new()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn running_auction_requires_an_upgrade() {
        let ledger = Arc::new(InMemoryBidLedger::new());
        let auction = AuctionId::new();
        ledger.add_product(auction, Amount::new(100.0).unwrap());

        let registry = AuctionRegistry::new(ledger, AuctionConfig::default());
        registry
            .start_auction(auction, Timestamp::now().plus_seconds(300))
            .await
            .unwrap();

        // A plain GET carries no upgrade machinery; the endpoint exists
        // and the room is live, so the only thing missing is the upgrade.
        let response = app(registry)
            .oneshot(request(
                &format!("/auctions/{}/ws", auction),
                Some(BidderId::new()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
    }
}
