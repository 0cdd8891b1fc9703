//! Per-connection participant actor.
//!
//! Each upgraded connection gets two tasks. The read loop parses inbound
//! frames into bid requests and forwards them to the room; the write loop
//! drains the participant's outbound queue onto the socket and keeps the
//! peer alive with periodic pings. Either loop ending tears the pair down:
//! the read loop removes the participant from the room, which drops the
//! room's sender, which ends the write loop with a close frame.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

use crate::config::AuctionConfig;
use crate::domain::foundation::{Amount, AuctionId, BidderId};
use crate::ports::{ConnectionError, Frame, MessageSink, MessageSource};

use super::messages::{Kind, Message};
use super::room::{AuctionEnded, BidRequest, Participant, RoomHandle};

/// Connection-scoped actor for one authenticated bidder.
pub struct ParticipantActor;

impl ParticipantActor {
    /// Admit `bidder` to the room and spawn the read and write loops over
    /// the given connection halves.
    ///
    /// # Errors
    ///
    /// Returns [`AuctionEnded`] if the room is no longer running; the
    /// connection halves are dropped unused in that case.
    pub async fn spawn(
        auction_id: AuctionId,
        bidder: BidderId,
        room: RoomHandle,
        reader: impl MessageSource + 'static,
        writer: impl MessageSink + 'static,
        config: AuctionConfig,
    ) -> Result<(), AuctionEnded> {
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_capacity);

        room.admit(Participant {
            bidder,
            outbound: outbound_tx.clone(),
        })
        .await?;

        // The write loop keeps only a weak sender for its own identity, so
        // it never holds the queue open against the closure cascade.
        let identity = outbound_tx.downgrade();

        tokio::spawn(read_loop(
            auction_id,
            bidder,
            room.clone(),
            reader,
            outbound_tx,
            config,
        ));
        tokio::spawn(write_loop(
            auction_id,
            bidder,
            room,
            identity,
            outbound_rx,
            writer,
            config,
        ));

        Ok(())
    }
}

async fn read_loop(
    auction_id: AuctionId,
    bidder: BidderId,
    room: RoomHandle,
    mut reader: impl MessageSource,
    outbound: mpsc::Sender<Message>,
    config: AuctionConfig,
) {
    loop {
        // Any inbound frame, pong included, restarts the liveness window.
        let frame = match timeout(config.read_deadline(), reader.recv()).await {
            Err(_) => {
                tracing::info!(
                    auction_id = %auction_id,
                    bidder = %bidder,
                    "read deadline lapsed, dropping connection"
                );
                break;
            }
            Ok(Err(ConnectionError::Closed)) => break,
            Ok(Err(e)) => {
                tracing::warn!(
                    auction_id = %auction_id,
                    bidder = %bidder,
                    error = %e,
                    "read failed"
                );
                break;
            }
            Ok(Ok(frame)) => frame,
        };

        match frame {
            Frame::Text(text) => match parse_bid(&text, bidder, config.max_frame_bytes) {
                Ok(request) => {
                    if room.submit(request).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        auction_id = %auction_id,
                        bidder = %bidder,
                        error = %e,
                        "malformed inbound frame"
                    );
                    if outbound.try_send(Message::malformed(bidder)).is_err() {
                        break;
                    }
                }
            },
            Frame::Ping | Frame::Pong => {}
            Frame::Close => break,
        }
    }

    // Dropping our sender together with the room's copy closes the
    // outbound queue, which ends the write loop. Removal carries the
    // sender so a reconnect that already replaced this session stays.
    let _ = room
        .remove(Participant {
            bidder,
            outbound,
        })
        .await;
}

async fn write_loop(
    auction_id: AuctionId,
    bidder: BidderId,
    room: RoomHandle,
    identity: mpsc::WeakSender<Message>,
    mut outbound: mpsc::Receiver<Message>,
    mut writer: impl MessageSink,
    config: AuctionConfig,
) {
    let first_tick = Instant::now() + config.heartbeat_period();
    let mut heartbeat = interval_at(first_tick, config.heartbeat_period());
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe = outbound.recv() => {
                let Some(message) = maybe else { break };
                let closing = message.kind == Kind::AuctionClosed;

                let payload = serde_json::to_string(&message)
                    .expect("Message serialization should not fail");
                if write(&mut writer, Frame::Text(payload), config.write_deadline())
                    .await
                    .is_err()
                {
                    tracing::warn!(
                        auction_id = %auction_id,
                        bidder = %bidder,
                        "write failed, dropping connection"
                    );
                    break;
                }

                if closing {
                    // Final event: stop accepting queued traffic and say
                    // goodbye to the peer.
                    outbound.close();
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if write(&mut writer, Frame::Ping, config.write_deadline())
                    .await
                    .is_err()
                {
                    tracing::debug!(
                        auction_id = %auction_id,
                        bidder = %bidder,
                        "heartbeat failed, dropping connection"
                    );
                    break;
                }
            }
        }
    }

    // After a write failure the queue may still be open; leaving the room
    // now stops broadcasts to a peer that cannot receive them. Upgrading
    // fails once the queue is already closed, which is the normal path.
    if let Some(outbound) = identity.upgrade() {
        let _ = room
            .remove(Participant {
                bidder,
                outbound,
            })
            .await;
    }

    let _ = write(&mut writer, Frame::Close, config.write_deadline()).await;
    let _ = writer.close().await;
}

async fn write(
    writer: &mut impl MessageSink,
    frame: Frame,
    deadline: Duration,
) -> Result<(), ConnectionError> {
    timeout(deadline, writer.send(frame))
        .await
        .map_err(|_| ConnectionError::Transport("write deadline lapsed".to_string()))?
}

#[derive(Debug, Error)]
enum FrameError {
    #[error("frame of {0} bytes exceeds the inbound limit")]
    TooLarge(usize),
    #[error("unreadable payload: {0}")]
    BadPayload(#[from] serde_json::Error),
    #[error("bid carries no amount")]
    MissingAmount,
    #[error("bid amount is not a valid price")]
    BadAmount,
}

/// Turn an inbound text frame into a bid request.
///
/// The only thing a participant may send is a bid, so every readable frame
/// is treated as one. The sender identity always comes from the
/// authenticated connection, never from the payload.
fn parse_bid(text: &str, bidder: BidderId, max_frame_bytes: usize) -> Result<BidRequest, FrameError> {
    if text.len() > max_frame_bytes {
        return Err(FrameError::TooLarge(text.len()));
    }

    let message: Message = serde_json::from_str(text)?;
    let amount = message.amount.ok_or(FrameError::MissingAmount)?;
    let amount = Amount::new(amount).map_err(|_| FrameError::BadAmount)?;

    Ok(BidRequest { bidder, amount })
}
