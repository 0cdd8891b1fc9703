//! Auction engine configuration
//!
//! Liveness deadlines and queue bounds for connected participants. The
//! heartbeat period is always derived as 9/10 of the read deadline so a
//! probe goes out before the peer's window can lapse.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Auction engine configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AuctionConfig {
    /// Seconds a connection may stay silent before it is considered dead
    #[serde(default = "default_read_deadline")]
    pub read_deadline_secs: u64,

    /// Seconds a single outbound write may take
    #[serde(default = "default_write_deadline")]
    pub write_deadline_secs: u64,

    /// Maximum inbound frame size in bytes
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Capacity of each participant's outbound message queue
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
}

impl AuctionConfig {
    /// Read deadline as a Duration.
    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.read_deadline_secs)
    }

    /// Write deadline as a Duration.
    pub fn write_deadline(&self) -> Duration {
        Duration::from_secs(self.write_deadline_secs)
    }

    /// Heartbeat period: 9/10 of the read deadline.
    pub fn heartbeat_period(&self) -> Duration {
        self.read_deadline() * 9 / 10
    }

    /// Validate auction configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.read_deadline_secs == 0 || self.write_deadline_secs == 0 {
            return Err(ValidationError::InvalidDeadline);
        }
        if self.write_deadline_secs >= self.read_deadline_secs {
            return Err(ValidationError::InvalidDeadline);
        }
        if self.max_frame_bytes == 0 || self.outbound_queue_capacity == 0 {
            return Err(ValidationError::InvalidQueueBound);
        }
        Ok(())
    }
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            read_deadline_secs: default_read_deadline(),
            write_deadline_secs: default_write_deadline(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
        }
    }
}

fn default_read_deadline() -> u64 {
    20
}

fn default_write_deadline() -> u64 {
    10
}

fn default_max_frame_bytes() -> usize {
    512
}

fn default_outbound_queue_capacity() -> usize {
    512
}
