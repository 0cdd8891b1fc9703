//! PostgreSQL implementation of BidLedger.
//!
//! Products and bids live in two tables; `record_bid` performs the floor
//! re-check and the insert in a single conditional statement, which is what
//! makes the operation atomic against writers outside this process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::foundation::{Amount, AuctionId, BidderId, Timestamp};
use crate::ports::{Bid, BidLedger, LedgerError, Product};

/// PostgreSQL implementation of BidLedger.
#[derive(Clone)]
pub struct PostgresBidLedger {
    pool: PgPool,
}

impl PostgresBidLedger {
    /// Creates a new PostgresBidLedger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn product_exists(&self, auction_id: AuctionId) -> Result<bool, LedgerError> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE id = $1")
            .bind(auction_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LedgerError::Store(format!("Failed to check product existence: {}", e)))?;

        Ok(result.0 > 0)
    }
}

#[async_trait]
impl BidLedger for PostgresBidLedger {
    async fn get_product(&self, auction_id: AuctionId) -> Result<Product, LedgerError> {
        let row = sqlx::query("SELECT base_price FROM products WHERE id = $1")
            .bind(auction_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LedgerError::Store(format!("Failed to fetch product: {}", e)))?;

        match row {
            Some(row) => {
                let base_price: f64 = row
                    .try_get("base_price")
                    .map_err(|e| LedgerError::Store(format!("Malformed product row: {}", e)))?;
                let base_price = Amount::new(base_price)
                    .map_err(|e| LedgerError::Store(format!("Malformed base price: {}", e)))?;
                Ok(Product { base_price })
            }
            None => Err(LedgerError::NotFound(auction_id)),
        }
    }

    async fn get_highest_bid(
        &self,
        auction_id: AuctionId,
    ) -> Result<Option<Bid>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT product_id, bidder_id, amount, created_at
            FROM bids
            WHERE product_id = $1
            ORDER BY amount DESC
            LIMIT 1
            "#,
        )
        .bind(auction_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Store(format!("Failed to fetch highest bid: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_bid(row)?)),
            None => Ok(None),
        }
    }

    async fn record_bid(
        &self,
        auction_id: AuctionId,
        bidder_id: BidderId,
        amount: Amount,
    ) -> Result<Bid, LedgerError> {
        // Floor re-check and insert in one statement; a concurrent insert at
        // or above this amount makes the SELECT produce no row.
        let row = sqlx::query(
            r#"
            INSERT INTO bids (product_id, bidder_id, amount)
            SELECT p.id, $2, $3
            FROM products p
            WHERE p.id = $1
              AND p.base_price < $3
              AND NOT EXISTS (
                  SELECT 1 FROM bids b WHERE b.product_id = p.id AND b.amount >= $3
              )
            RETURNING product_id, bidder_id, amount, created_at
            "#,
        )
        .bind(auction_id.as_uuid())
        .bind(bidder_id.as_uuid())
        .bind(amount.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Store(format!("Failed to record bid: {}", e)))?;

        match row {
            Some(row) => row_to_bid(row),
            None if self.product_exists(auction_id).await? => Err(LedgerError::BidTooLow),
            None => Err(LedgerError::NotFound(auction_id)),
        }
    }
}

fn row_to_bid(row: sqlx::postgres::PgRow) -> Result<Bid, LedgerError> {
    let product_id: uuid::Uuid = row
        .try_get("product_id")
        .map_err(|e| LedgerError::Store(format!("Malformed bid row: {}", e)))?;
    let bidder_id: uuid::Uuid = row
        .try_get("bidder_id")
        .map_err(|e| LedgerError::Store(format!("Malformed bid row: {}", e)))?;
    let amount: f64 = row
        .try_get("amount")
        .map_err(|e| LedgerError::Store(format!("Malformed bid row: {}", e)))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| LedgerError::Store(format!("Malformed bid row: {}", e)))?;

    Ok(Bid {
        auction_id: AuctionId::from_uuid(product_id),
        bidder_id: BidderId::from_uuid(bidder_id),
        amount: Amount::new(amount)
            .map_err(|e| LedgerError::Store(format!("Malformed bid amount: {}", e)))?,
        placed_at: Timestamp::from_datetime(created_at),
    })
}
