//! Bid acceptance rules.
//!
//! A bid is acceptable only if it is strictly greater than both the
//! product's base price and the currently highest recorded bid. With no
//! prior bid the floor degrades to the base price alone, so any amount
//! above it qualifies. Equal amounts are never accepted: there are no ties.

use thiserror::Error;

use crate::domain::foundation::Amount;

/// Business rejection: the offered amount does not clear the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the bid value is too low")]
pub struct BidTooLow;

/// The minimum amount the next bid must strictly exceed.
pub fn bid_floor(base_price: Amount, highest_bid: Option<Amount>) -> Amount {
    match highest_bid {
        Some(highest) if highest > base_price => highest,
        _ => base_price,
    }
}

/// Checks an offered amount against the current floor.
pub fn validate_bid(
    base_price: Amount,
    highest_bid: Option<Amount>,
    offered: Amount,
) -> Result<(), BidTooLow> {
    if offered > bid_floor(base_price, highest_bid) {
        Ok(())
    } else {
        Err(BidTooLow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn amount(v: f64) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn first_bid_must_exceed_base_price() {
        assert!(validate_bid(amount(100.0), None, amount(150.0)).is_ok());
        assert_eq!(
            validate_bid(amount(100.0), None, amount(100.0)),
            Err(BidTooLow)
        );
        assert_eq!(
            validate_bid(amount(100.0), None, amount(99.0)),
            Err(BidTooLow)
        );
    }

    #[test]
    fn later_bids_must_exceed_highest() {
        assert!(validate_bid(amount(100.0), Some(amount(150.0)), amount(151.0)).is_ok());
        assert_eq!(
            validate_bid(amount(100.0), Some(amount(150.0)), amount(150.0)),
            Err(BidTooLow)
        );
        assert_eq!(
            validate_bid(amount(100.0), Some(amount(150.0)), amount(140.0)),
            Err(BidTooLow)
        );
    }

    #[test]
    fn floor_ignores_stale_highest_below_base() {
        // A recorded highest below the base price never lowers the floor.
        assert_eq!(bid_floor(amount(100.0), Some(amount(40.0))), amount(100.0));
    }

    proptest! {
        /// Replaying any bid sequence through the rules yields a strictly
        /// increasing chain of accepted amounts.
        #[test]
        fn accepted_amounts_strictly_increase(
            base in 0.0f64..10_000.0,
            offers in proptest::collection::vec(0.0f64..20_000.0, 1..64),
        ) {
            let base = amount(base);
            let mut highest: Option<Amount> = None;
            let mut accepted = Vec::new();

            for offer in offers {
                let offer = amount(offer);
                if validate_bid(base, highest, offer).is_ok() {
                    accepted.push(offer);
                    highest = Some(offer);
                }
            }

            for pair in accepted.windows(2) {
                prop_assert!(pair[1] > pair[0]);
            }
            if let Some(first) = accepted.first() {
                prop_assert!(*first > base);
            }
        }
    }
}
