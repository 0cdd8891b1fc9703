//! Domain layer: value objects and auction business rules.

pub mod auction;
pub mod foundation;
