//! Dispute domain module
//!
//! A dispute suspends an order's escrow until a staff decision routes the
//! held funds: all to the buyer, all to the seller, or an explicit split.

mod model;
mod service;

pub use model::*;
pub use service::DisputeService;
