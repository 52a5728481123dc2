//! Listing domain module
//!
//! Minimal listing provider seam: the escrow core needs to know a listing's
//! seller and price, check that it is purchasable, and flip it to sold inside
//! the purchase transaction. Full listing CRUD lives elsewhere.

mod model;
mod service;

pub use model::*;
pub use service::ListingService;
