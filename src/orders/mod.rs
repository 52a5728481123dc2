//! Order / escrow domain module
//!
//! An order is the escrow lifecycle for one listing purchase: buyer funds are
//! held at creation and leave escrow exactly once, through buyer confirmation,
//! the auto-release deadline, or dispute resolution.

mod model;
mod service;
mod sweeper;

pub use model::*;
pub use service::OrderService;
pub use sweeper::run_auto_release_sweeper;
