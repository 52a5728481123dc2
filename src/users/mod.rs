//! User domain module
//!
//! Identity seam for the escrow core: accounts and their marketplace roles.
//! Authentication itself lives at the gateway; this module only resolves and
//! stores who a user is.

mod model;
mod service;

pub use model::*;
pub use service::UserService;
