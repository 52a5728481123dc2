//! Pazar escrow & settlement core
//!
//! The money-handling heart of a marketplace where community members trade
//! with each other: a double-bucket wallet ledger, escrow-backed orders with
//! delivery confirmation and timed auto-release, and staff-driven dispute
//! resolution with full or split payouts. A thin axum facade exposes the
//! services over HTTP; all invariants live in the service layer.

pub mod config;
pub mod db;
pub mod disputes;
pub mod error;
pub mod handlers;
pub mod listings;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod orders;
pub mod routes;
pub mod state;
pub mod users;
pub mod wallet;
