//! Exprz Core - Shared domain types.
//!
//! This crate provides the types shared by the Exprz shop components:
//! - `api` - JSON API server (auth, catalog, cart, orders, notifications)
//! - `cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database encoding for the newtypes is gated behind
//! the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, OTP codes, money arithmetic and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
