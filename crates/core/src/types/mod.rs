//! Core types for the Exprz shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod otp;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{
    CURRENCY_CODE, CURRENCY_SYMBOL, OrderTotals, format_amount, format_money, line_total, round2,
};
pub use otp::{OtpCode, OtpCodeError};
pub use status::*;
