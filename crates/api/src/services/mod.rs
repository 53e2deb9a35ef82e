//! Business logic services.

pub mod auth;
pub mod email;
pub mod invoice;
pub mod notifications;
pub mod orders;
pub mod whatsapp;
