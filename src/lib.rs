//! PageForge backend - payment-gated access for an AI page generator.
//!
//! This library provides the core functionality for the PageForge server:
//! license persistence, Stripe checkout and webhook reconciliation, access
//! tokens, and the server-side generation proxy.

pub mod config;
pub mod error;
pub mod extractors;
pub mod generate;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod token;
