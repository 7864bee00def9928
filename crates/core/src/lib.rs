//! Medistore Core - Shared domain types.
//!
//! This crate provides the value types used across all Medistore components:
//! - `storefront` - Remote API client and client-side state slices
//! - `cli` - Terminal view layer over the storefront slices
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no async. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, quantities, addresses,
//!   emails, ratings and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
