//! Hugging Face Hub client for ggchat.
//!
//! Implements [`ggchat_core::HfClientPort`]: tag search, repository file
//! listing and file size probing. Everything else about the Hub stays
//! private to this crate.

#![deny(unsafe_code)]
// DefaultHfClient is meant to be used through the HfClientPort trait, not
// its internal generic structure
#![allow(private_interfaces)]

mod client;
mod config;
mod endpoints;
mod error;
mod http;
mod models;

// ============================================================================
// Public API
// ============================================================================

// Client
pub use client::DefaultHfClient;

// Configuration
pub use config::HfClientConfig;

// Errors
pub use error::HfError;
