//! Model artifact downloads for ggchat.
//!
//! [`HttpModelFetcher`] implements [`ggchat_core::ModelFetcherPort`]. It
//! streams a repository file into `<file>.part`, resumes from that offset
//! with HTTP range requests after transient failures, and renames the
//! artifact into place once complete.

#![deny(unsafe_code)]

mod config;
mod disk;
mod fetcher;
mod progress;

pub use config::FetcherConfig;
pub use disk::available_space;
pub use fetcher::HttpModelFetcher;
