//! Walks a sitemap tree, resolves page titles and searches them.
//!
//! The binary in `main.rs` is a thin CLI over these modules.

pub mod cache;
pub mod error;
pub mod metrics;
pub mod network;
pub mod options;
pub mod results;
pub mod selector;
pub mod sitemap;
pub mod title;
pub mod utils;
