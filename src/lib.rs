//! Caching and synchronization engine for Instagram post metrics.
//!
//! The Graph API is slow, rate limited, and rejects whole insight requests
//! over single unsupported metrics, so the dashboard never talks to it
//! directly. This crate decides when cached metrics are still trustworthy,
//! walks per-content-type fallback metric sets when they are not, and keeps
//! a three-state sync lifecycle per account so concurrent readers always
//! get a consistent answer.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod insights;
pub mod models;
pub mod sync;
