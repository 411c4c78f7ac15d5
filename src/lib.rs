//! forgot-to-reply - find inbox threads that are still waiting on you
//!
//! This crate scans recent Gmail threads, scores how likely each one is to
//! need a reply, and reports the most pressing ones.
//!
//! - [`analysis`]: header/body extraction, reply-need scoring, thread analysis
//! - [`services`]: the collection scanner
//! - [`providers`]: mail sources (Gmail REST)
//! - [`auth`], [`storage`]: OAuth authorization and refresh-token storage
//! - [`report`]: console report and JSON export

pub mod analysis;
pub mod auth;
pub mod config;
pub mod domain;
pub mod providers;
pub mod report;
pub mod services;
pub mod storage;
