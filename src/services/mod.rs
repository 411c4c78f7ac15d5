//! Business services layer.
//!
//! Services sit between the command line and the infrastructure layer:
//!
//! ```text
//! Command line (scan, authorize)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Infrastructure (Providers, Storage)
//! ```
//!
//! - [`ScanService`]: lists recent threads, analyzes them, and ranks the
//!   ones that still need a reply

mod scan_service;

pub use scan_service::{
    rank, ScanError, ScanOptions, ScanOutcome, ScanParams, ScanResult, ScanService,
};
