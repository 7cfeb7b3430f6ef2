//! Receipt Scanner Server Library
//!
//! Reads the printed total off a receipt photo, keeps the receipt staged for
//! the browser session, and on confirmation uploads it (plus evidence photos)
//! and appends a row to the shared expense ledger.
//!
//! # Modules
//!
//! - `detection`: locating the total region on the photo
//! - `ocr`: reading the region's text
//! - `staging`: per-session staged receipts and their temporary files
//! - `uploads`: the Receipt and Evidence storage services
//! - `ledger`: the expense ledger and its plan/account lookups
//! - `pipeline`: the capture and submission flows
//! - `routes`: the HTTP surface

pub mod config;
pub mod detection;
pub mod error;
pub mod ledger;
pub mod ocr;
pub mod pipeline;
pub mod routes;
pub mod staging;
pub mod state;
pub mod uploads;
