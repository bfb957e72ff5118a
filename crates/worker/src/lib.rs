//! Worker runtime for the dispatch service.
//!
//! A worker registers once, then repeatedly asks a [`source::WorkSource`]
//! for the next job, runs it through a [`handler::JobHandler`], and reports
//! the outcome back.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod runner;
pub mod source;
