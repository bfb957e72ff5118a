//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource.
//! Handlers delegate to the [`DispatchContext`] in application state and map
//! errors via [`AppError`].
//!
//! [`DispatchContext`]: dispatch_core::context::DispatchContext
//! [`AppError`]: crate::error::AppError

pub mod jobs;
pub mod workers;
