//! Domain layer for the work dispatcher.
//!
//! Job lifecycle, error taxonomy, storage ports with an in-memory backend,
//! the worker registry and the dispatcher façade. Has no knowledge of HTTP
//! or SQL; `dispatch-db` and `dispatch-api` build on top of it.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod memory;
pub mod registry;
pub mod store;
pub mod types;
pub mod worker;
