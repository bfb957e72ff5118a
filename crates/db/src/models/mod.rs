//! Row structs matching the database tables.

pub mod job;
pub mod worker;
