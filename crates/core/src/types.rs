/// Jobs are keyed by a time-ordered UUID (v7).
pub type JobId = uuid::Uuid;

/// Worker identifiers are opaque strings handed out by the registry.
pub type WorkerId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
