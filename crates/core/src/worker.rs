//! Worker records, id generation and name validation.

use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Timestamp, WorkerId};

/// Prefix on every generated worker id.
pub const WORKER_ID_PREFIX: &str = "worker-";

/// Number of random characters after the prefix.
const WORKER_ID_RANDOM_LEN: usize = 12;

/// Maximum length of a worker name.
const MAX_NAME_LEN: usize = 128;

/// A registered worker. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: Option<String>,
    pub registered_at: Timestamp,
}

impl Worker {
    pub fn new(id: WorkerId, name: Option<String>) -> Self {
        Self {
            id,
            name,
            registered_at: chrono::Utc::now(),
        }
    }
}

/// Generate a random worker id such as `worker-4fQ9xZk2LmA0`.
pub fn random_worker_id() -> WorkerId {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(WORKER_ID_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{WORKER_ID_PREFIX}{suffix}")
}

/// Validate a worker name.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_NAME_LEN` characters.
/// - Must contain only alphanumeric, hyphen, underscore, or dot characters.
pub fn validate_worker_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Worker name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Worker name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(
            "Worker name may only contain alphanumeric, hyphen, underscore, or dot characters"
                .to_string(),
        ));
    }
    Ok(())
}
