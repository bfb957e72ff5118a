use dispatch_core::error::CoreError;

use crate::client::ClientError;

/// Failure talking to a work source, in-process or remote.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl WorkerError {
    /// Whether repeating the same call later could succeed.
    ///
    /// Storage outages, network failures and 5xx/408/429 responses are
    /// transient. A rejected transition or an unknown id never heals.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Core(CoreError::Storage(_)) => true,
            WorkerError::Core(_) => false,
            WorkerError::Client(ClientError::Request(_)) => true,
            WorkerError::Client(ClientError::Api { status, .. }) => {
                *status >= 500 || *status == 408 || *status == 429
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dispatch_core::job::JobState;

    use super::*;

    #[test]
    fn transient_failures_are_retryable() {
        assert!(WorkerError::Core(CoreError::Storage("down".into())).is_retryable());
        assert!(WorkerError::Client(ClientError::Api {
            status: 503,
            body: String::new(),
        })
        .is_retryable());
    }

    #[test]
    fn rejections_are_final() {
        let job_id = dispatch_core::types::JobId::nil();
        assert!(!WorkerError::Core(CoreError::InvalidTransition {
            job_id,
            from: JobState::Done,
            to: JobState::Done,
        })
        .is_retryable());
        assert!(!WorkerError::Core(CoreError::job_not_found(job_id)).is_retryable());
        assert!(!WorkerError::Client(ClientError::Api {
            status: 409,
            body: String::new(),
        })
        .is_retryable());
    }
}
