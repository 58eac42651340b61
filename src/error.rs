use http::StatusCode;
use thiserror::Error;

/// Failure of a single call against the cluster API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("client-side API rate limit hit: {0}")]
    RateLimited(String),

    #[error("deadline exceeded, API slow or busy")]
    DeadlineExceeded,

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Rate limits and timeouts are worth another attempt; anything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::RateLimited(_) | FetchError::DeadlineExceeded)
    }
}

impl From<kube::Error> for FetchError {
    fn from(err: kube::Error) -> Self {
        if let kube::Error::Api(resp) = &err {
            if resp.code == StatusCode::TOO_MANY_REQUESTS.as_u16() {
                return FetchError::RateLimited(resp.message.clone());
            }
        }
        let message = err.to_string();
        let lower = message.to_lowercase();
        if lower.contains("throttl") || lower.contains("too many requests") {
            FetchError::RateLimited(message)
        } else if lower.contains("deadline exceeded") || lower.contains("timed out") {
            FetchError::DeadlineExceeded
        } else {
            FetchError::Other(message)
        }
    }
}

/// Why one namespace could not be scanned. Never aborts sibling namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceScanError {
    #[error("listing failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: FetchError },

    #[error("unable to list resources: {0}")]
    NonRetryable(FetchError),
}

/// Failures that stop the whole scan before any namespace task starts.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unable to list namespaces: {0}")]
    Discovery(#[source] FetchError),
}
