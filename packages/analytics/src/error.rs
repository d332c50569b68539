use prep_algo::ParamError;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("invalid knowledge parameters for topic {topic}: {source}")]
    InvalidParams {
        topic: String,
        #[source]
        source: ParamError,
    },
    #[error("invalid attempt at index {index}: {reason}")]
    InvalidAttempt { index: usize, reason: String },
    #[error("invalid session: {0}")]
    InvalidSession(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
