use thiserror::Error;

/// Error taxonomy from the error-handling design: callers branch on the variant to decide
/// whether a failure is fatal (abort the process) or scoped to one unit of work (log and
/// move on). `anyhow::Error` is used everywhere a caller only needs to propagate-and-log;
/// this enum exists at the boundaries where the *kind* of failure changes control flow.
#[derive(Debug, Error)]
pub enum AuditorError {
    #[error("fatal configuration error: {0}")]
    FatalConfig(String),

    #[error("sql guard mismatch for query {query_id}: remote text diverges from vendored copy")]
    SqlGuardMismatch { query_id: String },

    #[error("transient RPC failure after exhausting retries: {0}")]
    RpcRetriesExhausted(String),

    #[error("permanent RPC failure: {0}")]
    RpcPermanent(String),

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("persistence store failure: {0}")]
    Store(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuditorError {
    /// Whether this error should terminate the whole process (section 7: only the config
    /// layer and the SQL guard may do so).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuditorError::FatalConfig(_) | AuditorError::SqlGuardMismatch { .. }
        )
    }
}
