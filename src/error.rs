use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HttpError: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ApiError: {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("BatchTooLarge: {len} blocks, at most {max} per call")]
    BatchTooLarge { len: usize, max: usize },
    #[error("MalformedResponse: {0}")]
    MalformedResponse(String),
}

/// Failures that abort a single record. None of them stop the run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read annotations: {0:#}")]
    Source(anyhow::Error),
    #[error("failed to look up page")]
    Lookup(#[source] StoreError),
    #[error("failed to {action} page")]
    Page {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    pub fn page(action: &'static str) -> impl FnOnce(StoreError) -> SyncError {
        move |source| SyncError::Page { action, source }
    }
}
