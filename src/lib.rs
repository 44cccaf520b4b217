use std::error::Error;

pub mod blocks;
pub mod config;
pub mod cover;
pub mod error;
pub mod kobo;
pub mod model;
pub mod notion;
pub mod summary;
pub mod sync;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, SyncError};

    #[test]
    fn test_unpack_error_walks_sources() {
        let err = SyncError::Page {
            action: "create",
            source: StoreError::Api {
                status: 400,
                code: "validation_error".to_string(),
                message: "Title is not a property".to_string(),
            },
        };
        assert_eq!(
            unpack_error(&err),
            "failed to create page: ApiError: 400 validation_error: Title is not a property"
        );
    }
}
