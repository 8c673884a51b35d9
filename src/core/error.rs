//! Error taxonomy for the fetch, persist and compute pipeline.

/// Errors raised while tracking a single asset.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackerError {
    #[error("failed to fetch price for {asset}: {reason}")]
    FetchFailed { asset: String, reason: String },

    #[error("invalid response for {asset}")]
    InvalidResponse { asset: String },

    #[error("stored data under {key} is corrupt: {reason}")]
    StorageCorrupt { key: String, reason: String },

    #[error("storage failure for {key}: {reason}")]
    Storage { key: String, reason: String },

    #[error("cannot compute a statistic over an empty series")]
    EmptySeries,
}

impl TrackerError {
    pub fn fetch_failed(asset: &str, reason: impl std::fmt::Display) -> Self {
        TrackerError::FetchFailed {
            asset: asset.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_response(asset: &str) -> Self {
        TrackerError::InvalidResponse {
            asset: asset.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_asset() {
        let err = TrackerError::invalid_response("bitcoin");
        assert_eq!(err.to_string(), "invalid response for bitcoin");

        let err = TrackerError::fetch_failed("dogecoin", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "failed to fetch price for dogecoin: HTTP 503"
        );
    }
}
