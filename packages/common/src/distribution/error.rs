use thiserror::Error;

/// Errors raised while interpreting distribution payloads.
#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("unsupported manifest type: {0}")]
    UnsupportedMediaType(String),
}
