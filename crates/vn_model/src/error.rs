use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Inconsistent expiration state: {0}")]
    InconsistentExpiration(String),

    #[error("Oversize text attachment is not valid UTF-8")]
    OversizeTextNotUtf8,

    #[error("Unknown content type: {0}")]
    UnknownContentType(String),
}
