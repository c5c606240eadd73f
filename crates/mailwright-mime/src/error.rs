//! Error types for part-tree operations.

/// Result type alias for part-tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Part-tree error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Header name does not match the `^[a-z][a-z0-9-]+$` form.
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    /// Header is derived from the part state and cannot be set directly.
    #[error("Header is managed and cannot be set directly: {0}")]
    ProhibitedHeader(String),

    /// Transfer encoding is not valid for this part.
    #[error("Invalid transfer encoding: {0}")]
    InvalidEncoding(String),

    /// Email address failed the syntax check.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Operation does not apply to this part variant.
    #[error("Invalid part operation: {0}")]
    InvalidPart(String),

    /// Message has no body part set.
    #[error("Message has no body part")]
    MissingBody,

    /// Part has no content to read.
    #[error("Part has no content")]
    MissingContent,

    /// The external message source failed to produce data for a node.
    #[error("Failed to read message source at node {path}: {reason}")]
    SourceRead {
        /// Dotted child-index path of the failing node.
        path: String,
        /// Reason reported by the source.
        reason: String,
    },

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
