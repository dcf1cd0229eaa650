//! Encoder error types.

use thiserror::Error;

/// QR encoding errors.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Options out of range or malformed.
    #[error("invalid QR options: {0}")]
    InvalidOptions(String),

    /// Data does not fit a QR symbol at the requested level.
    #[error("QR encoding failed: {0}")]
    Symbol(#[from] qrcode::types::QrError),

    /// Raster output failed.
    #[error("image rendering failed: {0}")]
    Image(#[from] image::ImageError),
}

impl EncodeError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }
}
