use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Unsupported security handler: {0}")]
    UnsupportedSecurityHandler(String),

    #[error("Encryption failed: {reason}")]
    EncryptionFailed {
        reason: String,
        #[source]
        source: Option<Box<PdfError>>,
    },

    #[error("Document too large: {size} bytes exceeds the limit of {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfError {
    /// Encryption failure without an underlying cause
    pub fn encryption_failed(reason: impl Into<String>) -> Self {
        PdfError::EncryptionFailed {
            reason: reason.into(),
            source: None,
        }
    }

    /// Wrap another error as the cause of an encryption failure.
    ///
    /// Size-limit errors pass through untouched: they describe the input,
    /// not the encryption.
    pub fn into_encryption_failure(self, reason: impl Into<String>) -> Self {
        match self {
            err @ PdfError::DocumentTooLarge { .. } => err,
            err @ PdfError::EncryptionFailed { .. } => err,
            other => PdfError::EncryptionFailed {
                reason: format!("{}: {other}", reason.into()),
                source: Some(Box::new(other)),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;
