pub type FlipbookResult<T> = Result<T, FlipbookError>;

#[derive(thiserror::Error, Debug)]
pub enum FlipbookError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("narration error: {0}")]
    Narration(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlipbookError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn narration(msg: impl Into<String>) -> Self {
        Self::Narration(msg.into())
    }
}
