// ABOUTME: Error types for provider calls.
// ABOUTME: Keeps "not found" distinguishable from every other failure.

/// Errors from provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("address range already in use: {0}")]
    AddressInUse(String),

    #[error("unsupported invocation context: {0}")]
    Unsupported(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("unexpected provider output: {0}")]
    InvalidOutput(String),

    #[error("provider error: {0}")]
    Other(String),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    NotFound,
    AlreadyExists,
    PermissionDenied,
    AddressInUse,
    Unsupported,
    Other,
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::NotFound(_) => ProviderErrorKind::NotFound,
            ProviderError::AlreadyExists(_) => ProviderErrorKind::AlreadyExists,
            ProviderError::PermissionDenied(_) => ProviderErrorKind::PermissionDenied,
            ProviderError::AddressInUse(_) => ProviderErrorKind::AddressInUse,
            ProviderError::Unsupported(_) => ProviderErrorKind::Unsupported,
            ProviderError::Spawn { .. }
            | ProviderError::InvalidOutput(_)
            | ProviderError::Other(_) => ProviderErrorKind::Other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ProviderErrorKind::NotFound
    }
}
