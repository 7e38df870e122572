use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Review error: {0}")]
    Review(#[from] ReviewError),
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Coarse error classification shown to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport failure or timeout.
    Network,
    /// HTTP 401.
    Auth,
    /// HTTP 429.
    RateLimit,
    /// HTTP 503 / 504.
    ServiceUnavailable,
    /// Other 4xx carrying a server detail.
    Validation,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::Validation => "validation",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// KlinikDeutsch backend errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Not authenticated: {detail}")]
    NotAuthenticated { detail: String },

    #[error("Rate limited: {detail}")]
    RateLimited { detail: String },

    #[error("Service unavailable: {status} - {detail}")]
    ServiceUnavailable { status: u16, detail: String },

    #[error("Request rejected: {status} - {detail}")]
    Validation { status: u16, detail: String },

    #[error("Unexpected response: {status} - {detail}")]
    Unknown { status: u16, detail: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("CSRF bootstrap failed: {message}")]
    Csrf { message: String },

    #[error("HTTP client setup failed: {message}")]
    Client { message: String },
}

impl ApiError {
    /// Classify a non-2xx HTTP status and the server-supplied detail.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 => ApiError::NotAuthenticated { detail },
            429 => ApiError::RateLimited { detail },
            503 | 504 => ApiError::ServiceUnavailable { status, detail },
            400..=499 => ApiError::Validation { status, detail },
            _ => ApiError::Unknown { status, detail },
        }
    }

    /// Error kind for the rendering layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network { .. } | ApiError::Timeout { .. } => ErrorKind::Network,
            ApiError::NotAuthenticated { .. } => ErrorKind::Auth,
            ApiError::RateLimited { .. } => ErrorKind::RateLimit,
            ApiError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Unknown { .. }
            | ApiError::InvalidResponse { .. }
            | ApiError::Csrf { .. }
            | ApiError::Client { .. } => ErrorKind::Unknown,
        }
    }

    /// HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotAuthenticated { .. } => Some(401),
            ApiError::RateLimited { .. } => Some(429),
            ApiError::ServiceUnavailable { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::Unknown { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short pt-BR message for display.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network { .. } | ApiError::Timeout { .. } => {
                "Falha de conexão com o servidor. Tente novamente.".to_string()
            }
            ApiError::NotAuthenticated { .. } => "Sessão expirada. Faça login novamente.".to_string(),
            ApiError::RateLimited { .. } => {
                "Muitas requisições. Aguarde alguns segundos.".to_string()
            }
            ApiError::ServiceUnavailable { .. } => {
                "Serviço temporariamente indisponível. Tente em instantes.".to_string()
            }
            ApiError::Validation { detail, .. } | ApiError::Unknown { detail, .. }
                if !detail.is_empty() =>
            {
                detail.clone()
            }
            _ => "Erro inesperado. Tente novamente.".to_string(),
        }
    }
}

/// Review queue errors
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Invalid score {score}: expected 1 to 4")]
    InvalidScore { score: u8 },

    #[error("Invalid score {input:?}: expected 1 to 4")]
    UnparsableScore { input: String },

    #[error("No card left to review")]
    QueueExhausted,

    #[error("Card {got} is not the current card (expected {expected})")]
    CardMismatch { expected: i64, got: i64 },

    #[error("Review submission failed: {0}")]
    Api(#[from] ApiError),
}

impl ReviewError {
    /// Short pt-BR message for display.
    pub fn user_message(&self) -> String {
        match self {
            ReviewError::InvalidScore { .. } | ReviewError::UnparsableScore { .. } => {
                "A nota deve ser 1, 2, 3 ou 4.".to_string()
            }
            ReviewError::QueueExhausted => "Nenhum card pendente.".to_string(),
            ReviewError::CardMismatch { .. } => "Este card não é o atual.".to_string(),
            ReviewError::Api(e) => e.user_message(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for backend API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for review queue operations
pub type ReviewResult<T> = Result<T, ReviewError>;
