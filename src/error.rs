use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Push channel not connected")]
    NotConnected,

    #[error("Push channel error: {0}")]
    Transport(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    pub fn not_found(resource: &str) -> Self {
        Self::NotFound(format!("{} not found", resource))
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::Authentication(msg.to_string())
    }

    pub fn forbidden(msg: &str) -> Self {
        Self::Authorization(msg.to_string())
    }

    pub fn internal(msg: &str) -> Self {
        Self::Internal(msg.to_string())
    }

    pub fn config(msg: &str) -> Self {
        Self::Config(msg.to_string())
    }

    /// 展示给用户的错误文案
    /// 服务端返回的错误信息原样透出，其余错误只给出概括性描述
    pub fn user_message(&self) -> String {
        match self {
            AppError::Server { message, .. } => message.clone(),
            AppError::Authentication(_) => "Your session has expired, please sign in again".to_string(),
            AppError::Authorization(_) => "You are not allowed to perform this action".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Request(e) if e.is_timeout() => {
                "The server took too long to respond".to_string()
            }
            AppError::Request(_) | AppError::NotConnected | AppError::Transport(_) => {
                tracing::debug!("Network failure surfaced to user: {}", self);
                "Network error, please try again".to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {}", e);
                "Unexpected response from server".to_string()
            }
            AppError::Config(_) | AppError::Url(_) | AppError::InvalidState(_) | AppError::Internal(_) => {
                tracing::error!("Internal error: {}", self);
                "Something went wrong".to_string()
            }
        }
    }
}

// 从其他错误类型转换
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
