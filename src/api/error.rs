use thiserror::Error;

/// Failures from the catalog API
#[derive(Debug, Error)]
pub enum ApiError {
  /// Transport failure (connection refused, DNS, timeout)
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  /// Non-2xx response
  #[error("server returned {status}: {message}")]
  Server { status: u16, message: String },

  /// 2xx response whose body did not match the expected shape
  #[error("invalid response: {message}")]
  Decode { message: String },

  #[error("invalid API URL: {0}")]
  InvalidUrl(String),
}

impl ApiError {
  /// HTTP status for server errors
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Server { status, .. } => Some(*status),
      _ => None,
    }
  }
}
