// Error type shared by the library modules. The binary wraps it in
// `anyhow` and downcasts back to pick an exit code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Bad user input: malformed tag, missing bento, missing login field.
    #[error("{0}")]
    Input(String),

    /// Non-2xx registry response that is not a not-found.
    #[error("request failed with status code {status}: {body}")]
    Request { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Config(String),

    /// The push ran to completion but the storage upload did not succeed.
    #[error("Upload failed: {0}")]
    UploadFailed(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input(_) => 2,
            CliError::UploadFailed(_) => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_reports_status_and_body() {
        let err = CliError::Request {
            status: 409,
            body: "duplicate bento".into(),
        };
        assert_eq!(err.to_string(), "request failed with status code 409: duplicate bento");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn exit_codes_distinguish_input_and_upload_failures() {
        assert_eq!(CliError::Input("x".into()).exit_code(), 2);
        assert_eq!(CliError::UploadFailed("disk full".into()).exit_code(), 3);
        assert_eq!(CliError::Config("no context".into()).exit_code(), 1);
    }
}
