//! Error types for Conduit

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConduitError>;

#[derive(Error, Debug)]
pub enum ConduitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Credential store error: {0}")]
    Credential(#[from] CredentialStoreError),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ConduitError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ConduitError::InvalidInput(_) => 3,
            ConduitError::Credential(_) => 2,
            ConduitError::Http(error) if error.is_auth_rejection() => 2,
            ConduitError::Http(_) => 1,
            ConduitError::Config(_) => 1,
            ConduitError::Runtime(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Every way an HTTP exchange with the Conduit API can fail.
///
/// The variants are closed: the client never lets a raw transport or decoding
/// error escape without mapping it onto one of these first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The transport failed before a response arrived (connect, TLS, timeout)
    #[error("Session failed: {message}")]
    Session { message: String },

    /// The response body could not be decoded into the expected type
    #[error("Malformed response body: {diagnostic}")]
    BadBody { diagnostic: String },

    /// The server answered with a status outside the accepted range
    #[error("Unexpected status {status}")]
    BadStatus { status: u16, body: Vec<u8> },

    /// The transport produced something that is not an HTTP response
    #[error("Invalid response: {response}")]
    InvalidResponse { response: String, body: Vec<u8> },

    /// Anything else, with the original cause attached
    #[error("Request failed: {cause}")]
    Other { cause: String },
}

impl HttpError {
    /// Body of a `BadStatus` response, decoded lossily for display
    pub fn body_text(&self) -> Option<String> {
        match self {
            HttpError::BadStatus { body, .. } | HttpError::InvalidResponse { body, .. } => {
                Some(String::from_utf8_lossy(body).into_owned())
            }
            _ => None,
        }
    }

    /// True when the server refused the credentials or the token
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            HttpError::BadStatus {
                status: 401 | 403 | 422,
                ..
            }
        )
    }
}

/// Failures of the secure credential store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialStoreError {
    #[error("No stored user")]
    NoItem,

    #[error("Stored user data is malformed: {0}")]
    MalformedData(String),

    #[error("Credential backend failed: {0}")]
    Platform(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = ConduitError::InvalidInput("Empty email".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_credential_error() {
        let error = ConduitError::Credential(CredentialStoreError::NoItem);
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_rejected_login() {
        let error = ConduitError::Http(HttpError::BadStatus {
            status: 422,
            body: b"{\"errors\":{\"email or password\":[\"is invalid\"]}}".to_vec(),
        });
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_http_errors() {
        let server = ConduitError::Http(HttpError::BadStatus {
            status: 500,
            body: Vec::new(),
        });
        assert_eq!(server.exit_code(), 1);

        let session = ConduitError::Http(HttpError::Session {
            message: "connection refused".to_string(),
        });
        assert_eq!(session.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_config_error() {
        let config_error = ConfigError::MissingField("api.base_url".to_string());
        let error = ConduitError::Config(config_error);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting() {
        let error = ConduitError::Http(HttpError::BadStatus {
            status: 404,
            body: Vec::new(),
        });
        assert_eq!(format!("{}", error), "HTTP error: Unexpected status 404");

        let error = ConduitError::Credential(CredentialStoreError::MalformedData(
            "missing field `token`".to_string(),
        ));
        assert_eq!(
            format!("{}", error),
            "Credential store error: Stored user data is malformed: missing field `token`"
        );
    }

    #[test]
    fn test_body_text() {
        let error = HttpError::BadStatus {
            status: 500,
            body: b"oops".to_vec(),
        };
        assert_eq!(error.body_text().as_deref(), Some("oops"));

        let error = HttpError::Other {
            cause: "boom".to_string(),
        };
        assert_eq!(error.body_text(), None);
    }

    #[test]
    fn test_error_conversion_from_http_error() {
        let http_error = HttpError::BadBody {
            diagnostic: "expected value at line 1 column 1".to_string(),
        };
        let conduit_error: ConduitError = http_error.into();

        match conduit_error {
            ConduitError::Http(HttpError::BadBody { .. }) => {}
            _ => panic!("Expected ConduitError::Http"),
        }
    }

    #[test]
    fn test_http_error_clone_and_eq() {
        let original = HttpError::Session {
            message: "timed out".to_string(),
        };
        assert_eq!(original.clone(), original);
    }
}
