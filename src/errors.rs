use std::fmt;
use thiserror::Error;

/// Top-level error type that carries a CLI exit code
#[derive(Debug)]
pub enum EasyfillError {
    /// Backend request failed or its body could not be read (exit code 2)
    StreamTransport(String),
    /// Authentication polling ran out of time (exit code 3)
    AuthenticationTimeout(String),
    /// Another autofill stream is still being consumed (exit code 4)
    Busy,
    /// No user id was supplied or stored (exit code 5)
    NotAuthenticated,
    /// WebDriver connection failed (exit code 6)
    WebDriverFailed(String),
    /// Generic error (exit code 1)
    Other(anyhow::Error),
}

impl EasyfillError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            EasyfillError::StreamTransport(_) => 2,
            EasyfillError::AuthenticationTimeout(_) => 3,
            EasyfillError::Busy => 4,
            EasyfillError::NotAuthenticated => 5,
            EasyfillError::WebDriverFailed(_) => 6,
            EasyfillError::Other(_) => 1,
        }
    }
}

impl fmt::Display for EasyfillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EasyfillError::StreamTransport(msg) => {
                write!(f, "Autofill stream failed: {}", msg)
            }
            EasyfillError::AuthenticationTimeout(msg) => {
                write!(f, "Authentication timed out: {}", msg)
            }
            EasyfillError::Busy => {
                write!(f, "An autofill request is already in progress")
            }
            EasyfillError::NotAuthenticated => {
                write!(
                    f,
                    "User is not authenticated. Run `easyfill auth` or pass --user-id"
                )
            }
            EasyfillError::WebDriverFailed(msg) => {
                write!(f, "WebDriver connection failed: {}", msg)
            }
            EasyfillError::Other(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for EasyfillError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EasyfillError::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for EasyfillError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<EasyfillError>() {
            Ok(typed) => return typed,
            Err(err) => err,
        };

        // Fall back to the message for errors raised by fantoccini and friends
        let msg = format!("{:#}", err);
        if msg.contains("WebDriver") || msg.contains("geckodriver") || msg.contains("chromedriver")
        {
            EasyfillError::WebDriverFailed(msg)
        } else {
            EasyfillError::Other(err)
        }
    }
}

impl From<reqwest::Error> for EasyfillError {
    fn from(err: reqwest::Error) -> Self {
        EasyfillError::StreamTransport(err.to_string())
    }
}

/// Reasons a single fill action was dropped.
///
/// None of these abort a stream: the action is logged, recorded in the
/// report, and the next one is processed.
#[derive(Debug, Error)]
pub enum FillError {
    #[error("Malformed selector {raw}: {reason}")]
    MalformedSelector { raw: String, reason: String },

    #[error("No element found for selector {0}")]
    ElementNotFound(String),

    #[error("No matching option found for value \"{0}\" in select element")]
    NoMatchingOption(String),

    #[error("Unsupported element type for autofill: {0}")]
    UnsupportedElementKind(String),

    #[error("Page access failed: {0}")]
    Surface(#[from] anyhow::Error),
}

impl FillError {
    /// Short machine-readable name used in reports and history
    pub fn kind(&self) -> &'static str {
        match self {
            FillError::MalformedSelector { .. } => "malformed_selector",
            FillError::ElementNotFound(_) => "element_not_found",
            FillError::NoMatchingOption(_) => "no_matching_option",
            FillError::UnsupportedElementKind(_) => "unsupported_element_kind",
            FillError::Surface(_) => "surface",
        }
    }
}
