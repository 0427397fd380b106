use std::fmt;

/// Error type for claude-client operations
/// Implements Clone so a failure can be cached per request key
/// and sent back over the completion channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Transport-level failure (connect, TLS, timeout, body read)
    HttpError(String)
  , /// Provider answered with a non-2xx status
    ApiError
    {   status: u16
      , message: String
    }
  , /// Response body did not match the expected message shape
    ParseError(String)
  , /// A form field could not take the given text
    InvalidField
    {   field: String
      , value: String
    }
  , /// Persisted field storage could not be read or written
    Storage(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// The message surfaced verbatim to the user
    pub fn message(&self) -> String
    {   match self
        {   Error::ApiError { message, .. } => message.clone()
          , other => other.to_string()
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError { status, message } => {
              write!(f, "API error ({}): {}", status, message)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::InvalidField { field, value } => {
              write!(f, "Invalid value for {}: {:?}", field, value)
            }
          , Error::Storage(msg) => {
              write!(f, "Storage error: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn api_error_message_is_provider_text()
    {   let e = Error::ApiError
        {   status: 401
          , message: "invalid x-api-key".to_string()
        };
        assert_eq!(e.message(), "invalid x-api-key");
        assert_eq!(e.to_string(), "API error (401): invalid x-api-key");
    }

    #[test]
    fn other_errors_surface_display()
    {   let e = Error::HttpError("connection refused".to_string());
        assert_eq!(e.message(), "HTTP error: connection refused");
    }
}
