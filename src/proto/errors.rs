// Call handler errors

use thiserror::Error;

use crate::amf::{AMF0Object, AMF0Value};

/// Error a command handler raises to send an `_error` reply
///
/// A fatal error additionally closes the connection after the reply
/// goes out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {description}")]
pub struct CallResultError {
    pub code: String,
    pub level: String,
    pub description: String,
    pub fatal: bool,
}

impl CallResultError {
    pub fn new<C: Into<String>, D: Into<String>>(code: C, description: D) -> CallResultError {
        CallResultError {
            code: code.into(),
            level: "error".to_string(),
            description: description.into(),
            fatal: false,
        }
    }

    pub fn fatal(mut self) -> CallResultError {
        self.fatal = true;
        self
    }

    /// The most generic error type code
    pub fn failed<D: Into<String>>(description: D) -> CallResultError {
        CallResultError::new("NetStream.Failed", description)
    }

    /// Connection attempt failed
    pub fn connect_failed<D: Into<String>>(description: D) -> CallResultError {
        CallResultError::new("NetConnection.Connect.Failed", description).fatal()
    }

    /// The specified app is invalid
    pub fn invalid_app<D: Into<String>>(description: D) -> CallResultError {
        CallResultError::new("NetConnection.Connect.InvalidApp", description).fatal()
    }

    /// Failure while attempting to play
    pub fn play_failed<D: Into<String>>(description: D) -> CallResultError {
        CallResultError::new("NetStream.Play.Failed", description)
    }

    /// Requested stream not found
    pub fn play_not_found<D: Into<String>>(description: D) -> CallResultError {
        CallResultError::new("NetStream.Play.StreamNotFound", description)
    }

    /// Publish name rejected
    pub fn publish_bad_name<D: Into<String>>(description: D) -> CallResultError {
        CallResultError::new("NetStream.Publish.BadName", description)
    }

    /// The info object sent in the `_error` reply
    pub fn info_object(&self) -> AMF0Object {
        AMF0Object::new()
            .with("level", AMF0Value::string(self.level.clone()))
            .with("code", AMF0Value::string(self.code.clone()))
            .with("description", AMF0Value::string(self.description.clone()))
    }
}

/// Error raised by a remote-call handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Skip silently, send nothing
    #[error("call aborted: {0}")]
    Aborted(String),

    /// Send an `_error` reply built from the attached info
    #[error(transparent)]
    Result(#[from] CallResultError),
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_object_shape() {
        let error = CallResultError::play_not_found("no such stream");
        let info = error.info_object();

        assert_eq!(info.get("level"), Some(&AMF0Value::string("error")));
        assert_eq!(
            info.get("code"),
            Some(&AMF0Value::string("NetStream.Play.StreamNotFound"))
        );
        assert!(!error.fatal);
    }

    #[test]
    fn test_fatal_constructors() {
        assert!(CallResultError::invalid_app("x").fatal);
        assert!(CallResultError::connect_failed("x").fatal);
        assert!(!CallResultError::failed("x").fatal);
    }
}
