use std::panic::Location;

use thiserror::Error;

use crate::driver::{StageKind, error_code};

/// A driver error code observed after a wrapped call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{call} raised {} at {location}", code_label(.code))]
pub struct DriverError {
    /// Text of the wrapped call.
    pub call: String,
    /// Raw error code popped from the driver queue.
    pub code: u32,
    /// Source location of the wrapped call.
    pub location: &'static Location<'static>,
}

/// `GL_INVALID_ENUM (0x0500)`-style label for a driver error code.
pub fn code_label(code: &u32) -> String {
    match error_code::name(*code) {
        Some(name) => format!("{name} (0x{code:04X})"),
        None => format!("unknown error (0x{code:04X})"),
    }
}

/// Failure reported by a `core::GraphicsContext` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("graphics context: {0}")]
pub struct ContextError(pub String);

impl ContextError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors produced by the rendering core.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A stage failed to compile; `log` is the driver's compile log.
    #[error("failed to compile {stage} shader:\n{log}")]
    Compile { stage: StageKind, log: String },

    /// Both stages compiled but the program failed to link.
    #[error("failed to link shader program:\n{log}")]
    Link { log: String },

    /// A driver error escalated by the strict diagnostics policy.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The uniform is absent or was optimized away by the driver.
    #[error("uniform `{name}` not found in program")]
    UniformNotFound { name: String },

    /// A GPU object could not be created from the given input.
    #[error("failed to create {resource}: {reason}")]
    ResourceCreation {
        resource: &'static str,
        reason: String,
    },

    /// Attribute descriptors do not fit the vertex stride.
    #[error("invalid vertex layout: {0}")]
    InvalidLayout(String),

    /// Presenting or polling the window failed.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl EngineError {
    /// Whether the error should stop the current operation.
    ///
    /// Missing uniforms are a legitimate outcome of driver-side optimization.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::UniformNotFound { .. })
    }

    pub(crate) fn resource(resource: &'static str, reason: impl Into<String>) -> Self {
        EngineError::ResourceCreation {
            resource,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_names_known_codes() {
        let err = DriverError {
            call: "glDrawElements".to_string(),
            code: error_code::INVALID_OPERATION,
            location: Location::caller(),
        };
        let text = err.to_string();
        assert!(text.starts_with("glDrawElements raised GL_INVALID_OPERATION (0x0502) at "));
    }

    #[test]
    fn unknown_codes_keep_hex_value() {
        assert_eq!(code_label(&0x9999), "unknown error (0x9999)");
    }

    #[test]
    fn missing_uniform_is_not_fatal() {
        let err = EngineError::UniformNotFound {
            name: "u_Time".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(EngineError::Link { log: String::new() }.is_fatal());
    }
}
