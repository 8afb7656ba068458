use std::fmt;
use std::panic::Location;

use crate::error::{DriverError, code_label};

/// One driver error observed after a wrapped call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Text of the wrapped call (e.g. `glDrawElements`).
    pub call: String,
    /// Raw driver error code.
    pub code: u32,
    /// Where the wrapped call was issued.
    pub location: &'static Location<'static>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[driver] {} in {} ({}:{})",
            code_label(&self.code),
            self.call,
            self.location.file(),
            self.location.line()
        )
    }
}

impl From<Diagnostic> for DriverError {
    fn from(d: Diagnostic) -> Self {
        DriverError {
            call: d.call,
            code: d.code,
            location: d.location,
        }
    }
}
