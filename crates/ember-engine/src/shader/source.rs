use std::path::Path;

use crate::driver::StageKind;

/// Source text for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    kind: StageKind,
    text: String,
}

impl ShaderSource {
    pub fn new(kind: StageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn vertex(text: impl Into<String>) -> Self {
        Self::new(StageKind::Vertex, text)
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        Self::new(StageKind::Fragment, text)
    }

    /// Reads a stage source from `path`.
    ///
    /// A missing or unreadable file yields an empty source (with a warning);
    /// the builder rejects it before any driver work happens.
    pub fn load(kind: StageKind, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::debug!("loaded {kind} shader from {} ({} bytes)", path.display(), text.len());
                Self::new(kind, text)
            }
            Err(err) => {
                log::warn!("failed to read {kind} shader {}: {err}", path.display());
                Self::new(kind, String::new())
            }
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when there is nothing but whitespace to compile.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
