//! Error types for the conversion pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// One frame of a script fault's call stack, as reported by the page.
///
/// Renders as `file: line` with an optional ` (in function f)` tail, the
/// format operators see on stderr when an in-page script throws.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct StackFrame {
    /// Source file or URL the frame executed in
    pub file: String,
    /// Line number within `file`
    pub line: u64,
    /// Enclosing function name, if the engine reported one
    pub function: Option<String>,
}

impl std::fmt::Display for StackFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.file, self.line)?;
        if let Some(function) = &self.function {
            write!(f, " (in function {})", function)?;
        }
        Ok(())
    }
}

/// Errors that can occur while loading, measuring, or rendering a page
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to initialize the rendering backend
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// The source document did not reach a successful loaded state
    #[error("Failed to load document: {0}")]
    LoadFailed(String),

    /// Failed to render a clipped region
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// An in-page script threw or returned malformed data
    #[error("Script error: {message}")]
    ScriptFault {
        message: String,
        stack: Vec<StackFrame>,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),
}

impl Error {
    /// Build a `ScriptFault` with no stack information.
    pub fn script_fault(message: impl Into<String>) -> Self {
        Error::ScriptFault {
            message: message.into(),
            stack: Vec::new(),
        }
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}
