use std::error::Error as StdError;

use infraql_parser::ParserError;
use thiserror::Error;

/// The result type of every engine operation.
pub type EngineResult<T> = Result<T, EngineError>;

/// The error taxonomy of the engine: parse, execution and plugin kinds.
///
/// Plugin failures never cross the plugin boundary opaquely; every call is
/// wrapped with the owning plugin's name and the cause chain preserved.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The query text could not be tokenized or parsed.
    #[error(transparent)]
    Parse(#[from] ParserError),

    /// The statement referenced something the engine cannot resolve
    /// (unknown table, invalid cache command, ...).
    #[error("{message}")]
    Execution {
        /// What went wrong, including the offending identifier.
        message: String,
    },

    /// A plugin call failed.
    #[error("{operation} for plugin '{plugin}': {message}")]
    Plugin {
        /// The plugin that failed.
        plugin: String,
        /// The operation that failed, e.g. "Query failed".
        operation: String,
        /// The originating message.
        message: String,
        /// The preserved cause, if any.
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// A plugin call was cancelled or timed out before completion.
    #[error("{operation} for plugin '{plugin}' was cancelled: {message}")]
    Cancelled {
        /// The plugin whose call was cancelled.
        plugin: String,
        /// The operation that was cancelled.
        operation: String,
        /// Why: caller cancellation or timeout.
        message: String,
    },
}

impl EngineError {
    /// An execution-kind error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// A plugin-kind error without a separate cause.
    pub fn plugin(
        plugin: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a failed plugin call, preserving the cause.
    pub fn plugin_call(
        plugin: impl Into<String>,
        operation: impl Into<String>,
        cause: EngineError,
    ) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            operation: operation.into(),
            message: cause.to_string(),
            source: Some(Box::new(cause)),
        }
    }

    /// The stable code of this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "PARSE_ERROR",
            Self::Execution { .. } => "EXECUTION_ERROR",
            Self::Plugin { .. } => "PLUGIN_ERROR",
            Self::Cancelled { .. } => "CANCELLED",
        }
    }

    /// True if this error reports cancellation or a timeout, so callers can
    /// distinguish it from genuine failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
