use std::path::PathBuf;

/// Errors while reading a recipe or mesh back in.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },

    #[error("failed to parse recipe: {0}")]
    ParseError(String),

    #[error("malformed STL: {reason}")]
    Stl { reason: String },
}

/// Errors while writing a recipe or mesh out.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    #[error("no solid available for export")]
    NoSolid,

    #[error("index {index} out of range (vertex count = {vertex_count})")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("failed to serialize recipe: {0}")]
    Serialize(String),

    #[error("failed to write {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },
}

/// Why an external engine run failed. None of these are retried here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineFailure {
    #[error("could not launch `{program}`: {reason}")]
    Launch { program: String, reason: String },

    #[error("engine did not finish within {after_ms} ms and was killed")]
    Timeout { after_ms: u64 },

    #[error("engine crashed with a native memory fault (code {code:?}, signal {signal:?})")]
    NativeMemoryFault {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("engine exited unsuccessfully (code {code:?}, signal {signal:?})")]
    NonZeroExit {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("engine reported success but did not produce {}", .path.display())]
    MissingArtifact { path: PathBuf },

    #[error("engine i/o failed for {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },
}

impl EngineFailure {
    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        EngineFailure::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
