use std::path::PathBuf;

/// Startup-fatal failures while turning GLSL sources into a program.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to compile {shader} shader:\n{log}")]
    Compile { shader: String, log: String },
    #[error("failed to link program:\n{log}")]
    Link { log: String },
}

impl ShaderError {
    pub(crate) fn link(log: impl Into<String>) -> Self {
        ShaderError::Link { log: log.into() }
    }

    /// Compiler or linker output, if any.
    pub fn log(&self) -> Option<&str> {
        match self {
            ShaderError::Compile { log, .. } | ShaderError::Link { log } => Some(log),
            ShaderError::Read { .. } => None,
        }
    }
}
