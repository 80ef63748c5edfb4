/// Core error types for the glint tooling.
use std::path::PathBuf;

/// A specialized Result type for glint operations.
pub type GlintResult<T> = Result<T, GlintError>;

/// Errors raised by the outer surfaces (files, configuration, protocol I/O).
///
/// Source analysis itself never fails; problems in shader text are reported as
/// diagnostics by `glint-lang`.
#[derive(Debug, thiserror::Error)]
pub enum GlintError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid color: {0}")]
    Color(#[from] crate::color::ColorError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Other(String),
}

impl GlintError {
    /// Create a read error for a source or config file.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GlintError::Read {
            path: path.into(),
            source,
        }
    }
}

/// Read a shader source file, attaching the path to the error.
pub fn read_source(path: &std::path::Path) -> GlintResult<String> {
    std::fs::read_to_string(path).map_err(|e| GlintError::read(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_display() {
        let err = GlintError::read(
            "shader.frag",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "failed to read \"shader.frag\": missing");
    }

    #[test]
    fn test_read_source_missing_file() {
        let err = read_source(std::path::Path::new("/definitely/not/here.glsl")).unwrap_err();
        assert!(matches!(err, GlintError::Read { .. }));
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = GlintError::InvalidArgument("offset out of range".into());
        assert!(err.to_string().contains("offset out of range"));
    }
}
