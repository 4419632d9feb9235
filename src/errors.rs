//! Typed errors for the build pipeline and its external tools.
//!
//! Everything that can go wrong between "build triggered" and "manifest
//! written" is a `BuildError`. The web layer maps these onto HTTP responses
//! (see `web::WebError`); the streaming build route appends them to the log
//! instead.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with status {code}")]
    CommandFailed { tool: String, code: i32 },

    #[error("no application bundle matching {pattern}")]
    ArtifactNotFound { pattern: String },

    #[error("bundle property list is missing {field}")]
    MetadataMissing { field: &'static str },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("property list error: {0}")]
    Plist(#[from] plist::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_carries_tool_and_code() {
        let err = BuildError::CommandFailed {
            tool: "xcodebuild".to_string(),
            code: 65,
        };
        match &err {
            BuildError::CommandFailed { tool, code } => {
                assert_eq!(tool, "xcodebuild");
                assert_eq!(*code, 65);
            }
            _ => panic!("expected CommandFailed"),
        }
        assert!(err.to_string().contains("65"));
    }

    #[test]
    fn spawn_preserves_io_kind() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "git not found");
        let err = BuildError::Spawn {
            tool: "git".to_string(),
            source: io_err,
        };
        match &err {
            BuildError::Spawn { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("expected Spawn"),
        }
    }

    #[test]
    fn metadata_missing_names_the_field() {
        let err = BuildError::MetadataMissing {
            field: "CFBundleName",
        };
        assert!(err.to_string().contains("CFBundleName"));
    }

    #[test]
    fn converts_from_io_error() {
        let err: BuildError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, BuildError::Io(_)));
    }

    #[test]
    fn all_variants_implement_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        let err = BuildError::ArtifactNotFound {
            pattern: "*.app".to_string(),
        };
        assert_std_error(&err);
    }
}
