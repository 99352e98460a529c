use std::path::PathBuf;

/// Every failure aborts the whole query; there are no partial results.
#[derive(Debug, thiserror::Error)]
pub enum EptError {
    #[error("no ept.json found under prefix '{prefix}'")]
    MetadataNotFound { prefix: String },

    #[error("malformed dataset metadata '{key}': {reason}")]
    MetadataParse { key: String, reason: String },

    #[error("cannot project into EPSG:{epsg}: {reason}")]
    Projection { epsg: u32, reason: String },

    #[error("remote {operation} failed for '{target}': {reason}")]
    RemoteAccess {
        operation: &'static str,
        target: String,
        reason: String,
    },

    #[error("cannot decode tile {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("invalid footprint file {}: {reason}", .path.display())]
    Footprint { path: PathBuf, reason: String },

    #[error("cannot export to {}: {reason}", .path.display())]
    Export { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EptError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EptError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn remote(
        operation: &'static str,
        target: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        EptError::RemoteAccess {
            operation,
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Adds octree position to a remote failure raised inside the refinement loop.
    pub(crate) fn at_depth(self, depth: u32, bin_x: u64, bin_y: u64) -> Self {
        match self {
            EptError::RemoteAccess {
                operation,
                target,
                reason,
            } => EptError::RemoteAccess {
                operation,
                target: format!("{target} (depth {depth}, bin {bin_x}-{bin_y})"),
                reason,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, EptError>;
