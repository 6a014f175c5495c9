use std::path::PathBuf;

/// error type for package operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no \"Assets\" directory in path: {0}")]
    MissingAssetsAnchor(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("guid {guid:?} in {meta} is not a single folder name")]
    InvalidGuid { meta: PathBuf, guid: String },

    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// true for failures caused by configuration rather than the filesystem.
    /// these are detected before anything is staged.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::MissingAssetsAnchor(_)
                | Error::InvalidConfig(_)
                | Error::ConfigParse(_)
                | Error::ConfigSerialize(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_classified() {
        assert!(Error::MissingAssetsAnchor(PathBuf::from("/x/y.png")).is_config());
        assert!(Error::InvalidConfig("empty package name".into()).is_config());

        let io = std::fs::read("/definitely/not/here")
            .with_path("/definitely/not/here")
            .unwrap_err();
        assert!(!io.is_config());
        assert!(io.to_string().contains("/definitely/not/here"));
    }
}
