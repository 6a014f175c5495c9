use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, IoResultExt, Result};

/// extension of authoring-tool sidecar files; always skipped as a source
pub const META_EXTENSION: &str = "meta";

/// extension of the produced archive
pub const PACKAGE_EXTENSION: &str = "unitypackage";

/// default package name when none is given
pub const DEFAULT_PACKAGE_NAME: &str = "Package";

/// configuration for a single package build.
///
/// can be stored as toml; every field except `source_root` has a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// directory to package
    pub source_root: PathBuf,
    /// archive name without extension
    #[serde(default = "default_package_name")]
    pub package_name: String,
    /// name staging folders after the `guid` in each file's sidecar
    #[serde(default)]
    pub stable_hashes: bool,
    /// prepended verbatim to every recorded path
    #[serde(default)]
    pub path_prefix: String,
    /// extensions (without dot) to leave out, in addition to `meta`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_extensions: Vec<String>,
    /// logical path prefixes to leave out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_dirs: Vec<String>,
    /// where the archive is written (default: current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// fixed mtime for every archive entry; staged file mtimes otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<u64>,
}

fn default_package_name() -> String {
    DEFAULT_PACKAGE_NAME.to_string()
}

impl PackageConfig {
    /// create a config with defaults for everything but the source and name
    pub fn new(source_root: impl Into<PathBuf>, package_name: impl Into<String>) -> Self {
        Self {
            source_root: source_root.into(),
            package_name: package_name.into(),
            stable_hashes: false,
            path_prefix: String::new(),
            skip_extensions: vec![],
            skip_dirs: vec![],
            output_dir: None,
            mtime: None,
        }
    }

    pub fn with_stable_hashes(mut self, enabled: bool) -> Self {
        self.stable_hashes = enabled;
        self
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    pub fn with_skip_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_extensions = exts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skip_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// load config from a toml file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: PackageConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// save config to a toml file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }

    /// canonical form of the skip lists.
    ///
    /// extensions are lowercased and lose a leading dot. empty entries are dropped
    /// from both lists; an empty directory prefix would match every file.
    pub fn normalized(mut self) -> Self {
        self.skip_extensions = self
            .skip_extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self.skip_dirs.retain(|d| !d.is_empty());
        self
    }

    /// check the config can be run
    pub fn validate(&self) -> Result<()> {
        if self.package_name.trim().is_empty() {
            return Err(Error::InvalidConfig("package name is empty".to_string()));
        }
        if self.package_name.contains(['/', '\\']) {
            return Err(Error::InvalidConfig(format!(
                "package name contains a path separator: {}",
                self.package_name
            )));
        }
        if !self.source_root.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "source is not a directory: {}",
                self.source_root.display()
            )));
        }
        Ok(())
    }

    /// path of the archive this config produces
    pub fn output_path(&self) -> PathBuf {
        let file_name = format!("{}.{}", self.package_name, PACKAGE_EXTENSION);
        match &self.output_dir {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}
