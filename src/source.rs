//! discovery and filtering of source files

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{PackageConfig, META_EXTENSION};
use crate::error::{Error, IoResultExt, Result};

/// path segment every logical path is anchored at
pub const ASSETS_ANCHOR: &str = "Assets";

/// a regular file found under the source root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// absolute path on disk
    pub path: PathBuf,
    /// lowercase extension without the dot (empty if none)
    pub extension: String,
    /// path below the `Assets` segment, `/` separated
    pub logical_path: String,
    /// `<path>.meta`
    pub meta_path: PathBuf,
    /// whether `meta_path` exists
    pub has_meta: bool,
}

impl SourceFile {
    /// describe a file on disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let path = std::path::absolute(path).with_path(path)?;
        let logical_path = logical_path(&path)?;
        let extension = path
            .file_name()
            .map(|name| extension_of(&name.to_string_lossy()))
            .unwrap_or_default();

        let mut meta_name = path.as_os_str().to_owned();
        meta_name.push(".");
        meta_name.push(META_EXTENSION);
        let meta_path = PathBuf::from(meta_name);
        let has_meta = meta_path.is_file();

        Ok(Self {
            path,
            extension,
            logical_path,
            meta_path,
            has_meta,
        })
    }
}

/// lowercase text after the last `.` of a file name.
///
/// unlike [`Path::extension`] a leading dot counts, so `.gitignore` has the
/// extension `gitignore` and can be skipped like any other.
pub fn extension_of(file_name: &str) -> String {
    file_name
        .rfind('.')
        .map(|i| file_name[i + 1..].to_lowercase())
        .unwrap_or_default()
}

/// derive the logical path of a file: every segment after the first `Assets`
/// directory, joined with `/`.
///
/// `..` segments are resolved lexically before the anchor is searched. the
/// file's own name never counts as the anchor. fails if no parent directory
/// is named `Assets`.
pub fn logical_path(path: &Path) -> Result<String> {
    let mut segments: Vec<&OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => segments.push(s),
            Component::ParentDir => {
                segments.pop();
            }
            _ => {}
        }
    }

    let dirs = segments.len().saturating_sub(1);
    let anchor = segments[..dirs]
        .iter()
        .position(|s| *s == OsStr::new(ASSETS_ANCHOR))
        .ok_or_else(|| Error::MissingAssetsAnchor(path.to_path_buf()))?;

    let rel: Vec<String> = segments[anchor + 1..]
        .iter()
        .map(|s| s.to_string_lossy().into_owned())
        .collect();
    Ok(rel.join("/"))
}

/// why a file was left out of the package
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// the file is itself a sidecar
    Sidecar,
    /// the extension is in the skip list
    Extension(String),
    /// the logical path starts with a skipped prefix
    Directory(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Sidecar => write!(f, "sidecar"),
            SkipReason::Extension(ext) => write!(f, "extension {}", ext),
            SkipReason::Directory(dir) => write!(f, "directory {}", dir),
        }
    }
}

/// inclusion policy built from a config
#[derive(Clone, Debug)]
pub struct Filter {
    extensions: HashSet<String>,
    dirs: Vec<String>,
}

impl Filter {
    pub fn new(config: &PackageConfig) -> Self {
        let config = config.clone().normalized();
        Self {
            extensions: config.skip_extensions.into_iter().collect(),
            dirs: config.skip_dirs,
        }
    }

    /// `None` if the file belongs in the package.
    ///
    /// directory prefixes are matched on the raw string: `Editor` also
    /// excludes `EditorTools/x.cs`. packages built by earlier versions of
    /// this tool relied on that, so it is kept.
    pub fn skip_reason(&self, file: &SourceFile) -> Option<SkipReason> {
        if file.extension == META_EXTENSION {
            return Some(SkipReason::Sidecar);
        }
        if self.extensions.contains(&file.extension) {
            return Some(SkipReason::Extension(file.extension.clone()));
        }
        self.dirs
            .iter()
            .find(|dir| file.logical_path.starts_with(dir.as_str()))
            .map(|dir| SkipReason::Directory(dir.clone()))
    }

    pub fn includes(&self, file: &SourceFile) -> bool {
        self.skip_reason(file).is_none()
    }
}

/// lazily walk every regular file under `root`, following symlinks
pub fn walk_sources(root: &Path) -> impl Iterator<Item = Result<SourceFile>> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) if e.file_type().is_file() => Some(SourceFile::from_path(e.path())),
            Ok(_) => None,
            Err(e) => Some(Err(Error::Walk(e))),
        })
}

/// result of enumerating a source tree
#[derive(Debug, Default)]
pub struct Selection {
    pub included: Vec<SourceFile>,
    pub skipped: Vec<(SourceFile, SkipReason)>,
}

/// enumerate and filter the whole source tree.
///
/// runs to completion before returning so that a missing `Assets` anchor is
/// reported before anything is staged.
pub fn select_sources(config: &PackageConfig) -> Result<Selection> {
    let filter = Filter::new(config);
    let mut selection = Selection::default();

    for file in walk_sources(&config.source_root) {
        let file = file?;
        match filter.skip_reason(&file) {
            Some(reason) => {
                tracing::debug!(path = %file.logical_path, %reason, "skipping");
                selection.skipped.push((file, reason));
            }
            None => selection.included.push(file),
        }
    }

    Ok(selection)
}
