//! staging layout: one folder per packaged file

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Component, Path, PathBuf};

use rand::Rng;

use crate::error::{Error, IoResultExt, Result};
use crate::hash::{random_digits, random_hash, Hash};
use crate::source::SourceFile;

/// payload file name inside a staging folder
pub const ASSET_FILE: &str = "asset";
/// sidecar copy inside a staging folder
pub const ASSET_META_FILE: &str = "asset.meta";
/// path record inside a staging folder
pub const PATHNAME_FILE: &str = "pathname";

/// prefix of per-run staging directory names
pub const STAGING_DIR_PREFIX: &str = "packUnity";

/// number of random integers in a staging directory suffix
const STAGING_SUFFIX_INPUTS: usize = 8;

/// sidecar line carrying the stable identifier
const GUID_KEY: &str = "guid";

/// a staged file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagingEntry {
    /// name of the staging folder
    pub identity: String,
    /// random token written after the path in the path record
    pub path_record_hash: Hash,
    /// `staging_root/identity`
    pub dir: PathBuf,
    /// whether `asset.meta` was written
    pub has_meta: bool,
}

/// create a fresh staging directory under `parent`.
///
/// the name carries a random suffix; creation fails rather than reuse an
/// existing directory, so concurrent runs never share one.
pub fn create_staging_root<R: Rng + ?Sized>(parent: &Path, rng: &mut R) -> Result<PathBuf> {
    let root = parent.join(format!(
        "{}{}",
        STAGING_DIR_PREFIX,
        random_digits(rng, STAGING_SUFFIX_INPUTS)
    ));
    fs::create_dir(&root).with_path(&root)?;
    Ok(root)
}

/// read the stable identifier from a sidecar.
///
/// returns the second whitespace separated token of the first line starting
/// with `guid`, verbatim. returns an empty string when there is no such line or
/// the line has no second token.
pub fn read_guid(meta_path: &Path) -> Result<String> {
    let file = File::open(meta_path).with_path(meta_path)?;
    for line in BufReader::new(file).lines() {
        let line = line.with_path(meta_path)?;
        if !line.starts_with(GUID_KEY) {
            continue;
        }
        return Ok(line.split_whitespace().nth(1).unwrap_or_default().to_string());
    }
    Ok(String::new())
}

/// text of the path record: prefix, logical path, newline, token.
/// no trailing newline.
pub fn path_record(prefix: &str, logical_path: &str, token: &Hash) -> String {
    format!("{}{}\n{}", prefix, logical_path, token)
}

/// true if `name` joined onto the staging root stays directly inside it.
/// the empty name is allowed and means the root itself.
fn is_folder_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (None, _) => true,
        (Some(Component::Normal(_)), None) => true,
        _ => false,
    }
}

/// writes staging folders for source files
pub struct Stager<'a, R: Rng + ?Sized> {
    root: &'a Path,
    stable_hashes: bool,
    path_prefix: &'a str,
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> Stager<'a, R> {
    pub fn new(root: &'a Path, stable_hashes: bool, path_prefix: &'a str, rng: &'a mut R) -> Self {
        Self {
            root,
            stable_hashes,
            path_prefix,
            rng,
        }
    }

    /// decide the folder name for a file.
    ///
    /// the random candidate is always drawn, so the random stream advances the
    /// same way whether or not a sidecar overrides it.
    fn identity(&mut self, file: &SourceFile) -> Result<(String, bool)> {
        let random = random_hash(&mut *self.rng).to_hex();
        if !(self.stable_hashes && file.has_meta) {
            return Ok((random, false));
        }

        let guid = read_guid(&file.meta_path)?;
        if !is_folder_name(&guid) {
            return Err(Error::InvalidGuid {
                meta: file.meta_path.clone(),
                guid,
            });
        }
        if guid.is_empty() {
            // kept as is: the file lands directly in the staging root
            tracing::warn!(
                meta = %file.meta_path.display(),
                "sidecar has no guid line, staging under an empty name"
            );
        }
        Ok((guid, true))
    }

    /// stage one file: payload, optional sidecar, path record
    pub fn stage(&mut self, file: &SourceFile) -> Result<StagingEntry> {
        let path_record_hash = random_hash(&mut *self.rng);
        let (identity, has_meta) = self.identity(file)?;

        let dir = self.root.join(&identity);
        fs::create_dir_all(&dir).with_path(&dir)?;

        let asset = dir.join(ASSET_FILE);
        fs::copy(&file.path, &asset).with_path(&file.path)?;

        if has_meta {
            let meta = dir.join(ASSET_META_FILE);
            fs::copy(&file.meta_path, &meta).with_path(&file.meta_path)?;
        }

        let pathname = dir.join(PATHNAME_FILE);
        let record = path_record(self.path_prefix, &file.logical_path, &path_record_hash);
        fs::write(&pathname, record).with_path(&pathname)?;

        tracing::debug!(path = %file.logical_path, %identity, "staged");

        Ok(StagingEntry {
            identity,
            path_record_hash,
            dir,
            has_meta,
        })
    }
}
