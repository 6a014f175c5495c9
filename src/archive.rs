//! tar/gzip serialization of a staging tree

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use flate2::{Compression, GzBuilder};
use tar::{Builder, EntryType, Header};
use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};

/// mode written for every entry: regular file, rwxr-xr-x
pub const ENTRY_MODE: u32 = 0o100755;

/// options for writing an archive
#[derive(Clone, Debug, Default)]
pub struct ArchiveOptions {
    /// fixed mtime for every entry; each file's own mtime otherwise
    pub mtime: Option<u64>,
}

/// what was written
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchiveStats {
    pub entries: usize,
    pub bytes: u64,
}

/// staging directory that could not be removed after a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub message: String,
}

impl std::fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to remove staging directory {}: {}",
            self.path.display(),
            self.message
        )
    }
}

/// archive entry name for a staged file: `./` plus the `/` separated path
/// relative to the staging root
pub fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for c in rel.components() {
        match c {
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!("./{}", parts.join("/")))
}

/// files under `root` in archive order: depth first, a directory's files
/// before its subdirectories
pub fn staged_files(root: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root).min_depth(1).sort_by(|a, b| {
        a.file_type()
            .is_dir()
            .cmp(&b.file_type().is_dir())
            .then_with(|| a.file_name().cmp(b.file_name()))
    });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// build the normalized header for one entry.
///
/// the name goes straight into the header: the tar crate's path setters drop
/// a leading `./`, which consumers of the format expect.
fn entry_header(name: &str, size: u64, mtime: u64) -> io::Result<Header> {
    let mut header = Header::new_ustar();
    header.set_entry_type(EntryType::Regular);
    header.set_size(size);
    header.set_mode(ENTRY_MODE);
    header.set_uid(0);
    header.set_gid(0);
    header.set_username("")?;
    header.set_groupname("")?;
    header.set_mtime(mtime);

    let slot = &mut header.as_old_mut().name;
    let bytes = name.as_bytes();
    if bytes.len() > slot.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("entry name longer than {} bytes: {}", slot.len(), name),
        ));
    }
    slot.fill(0);
    slot[..bytes.len()].copy_from_slice(bytes);

    header.set_cksum();
    Ok(header)
}

fn file_mtime(meta: &fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// write every file under `root` into a gzip-compressed tar at `output`.
///
/// the staging tree is left untouched; see [`remove_staging`].
pub fn write_archive(root: &Path, output: &Path, opts: &ArchiveOptions) -> Result<ArchiveStats> {
    let files = staged_files(root)?;

    let out = File::create(output).with_path(output)?;
    // zero gzip timestamp so identical trees give identical archives
    let encoder = GzBuilder::new()
        .mtime(0)
        .write(BufWriter::new(out), Compression::default());
    let mut builder = Builder::new(encoder);

    let mut stats = ArchiveStats::default();
    for path in &files {
        let name = entry_name(root, path).ok_or_else(|| Error::Io {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path outside staging root"),
        })?;

        let file = File::open(path).with_path(path)?;
        let meta = file.metadata().with_path(path)?;
        let mtime = opts.mtime.unwrap_or_else(|| file_mtime(&meta));

        let header = entry_header(&name, meta.len(), mtime).with_path(path)?;
        builder.append(&header, file).with_path(output)?;

        tracing::trace!(entry = %name, size = meta.len(), "archived");
        stats.entries += 1;
        stats.bytes += meta.len();
    }

    let encoder = builder.into_inner().with_path(output)?;
    let writer = encoder.finish().with_path(output)?;
    let out = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_path(output)?;
    out.sync_all().with_path(output)?;

    Ok(stats)
}

/// delete the staging tree, clearing read-only flags if the first attempt
/// fails. never fails the build; a failure comes back as a warning.
pub fn remove_staging(root: &Path) -> Option<CleanupWarning> {
    if fs::remove_dir_all(root).is_ok() {
        return None;
    }

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if let Ok(meta) = entry.metadata() {
            let mut perms = meta.permissions();
            if perms.readonly() {
                #[allow(clippy::permissions_set_readonly_false)]
                perms.set_readonly(false);
                let _ = fs::set_permissions(entry.path(), perms);
            }
        }
    }

    match fs::remove_dir_all(root) {
        Ok(()) => None,
        Err(e) => {
            let warning = CleanupWarning {
                path: root.to_path_buf(),
                message: e.to_string(),
            };
            tracing::warn!("{}", warning);
            Some(warning)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::tempdir;

    struct ReadEntry {
        name: String,
        mode: u32,
        uid: u64,
        gid: u64,
        username: String,
        groupname: String,
        mtime: u64,
        kind: EntryType,
        data: Vec<u8>,
    }

    fn read_archive(path: &Path) -> Vec<ReadEntry> {
        let file = File::open(path).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        let mut out = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let header = entry.header().clone();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            out.push(ReadEntry {
                name: String::from_utf8(entry.path_bytes().into_owned()).unwrap(),
                mode: header.mode().unwrap(),
                uid: header.uid().unwrap(),
                gid: header.gid().unwrap(),
                username: header.username().unwrap().unwrap_or("").to_string(),
                groupname: header.groupname().unwrap().unwrap_or("").to_string(),
                mtime: header.mtime().unwrap(),
                kind: header.entry_type(),
                data,
            });
        }
        out
    }

    fn staging_tree(root: &Path) {
        fs::create_dir_all(root.join("bbb")).unwrap();
        fs::create_dir_all(root.join("aaa/nested")).unwrap();
        fs::write(root.join("top"), b"top").unwrap();
        fs::write(root.join("aaa/asset"), b"asset-a").unwrap();
        fs::write(root.join("aaa/pathname"), b"a.png\n0").unwrap();
        fs::write(root.join("aaa/nested/deep"), b"deep").unwrap();
        fs::write(root.join("bbb/asset"), b"asset-b").unwrap();
    }

    #[test]
    fn test_entry_name() {
        let root = Path::new("/tmp/packUnity123");
        assert_eq!(
            entry_name(root, Path::new("/tmp/packUnity123/abc/asset")).as_deref(),
            Some("./abc/asset")
        );
        assert_eq!(entry_name(root, root), None);
        assert_eq!(entry_name(root, Path::new("/elsewhere/abc")), None);
    }

    #[test]
    fn test_staged_files_order() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("stage");
        staging_tree(&root);

        let names: Vec<String> = staged_files(&root)
            .unwrap()
            .iter()
            .map(|p| entry_name(&root, p).unwrap())
            .collect();

        assert_eq!(
            names,
            vec![
                "./top",
                "./aaa/asset",
                "./aaa/pathname",
                "./aaa/nested/deep",
                "./bbb/asset",
            ]
        );
    }

    #[test]
    fn test_write_archive_normalized_headers() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("stage");
        staging_tree(&root);
        let out = dir.path().join("Test.unitypackage");

        let stats = write_archive(&root, &out, &ArchiveOptions { mtime: Some(1234) }).unwrap();
        assert_eq!(stats.entries, 5);
        assert_eq!(stats.bytes, 3 + 7 + 7 + 4 + 7);

        let entries = read_archive(&out);
        assert_eq!(entries.len(), 5);
        for e in &entries {
            assert!(e.name.starts_with("./"), "{}", e.name);
            assert_eq!(e.mode, 0o100755);
            assert_eq!(e.mode, 33261);
            assert_eq!(e.uid, 0);
            assert_eq!(e.gid, 0);
            assert_eq!(e.username, "");
            assert_eq!(e.groupname, "");
            assert_eq!(e.mtime, 1234);
            assert_eq!(e.kind, EntryType::Regular);
        }

        let asset = entries.iter().find(|e| e.name == "./aaa/asset").unwrap();
        assert_eq!(asset.data, b"asset-a");

        // staging root itself is not an entry, and no directories are
        assert!(entries.iter().all(|e| e.name != "./" && e.name != "."));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_archive_ignores_host_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let root = dir.path().join("stage");
        fs::create_dir_all(root.join("x")).unwrap();
        fs::write(root.join("x/asset"), b"a").unwrap();
        fs::set_permissions(root.join("x/asset"), fs::Permissions::from_mode(0o400)).unwrap();

        let out = dir.path().join("p.unitypackage");
        write_archive(&root, &out, &ArchiveOptions::default()).unwrap();

        let entries = read_archive(&out);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mode, ENTRY_MODE);
    }

    #[test]
    fn test_write_archive_reproducible() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("stage");
        staging_tree(&root);
        let opts = ArchiveOptions { mtime: Some(0) };

        let a = dir.path().join("a.unitypackage");
        let b = dir.path().join("b.unitypackage");
        write_archive(&root, &a, &opts).unwrap();
        write_archive(&root, &b, &opts).unwrap();

        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }

    #[test]
    fn test_write_archive_empty_tree() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("stage");
        fs::create_dir_all(&root).unwrap();
        let out = dir.path().join("empty.unitypackage");

        let stats = write_archive(&root, &out, &ArchiveOptions::default()).unwrap();
        assert_eq!(stats.entries, 0);
        assert!(read_archive(&out).is_empty());
    }

    #[test]
    fn test_write_archive_bad_output_is_io_error() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("stage");
        staging_tree(&root);

        let out = dir.path().join("missing-dir/p.unitypackage");
        let err = write_archive(&root, &out, &ArchiveOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_entry_header_rejects_long_name() {
        let name = format!("./{}", "x".repeat(120));
        assert!(entry_header(&name, 0, 0).is_err());
    }

    #[test]
    fn test_remove_staging() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("stage");
        staging_tree(&root);

        let mut perms = fs::metadata(root.join("top")).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(root.join("top"), perms).unwrap();

        assert_eq!(remove_staging(&root), None);
        assert!(!root.exists());
    }

    #[test]
    fn test_remove_staging_missing_dir_warns() {
        let dir = tempdir().unwrap();
        let warning = remove_staging(&dir.path().join("never-created")).unwrap();
        assert!(warning.to_string().contains("never-created"));
    }
}
