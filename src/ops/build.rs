use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::archive::{remove_staging, write_archive, ArchiveOptions, CleanupWarning};
use crate::config::PackageConfig;
use crate::error::Result;
use crate::source::select_sources;
use crate::staging::{create_staging_root, Stager, StagingEntry};

/// outcome of a successful build
#[derive(Debug)]
pub struct PackageReport {
    /// the written archive
    pub archive: PathBuf,
    /// one per packaged file
    pub entries: Vec<StagingEntry>,
    /// files left out by the filter
    pub skipped: usize,
    /// bytes of staged data written into the archive
    pub bytes: u64,
    /// set when the staging tree could not be removed
    pub cleanup: Option<CleanupWarning>,
}

/// build a package with a freshly seeded random source
pub fn build_package(config: &PackageConfig) -> Result<PackageReport> {
    let mut rng = StdRng::from_entropy();
    build_package_with(config, &std::env::temp_dir(), &mut rng)
}

/// build a package, staging under `temp_parent` and drawing every random
/// name from `rng`.
///
/// enumeration finishes before the staging directory is created, so a
/// configuration error leaves nothing behind. an error after that point
/// leaves the staging directory in place for inspection.
pub fn build_package_with<R: Rng + ?Sized>(
    config: &PackageConfig,
    temp_parent: &Path,
    rng: &mut R,
) -> Result<PackageReport> {
    let config = config.clone().normalized();
    config.validate()?;

    let selection = select_sources(&config)?;
    tracing::info!(
        included = selection.included.len(),
        skipped = selection.skipped.len(),
        source = %config.source_root.display(),
        "enumerated sources"
    );

    let staging_root = create_staging_root(temp_parent, &mut *rng)?;
    tracing::debug!(staging = %staging_root.display(), "created staging directory");

    let mut stager = Stager::new(&staging_root, config.stable_hashes, &config.path_prefix, rng);
    let mut entries = Vec::with_capacity(selection.included.len());
    for file in &selection.included {
        entries.push(stager.stage(file)?);
    }

    let archive = config.output_path();
    let opts = ArchiveOptions {
        mtime: config.mtime,
    };
    let stats = write_archive(&staging_root, &archive, &opts)?;
    tracing::info!(
        archive = %archive.display(),
        entries = stats.entries,
        bytes = stats.bytes,
        "wrote package"
    );

    let cleanup = remove_staging(&staging_root);

    Ok(PackageReport {
        archive,
        entries,
        skipped: selection.skipped.len(),
        bytes: stats.bytes,
        cleanup,
    })
}
