//! unitypack - build Unity asset packages from a directory
//!
//! a `.unitypackage` is a gzip-compressed tar. every packaged file gets its own
//! folder, named by an identity hash, holding three entries:
//!
//! - **asset**: the file's bytes
//! - **asset.meta**: the file's sidecar, only with stable hashes enabled
//! - **pathname**: `<prefix><path below Assets>\n<random token>`
//!
//! # Identity hashes
//!
//! by default each folder is named with a random hash: the MD5 of the decimal
//! text of 32 random integers in `0..128`. with stable hashes enabled the
//! folder takes the `guid` from the file's `.meta` sidecar instead, so
//! re-importing a package updates the same assets.
//!
//! # Example usage
//!
//! ```no_run
//! use unitypack::{ops, PackageConfig};
//!
//! let config = PackageConfig::new("/project/Assets/MyTool", "MyTool")
//!     .with_stable_hashes(true)
//!     .with_path_prefix("Assets/MyTool/")
//!     .with_skip_dirs(["Tests"]);
//!
//! let report = ops::build_package(&config).unwrap();
//! println!("{}", report.archive.display());
//! ```

mod config;
mod error;
mod hash;

pub mod archive;
pub mod ops;
pub mod source;
pub mod staging;

pub use archive::{ArchiveOptions, ArchiveStats, CleanupWarning};
pub use config::{PackageConfig, DEFAULT_PACKAGE_NAME, PACKAGE_EXTENSION};
pub use error::{Error, Result};
pub use hash::{is_hash_hex, random_digits, random_hash, Hash};
pub use source::{Filter, SkipReason, SourceFile};
pub use staging::{Stager, StagingEntry};
