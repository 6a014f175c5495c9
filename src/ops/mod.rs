//! high-level operations for building packages

mod build;
mod plan;

pub use build::{build_package, build_package_with, PackageReport};
pub use plan::{plan, PlannedFile};
