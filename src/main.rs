//! unitypack CLI - build a .unitypackage from a directory

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use unitypack::ops::{build_package, plan};
use unitypack::{PackageConfig, DEFAULT_PACKAGE_NAME};

#[derive(Parser)]
#[command(name = "unitypack")]
#[command(about = "build a Unity asset package from a directory of assets")]
#[command(version)]
struct Cli {
    /// directory to package (must sit below an "Assets" directory)
    source: Option<PathBuf>,

    /// package name, written as <NAME>.unitypackage
    name: Option<String>,

    /// read settings from a toml file; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// name folders after the guid in each file's .meta and include the .meta
    #[arg(short, long)]
    stable_hashes: bool,

    /// prefix for every recorded path, e.g. "Assets/MyTool/"
    #[arg(short, long)]
    prefix: Option<String>,

    /// extensions to skip (comma separated)
    #[arg(short = 'e', long, value_delimiter = ',')]
    skip_ext: Vec<String>,

    /// path prefixes below Assets to skip (comma separated)
    #[arg(short = 'd', long, value_delimiter = ',')]
    skip_dir: Vec<String>,

    /// directory to write the package into
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// fixed mtime (unix seconds) for every archive entry
    #[arg(long, env = "SOURCE_DATE_EPOCH")]
    mtime: Option<u64>,

    /// list what would be packaged and exit
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// more logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.is_config() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "unitypack=info",
        1 => "unitypack=debug",
        _ => "unitypack=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// merge the config file (if any) with command line flags
fn resolve_config(cli: Cli) -> unitypack::Result<PackageConfig> {
    let mut config = match (&cli.config, &cli.source) {
        (Some(path), _) => PackageConfig::load(path)?,
        (None, Some(source)) => PackageConfig::new(source, DEFAULT_PACKAGE_NAME),
        (None, None) => {
            return Err(unitypack::Error::InvalidConfig(
                "no source directory given".to_string(),
            ))
        }
    };

    if let Some(source) = cli.source {
        config.source_root = source;
    }
    if let Some(name) = cli.name {
        config.package_name = name;
    }
    if cli.stable_hashes {
        config.stable_hashes = true;
    }
    if let Some(prefix) = cli.prefix {
        config.path_prefix = prefix;
    }
    if !cli.skip_ext.is_empty() {
        config.skip_extensions = cli.skip_ext;
    }
    if !cli.skip_dir.is_empty() {
        config.skip_dirs = cli.skip_dir;
    }
    if cli.output_dir.is_some() {
        config.output_dir = cli.output_dir;
    }
    if cli.mtime.is_some() {
        config.mtime = cli.mtime;
    }

    Ok(config)
}

fn run(cli: Cli) -> unitypack::Result<()> {
    let dry_run = cli.dry_run;
    let config = resolve_config(cli)?;

    if dry_run {
        for file in plan(&config)? {
            println!("{}", file);
        }
        return Ok(());
    }

    let report = build_package(&config)?;
    if let Some(warning) = &report.cleanup {
        eprintln!("warning: {}", warning);
    }
    println!("{}", report.archive.display());
    Ok(())
}
