// src/main.rs

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use rpmdb::packages::{PackageMetadata, verify_files};
use rpmdb::{
    DatabaseFormat, PackageInfo, ScanMode, ScanOptions, detect_database_format, scan_packages,
};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "rpmdb")]
#[command(author, version, about = "Read the Berkeley DB rpm installed-package database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct DbArgs {
    /// Database path (default: /var/lib/rpm/Packages)
    #[arg(short, long, default_value = "/var/lib/rpm/Packages")]
    db_path: PathBuf,

    /// Read pages on a background thread
    #[arg(long)]
    background: bool,

    /// Decode headers in parallel
    #[arg(long)]
    parallel: bool,

    /// Skip malformed package headers instead of failing
    #[arg(long)]
    skip_invalid: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List installed packages
    List {
        #[command(flatten)]
        db: DbArgs,
    },
    /// Show details of installed packages with this name
    Info {
        /// Package name
        package_name: String,
        #[command(flatten)]
        db: DbArgs,
    },
    /// List the files of an installed package
    Files {
        /// Package name
        package_name: String,
        #[command(flatten)]
        db: DbArgs,
    },
    /// Verify installed files match their recorded sizes and digests
    Verify {
        /// Package name to verify (optional, verifies all if omitted)
        package_name: Option<String>,
        /// Install root directory
        #[arg(short, long, default_value = "/")]
        root: PathBuf,
        #[command(flatten)]
        db: DbArgs,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

impl DbArgs {
    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            mode: if self.background {
                ScanMode::Background
            } else {
                ScanMode::Inline
            },
            parallel_decode: self.parallel,
            skip_invalid: self.skip_invalid,
        }
    }

    /// Read every package, refusing database formats this tool cannot parse
    fn load(&self) -> Result<Vec<PackageInfo>> {
        let format = detect_database_format(&self.db_path)
            .with_context(|| format!("Failed to open {}", self.db_path.display()))?;
        info!("Detected database format: {:?}", format);

        match format {
            DatabaseFormat::BerkeleyHash(_) => {}
            DatabaseFormat::Sqlite => {
                anyhow::bail!(
                    "{} is an SQLite rpm database; only the Berkeley DB format is supported",
                    self.db_path.display()
                )
            }
            DatabaseFormat::Ndb => {
                anyhow::bail!(
                    "{} is an NDB rpm database; only the Berkeley DB format is supported",
                    self.db_path.display()
                )
            }
            DatabaseFormat::Unknown => {
                anyhow::bail!("{} is not an rpm database", self.db_path.display())
            }
        }

        let report = scan_packages(&self.db_path, &self.scan_options())
            .with_context(|| format!("Failed to read {}", self.db_path.display()))?;
        for skipped in &report.skipped {
            eprintln!("warning: skipped header on page {}: {}", skipped.page_no, skipped.error);
        }
        Ok(report.packages)
    }
}

fn find_by_name(packages: Vec<PackageInfo>, name: &str) -> Result<Vec<PackageInfo>> {
    let found: Vec<PackageInfo> = packages.into_iter().filter(|p| p.name == name).collect();
    if found.is_empty() {
        return Err(anyhow::anyhow!("Package '{}' is not installed", name));
    }
    Ok(found)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    serde_json::to_writer_pretty(io::stdout().lock(), value)?;
    println!();
    Ok(())
}

fn format_time(seconds: Option<i32>) -> String {
    seconds
        .and_then(|s| chrono::DateTime::from_timestamp(i64::from(s), 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "(unknown)".to_string())
}

fn print_info(pkg: &PackageInfo) {
    let field = |label: &str, value: &str| {
        if !value.is_empty() {
            println!("{:<13}: {}", label, value);
        }
    };

    field("Name", pkg.name());
    if let Some(epoch) = pkg.epoch {
        field("Epoch", &epoch.to_string());
    }
    field("Version", pkg.version());
    field("Release", &pkg.release);
    field("Architecture", pkg.architecture().unwrap_or(""));
    field("Install Date", &format_time(pkg.install_time));
    field("Group", &pkg.group);
    field("Size", &pkg.size.to_string());
    field("License", &pkg.license);
    field("Signature", &pkg.rsa_header.or(pkg.pgp).map(|s| s.to_string()).unwrap_or_default());
    field("Source RPM", &pkg.source_rpm);
    field("Build Date", &format_time(pkg.build_time));
    field("Build Host", &pkg.build_host);
    field("Packager", &pkg.packager);
    field("Vendor", &pkg.vendor);
    field("URL", &pkg.url);
    field("Summary", pkg.summary().unwrap_or(""));
    if !pkg.description.is_empty() {
        println!("Description  :\n{}", pkg.description);
    }
}

fn verify(packages: &[PackageInfo], root: &Path, json: bool) -> Result<bool> {
    let mut clean = true;
    let mut reports = Vec::new();

    for pkg in packages {
        let results = verify_files(pkg, root)
            .with_context(|| format!("Failed to verify {}", pkg.nevra()))?;

        for result in results.iter().filter(|r| r.status.is_failure()) {
            clean = false;
            if !json {
                println!("{}: {} {:?}", pkg.nevra(), result.path, result.status);
            }
        }
        if json {
            reports.push(serde_json::json!({ "package": pkg.nevra(), "files": results }));
        }
    }

    if json {
        print_json(&reports)?;
    } else if clean {
        println!("All files verified.");
    }
    Ok(clean)
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List { db }) => {
            let packages = db.load()?;
            if db.json {
                return print_json(&packages);
            }

            let mut names: Vec<String> = packages.iter().map(|p| p.nevra()).collect();
            names.sort();
            for name in &names {
                println!("{}", name);
            }
            info!("Total: {} package(s)", names.len());
            Ok(())
        }
        Some(Commands::Info { package_name, db }) => {
            let packages = find_by_name(db.load()?, &package_name)?;
            if db.json {
                return print_json(&packages);
            }

            for (i, pkg) in packages.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print_info(pkg);
            }
            Ok(())
        }
        Some(Commands::Files { package_name, db }) => {
            let packages = find_by_name(db.load()?, &package_name)?;

            let mut files = Vec::new();
            for pkg in &packages {
                let pkg_files = pkg
                    .files()
                    .with_context(|| format!("Corrupt file list in {}", pkg.nevra()))?;
                files.extend(pkg_files);
            }
            if db.json {
                return print_json(&files);
            }

            for file in &files {
                println!(
                    "{:>7o} {:>10} {:<8} {:<8} {} {}",
                    file.mode.unwrap_or(0),
                    file.size.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                    file.user_name.as_deref().unwrap_or("-"),
                    file.group_name.as_deref().unwrap_or("-"),
                    file.digest.as_deref().unwrap_or("-"),
                    file.path
                );
            }
            Ok(())
        }
        Some(Commands::Verify {
            package_name,
            root,
            db,
        }) => {
            info!("Verifying installed files below {}", root.display());
            let packages = match package_name {
                Some(name) => find_by_name(db.load()?, &name)?,
                None => db.load()?,
            };

            if !verify(&packages, &root, db.json)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "rpmdb", &mut io::stdout());
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("rpmdb v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'rpmdb --help' for usage information");
            Ok(())
        }
    }
}
