//! kiln - Package Catalog and Build Orchestrator CLI

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kiln::catalog::{CatalogConfig, Catalogs, CompleteCatalog, InitOptions, ServerCatalog};
use kiln::project::Project;
use kiln::snapshot::{HttpRegistry, RemoteRegistry, SnapshotCache};
use kiln::ui::ConsoleReporter;

mod cmd;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about = "kiln - package catalog and build orchestrator")]
pub struct Cli {
    /// Never contact the registry; use the cached snapshot only
    #[arg(long, global = true)]
    offline: bool,

    /// Registry snapshot URL
    #[arg(
        long,
        global = true,
        env = "KILN_REGISTRY_URL",
        default_value = "https://registry.kiln.dev/snapshot.bin"
    )]
    registry_url: String,

    /// Directories to scan for local package source trees
    #[arg(
        long = "local-dir",
        global = true,
        env = "KILN_PACKAGE_DIRS",
        value_delimiter = ':'
    )]
    local_dirs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the catalog from the registry and local directories
    Refresh,
    /// List known packages
    List {
        /// Show the server view instead of the merged one
        #[arg(long)]
        server: bool,
    },
    /// Show package info
    Info {
        /// Package name
        package: String,
    },
    /// Search packages by name or description
    Search {
        /// Search query
        query: String,
    },
    /// Resolve package constraints to a consistent version set
    Resolve {
        /// Package specs, `name` or `name@requirement`
        #[arg(required = true)]
        specs: Vec<String>,
        /// Ignore the project's pinned versions
        #[arg(long)]
        ignore_project: bool,
        /// Write the solution back to kiln.lock
        #[arg(long)]
        pin: bool,
    },
    /// Build a local package and its local dependencies
    Build {
        /// Package name
        package: String,
    },
    /// Manage local packages
    Local {
        #[command(subcommand)]
        command: LocalCommands,
    },
    /// Print the load path for a package
    Path {
        /// Package name
        package: String,
        /// Version, required for non-local packages
        #[arg(long)]
        version: Option<String>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum LocalCommands {
    /// Register a local package at an explicit path
    Add {
        /// Package name
        name: String,
        /// Source directory
        dir: PathBuf,
    },
    /// Unregister a local package
    Remove {
        /// Package name
        name: String,
    },
    /// List effective local packages
    List,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        cmd::completions::completions(*shell);
        return Ok(());
    }

    let mut catalogs = open_catalogs(&cli)?;

    match cli.command {
        Commands::Refresh => cmd::refresh::refresh(&mut catalogs),
        Commands::List { server } => cmd::list::list(&mut catalogs, server),
        Commands::Info { package } => cmd::info::info(&catalogs, &package),
        Commands::Search { query } => cmd::search::search(&catalogs, &query),
        Commands::Resolve {
            specs,
            ignore_project,
            pin,
        } => cmd::resolve::resolve(&catalogs, &specs, ignore_project, pin),
        Commands::Build { package } => cmd::build::build(&mut catalogs, &package),
        Commands::Local { command } => match command {
            LocalCommands::Add { name, dir } => cmd::local::add(&mut catalogs, &name, &dir),
            LocalCommands::Remove { name } => cmd::local::remove(&mut catalogs, &name),
            LocalCommands::List => cmd::local::list(&catalogs),
        },
        Commands::Path { package, version } => {
            cmd::path::path(&mut catalogs, &package, version.as_deref())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

/// Construct and initialize the process-wide catalog pair.
fn open_catalogs(cli: &Cli) -> Result<Catalogs> {
    let reporter = Arc::new(ConsoleReporter);

    let registry = |offline: bool| -> Result<Option<Box<dyn RemoteRegistry>>> {
        if offline {
            return Ok(None);
        }
        Ok(Some(Box::new(HttpRegistry::new(&cli.registry_url)?)))
    };

    let mut official = ServerCatalog::new(
        SnapshotCache::new(kiln::snapshot_cache_path()),
        registry(cli.offline)?,
        reporter.clone(),
    );
    official.initialize(cli.offline);

    let mut config = CatalogConfig::new(
        kiln::snapshot_cache_path(),
        kiln::depot_path(),
        reporter,
    );
    config.registry = registry(cli.offline)?;
    config.project = Project::discover(&std::env::current_dir()?);

    let mut complete = CompleteCatalog::new(config);
    complete.initialize(InitOptions {
        local_package_dirs: cli.local_dirs.clone(),
        offline: cli.offline,
    })?;
    complete.install_resolver();

    Ok(Catalogs::new(official, complete))
}
