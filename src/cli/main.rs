//! Meeting backgrounds CLI
//!
//! Thin dispatcher translating the four subcommands into
//! [`BackgroundManager`] calls. Ids are validated against the catalog
//! before any work starts; `--bg` defaults to every known collection.

use crate::catalog::Catalog;
use crate::hostenv::SystemHostEnv;
use crate::manager::{BackgroundManager, CollectionStatus};
use crate::tracing_config::{TracingConfig, TracingFormat};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, trace};

/// Manage virtual background images for desktop meeting apps
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "meeting-backgrounds")]
pub struct Cli {
    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available/downloaded backgrounds
    List {
        /// Print a markdown table instead of the human-readable report
        #[arg(long)]
        markdown: bool,
    },

    /// Download backgrounds
    Download {
        /// Meeting app(s) for which to add downloaded backgrounds
        #[arg(long = "app", required = true, num_args = 1..)]
        app: Vec<String>,

        /// Background collection(s) to download (default: all)
        #[arg(long = "bg", num_args = 1..)]
        bg: Vec<String>,

        /// Download backgrounds even if already downloaded
        #[arg(long)]
        force: bool,
    },

    /// Open meeting app folder with backgrounds
    Open {
        /// Meeting app for which to open its background images folder
        #[arg(long)]
        app: String,
    },

    /// Remove downloaded backgrounds
    Remove {
        /// Meeting app(s) for which to remove downloaded backgrounds
        #[arg(long = "app", required = true, num_args = 1..)]
        app: Vec<String>,

        /// Background collection(s) to remove (default: all)
        #[arg(long = "bg", num_args = 1..)]
        bg: Vec<String>,
    },
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose).context("Failed to initialize tracing")?;

    let catalog = Catalog::load_default().context("Failed to load catalog")?;
    let env = SystemHostEnv::new();
    let mut manager = BackgroundManager::new(&catalog, &env)
        .context("Failed to create background manager")?;

    match cli.command {
        Commands::List { markdown } => {
            print_list(&manager.list(), markdown);
        }
        Commands::Download { app, bg, force } => {
            let bg = validate_selection(&catalog, &app, bg)?;
            let count = manager.download(&app, &bg, force)?;
            println!("{} backgrounds downloaded.", count);
        }
        Commands::Open { app } => {
            catalog.app(&app)?;
            manager.open_install_folder(&app)?;
        }
        Commands::Remove { app, bg } => {
            let bg = validate_selection(&catalog, &app, bg)?;
            let count = manager.remove(&app, &bg)?;
            println!("{} backgrounds removed.", count);
        }
    }

    Ok(())
}

/// Initialize tracing based on verbosity level
fn init_tracing(verbose_count: u8) -> Result<()> {
    TracingConfig::new()
        .with_verbosity(verbose_count)
        .with_format(TracingFormat::Console)
        .init()
        .context("Failed to initialize tracing subscriber")?;

    match verbose_count {
        0 => {}
        1 => info!("Info level: showing resolution decisions and progress"),
        2 => debug!("Debug level: showing internal state"),
        _ => trace!("Trace level: showing detailed traces"),
    }
    Ok(())
}

/// Validate app ids and apply the all-collections default for `--bg`
fn validate_selection(
    catalog: &Catalog,
    apps: &[String],
    bgs: Vec<String>,
) -> Result<Vec<String>> {
    for app_id in apps {
        catalog.app(app_id)?;
    }
    if bgs.is_empty() {
        return Ok(catalog.background_ids());
    }
    for bg_id in &bgs {
        catalog.background(bg_id)?;
    }
    Ok(bgs)
}

/// Render the listing, either human-readable or as a markdown table
fn print_list(statuses: &[CollectionStatus], markdown: bool) {
    println!();
    if markdown {
        println!("Command Line | Title | Backgrounds");
        println!("-------------|-------|------------");
        for status in statuses {
            println!(
                "`--bg {}` | [{}]({}) | {}",
                status.id, status.title, status.url, status.image_count
            );
        }
        return;
    }
    for status in statuses {
        println!("Name: {}", status.id);
        println!("Title: {}", status.title);
        println!("Website: {}", status.url);
        println!("Backgrounds: {}", status.image_count);
        if status.installed_for.is_empty() {
            println!("Downloaded: no");
        } else {
            println!("Downloaded: yes ({})", status.installed_for.join(", "));
        }
        println!();
    }
}
