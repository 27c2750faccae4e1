//! imagechooser - main entry point
//!
//! Loads the spawn catalog and answers entitlement and resolution questions
//! from the command line, the same way a spawner host would through the library.

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use imagechooser::cli::{Cli, Commands};
use imagechooser::{CatalogResolver, CatalogStore, FileCatalogSource, FormTemplate};

/// Initialize the logger; RUST_LOG overrides the default level
fn init_logger(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    if let Err(e) = run(cli) {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = CatalogStore::new(FileCatalogSource::new(&cli.catalog));
    let catalog = store
        .snapshot()
        .with_context(|| format!("Failed to load catalog from {:?}", cli.catalog))?;
    let resolver = CatalogResolver::new(catalog);

    match cli.command {
        Commands::Validate => {
            info!("Validating catalog: {:?}", cli.catalog);
            resolver.catalog().check_default_entitlement()?;
            let catalog = resolver.catalog();
            println!(
                "✓ Catalog is valid: {} images, {} resource tiers",
                catalog.images().len(),
                catalog.tiers().count()
            );
        }
        Commands::Images => {
            for image in resolver.available_images() {
                println!("{}\t{}", image.id, image.title);
            }
        }
        Commands::Tiers { who } => {
            for tier in resolver.allowed_tier_details(&who.identity())? {
                println!(
                    "{}\t{}\tram={}\tcpu={}",
                    tier.name, tier.title, tier.ram, tier.cpu
                );
            }
        }
        Commands::Resolve {
            who,
            image,
            resource,
        } => {
            let options = resolver.resolve_selection(
                &who.identity(),
                image.as_deref(),
                resource.as_deref(),
            )?;
            let json = serde_json::to_string_pretty(&options)
                .context("Failed to serialize launch options")?;
            println!("{}", json);
        }
        Commands::Form { who } => {
            let tiers = resolver.allowed_tier_details(&who.identity())?;
            print!(
                "{}",
                FormTemplate::default().render(resolver.available_images(), &tiers)
            );
        }
    }

    Ok(())
}
