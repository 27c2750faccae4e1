use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::types::Identity;

/// Default location of the spawn catalog document
pub const DEFAULT_CATALOG_PATH: &str = "/data/spawn.json";

/// imagechooser - inspect and exercise a spawner image/resource catalog
#[derive(Parser)]
#[command(name = "imagechooser")]
#[command(about = "Entitlement-scoped image and resource-tier selection for container spawners")]
#[command(version)]
pub struct Cli {
    /// Path to the catalog document
    #[arg(
        short,
        long,
        global = true,
        env = "IMAGECHOOSER_CATALOG",
        default_value = DEFAULT_CATALOG_PATH
    )]
    pub catalog: PathBuf,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Who is asking
#[derive(Args, Debug, Clone)]
pub struct IdentityArgs {
    /// User name to resolve entitlements for
    #[arg(short, long)]
    pub user: String,

    /// Treat the user as an admin
    #[arg(long)]
    pub admin: bool,
}

impl IdentityArgs {
    pub fn identity(&self) -> Identity {
        Identity {
            name: self.user.clone(),
            is_admin: self.admin,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the catalog document
    Validate,
    /// List the selectable images
    Images,
    /// List the resource tiers a user may select
    Tiers {
        #[command(flatten)]
        who: IdentityArgs,
    },
    /// Resolve a selection into launch options (JSON)
    Resolve {
        #[command(flatten)]
        who: IdentityArgs,
        /// Requested image id
        #[arg(short, long)]
        image: Option<String>,
        /// Requested resource tier
        #[arg(short, long)]
        resource: Option<String>,
    },
    /// Render the options form for a user
    Form {
        #[command(flatten)]
        who: IdentityArgs,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
