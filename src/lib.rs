//! Image chooser library
//!
//! Entitlement-scoped option resolution for notebook container spawners:
//! which images and resource tiers a user may pick, the options form that
//! offers them, and normalization of a submitted form into launch options.

pub mod catalog_file;
pub mod cli;
pub mod error;
pub mod form;
pub mod resolver;
pub mod spawner;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use catalog_file::{Catalog, CatalogDocument, TierSpec};
pub use error::{ImageChooserError, Result};
pub use form::{FormSelection, FormTemplate};
pub use resolver::CatalogResolver;
pub use spawner::ImageChooser;
pub use store::{CatalogSource, CatalogStore, FileCatalogSource, StaticCatalogSource};
pub use types::{DEFAULT_ENTITLEMENT, FormField, Identity, ImageChoice, LaunchOptions, ResourceTier};
