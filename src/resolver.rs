//! Entitlement-scoped option resolution.
//!
//! Translates a user identity plus a raw form submission into a normalized
//! [`LaunchOptions`] record, using only an in-memory [`Catalog`] snapshot.
//!
//! # Resolution Rules
//!
//! | Question | Answer |
//! |----------|--------|
//! | Which tiers may a user pick? | Explicit `resource_mapping` entry, else every tier for admins, else `"default"` |
//! | Which images may a user pick? | All of them; images are not entitlement-scoped |
//! | Unknown/absent image? | First catalog image |
//! | Unknown/unentitled/absent tier? | First tier of the user's allowed sequence |
//!
//! Submitted values are never errors. Catalog inconsistencies are.
//!
//! # What This Explicitly Refuses To Do
//!
//! - Read files: loading lives in [`crate::store`]
//! - Repair the catalog: a resolved tier missing from `resources` fails

use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog_file::Catalog;
use crate::error::{ImageChooserError, Result};
use crate::types::{Identity, ImageChoice, LaunchOptions, ResourceTier};

/// Answers "what may this user choose" against one catalog snapshot.
#[derive(Debug, Clone)]
pub struct CatalogResolver {
    catalog: Arc<Catalog>,
}

impl CatalogResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// The snapshot this resolver answers from
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resource tier names the identity may select, in entitlement order.
    ///
    /// An explicit mapping wins over the admin flag.
    pub fn allowed_resource_tiers(&self, identity: &Identity) -> Result<Vec<String>> {
        let allowed = if let Some(explicit) = self.catalog.entitlement(&identity.name) {
            explicit.to_vec()
        } else if identity.is_admin {
            self.catalog.tier_names()
        } else {
            self.catalog
                .default_entitlement()
                .map(<[String]>::to_vec)
                .ok_or_else(|| {
                    ImageChooserError::config(format!(
                        "user '{}' has no entitlement and resource_mapping has no \"default\" entry",
                        identity.name
                    ))
                })?
        };

        info!(
            "User {} is allowed these resource tiers: {:?}",
            identity.name, allowed
        );
        Ok(allowed)
    }

    /// Allowed tiers with their full definitions, for rendering
    pub fn allowed_tier_details(&self, identity: &Identity) -> Result<Vec<&ResourceTier>> {
        self.allowed_resource_tiers(identity)?
            .iter()
            .map(|name| self.lookup_tier(name))
            .collect()
    }

    /// Every image in the catalog, unfiltered
    pub fn available_images(&self) -> &[ImageChoice] {
        self.catalog.images()
    }

    /// Normalize a raw submission into launch options.
    ///
    /// Unknown or missing values fall back to defaults silently; only
    /// catalog-level problems produce an error.
    pub fn resolve_selection(
        &self,
        identity: &Identity,
        raw_image: Option<&str>,
        raw_resource: Option<&str>,
    ) -> Result<LaunchOptions> {
        let default_image = self.catalog.default_image();
        let container_image = match raw_image {
            Some(image) if self.catalog.contains_image(image) => image.to_string(),
            Some(image) => {
                debug!(
                    "Image {:?} is not in the catalog, using default {}",
                    image, default_image.id
                );
                default_image.id.clone()
            }
            None => default_image.id.clone(),
        };

        let allowed = self.allowed_resource_tiers(identity)?;
        let default_resource = allowed.first().ok_or_else(|| {
            ImageChooserError::config(format!(
                "user '{}' is entitled to no resource tiers",
                identity.name
            ))
        })?;
        let resource_name = match raw_resource {
            Some(resource) if allowed.iter().any(|a| a == resource) => resource,
            Some(resource) => {
                debug!(
                    "Tier {:?} is not allowed for {}, using default {}",
                    resource, identity.name, default_resource
                );
                default_resource.as_str()
            }
            None => default_resource.as_str(),
        };

        let tier = self.lookup_tier(resource_name)?;
        Ok(LaunchOptions {
            container_image,
            resource_name: tier.name.clone(),
            resource_ram: tier.ram,
            resource_cpu: tier.cpu,
        })
    }

    fn lookup_tier(&self, name: &str) -> Result<&ResourceTier> {
        self.catalog.tier(name).ok_or_else(|| {
            ImageChooserError::config(format!("resource tier '{}' is not defined", name))
        })
    }
}
