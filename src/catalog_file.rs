//! Catalog document handling: loading, saving and normalizing the spawn catalog.
//!
//! The on-disk format is the legacy parallel-array JSON document:
//!
//! ```json
//! {
//!   "dockerimages": ["jupyter/base", "jupyter/r"],
//!   "dockertitles": ["Base image", "R image"],
//!   "resources": {
//!     "small": { "title": "Small", "ram": 1024, "cpu": 1 },
//!     "large": { "title": "Large", "ram": 8192, "cpu": 4 }
//!   },
//!   "resource_mapping": {
//!     "default": ["small"],
//!     "alice": ["small", "large"]
//!   }
//! }
//! ```
//!
//! [`CatalogDocument`] mirrors that shape for serde. [`Catalog`] is the
//! normalized, immutable snapshot the resolver works against: images are
//! zipped into `(id, title)` pairs and tiers keep their declared order.

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;
use tracing::debug;

use crate::error::{ImageChooserError, Result};
use crate::types::{DEFAULT_ENTITLEMENT, ImageChoice, ResourceTier};

/// Serialized form of a resource tier inside `resources`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Display title; falls back to the tier name when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub ram: f64,
    pub cpu: f64,
}

/// Catalog document as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub dockerimages: Vec<String>,

    /// Index-aligned with `dockerimages`; image ids double as titles when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockertitles: Option<Vec<String>>,

    #[serde(deserialize_with = "unique_keys")]
    pub resources: IndexMap<String, TierSpec>,

    #[serde(default, deserialize_with = "unique_keys")]
    pub resource_mapping: IndexMap<String, Vec<String>>,
}

/// Deserialize a JSON object into an ordered map, rejecting repeated keys.
///
/// Plain `IndexMap` deserialization keeps the last value for a repeated key,
/// which would hide a second `"small"` tier behind the first.
fn unique_keys<'de, D, V>(deserializer: D) -> std::result::Result<IndexMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct UniqueKeys<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeys<V> {
        type Value = IndexMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map with unique keys")
        }

        fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                match map.entry(key) {
                    Entry::Occupied(entry) => {
                        return Err(de::Error::custom(format!(
                            "duplicate key `{}`",
                            entry.key()
                        )));
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(value);
                    }
                }
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueKeys(PhantomData))
}

impl CatalogDocument {
    /// Load a catalog document from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        debug!("Read catalog document from {:?}", path.as_ref());
        Self::from_json(&content)
    }

    /// Parse a catalog document from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ImageChooserError::config(format!("invalid catalog document: {}", e)))
    }

    /// Save the document to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(())
    }

    /// Normalize into an immutable [`Catalog`], checking structural invariants
    pub fn into_catalog(self) -> Result<Catalog> {
        let titles = match self.dockertitles {
            Some(titles) => {
                if titles.len() != self.dockerimages.len() {
                    return Err(ImageChooserError::config(format!(
                        "dockertitles has {} entries but dockerimages has {}",
                        titles.len(),
                        self.dockerimages.len()
                    )));
                }
                titles
            }
            None => self.dockerimages.clone(),
        };

        let images = self
            .dockerimages
            .into_iter()
            .zip(titles)
            .map(|(id, title)| ImageChoice { id, title })
            .collect();

        let tiers = self
            .resources
            .into_iter()
            .map(|(name, spec)| ResourceTier {
                title: spec.title.unwrap_or_else(|| name.clone()),
                name,
                ram: spec.ram,
                cpu: spec.cpu,
            })
            .collect();

        Catalog::new(images, tiers, self.resource_mapping)
    }
}

impl From<&Catalog> for CatalogDocument {
    fn from(catalog: &Catalog) -> Self {
        Self {
            dockerimages: catalog.images.iter().map(|i| i.id.clone()).collect(),
            dockertitles: Some(catalog.images.iter().map(|i| i.title.clone()).collect()),
            resources: catalog
                .tiers
                .values()
                .map(|t| {
                    (
                        t.name.clone(),
                        TierSpec {
                            title: Some(t.title.clone()),
                            ram: t.ram,
                            cpu: t.cpu,
                        },
                    )
                })
                .collect(),
            resource_mapping: catalog.entitlements.clone(),
        }
    }
}

/// Immutable, validated catalog snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    images: Vec<ImageChoice>,
    tiers: IndexMap<String, ResourceTier>,
    entitlements: IndexMap<String, Vec<String>>,
}

impl Catalog {
    /// Build a catalog from already-split parts.
    ///
    /// # Failure Modes
    ///
    /// - Empty image list
    /// - Duplicate image id or tier name
    /// - Entitlement naming a tier that is not defined
    ///
    /// A missing `"default"` entitlement is accepted here; see
    /// [`Catalog::check_default_entitlement`].
    pub fn new(
        images: Vec<ImageChoice>,
        tiers: Vec<ResourceTier>,
        entitlements: IndexMap<String, Vec<String>>,
    ) -> Result<Self> {
        if images.is_empty() {
            return Err(ImageChooserError::config(
                "catalog must list at least one image",
            ));
        }

        let mut seen = HashSet::new();
        for image in &images {
            if !seen.insert(image.id.as_str()) {
                return Err(ImageChooserError::config(format!(
                    "duplicate image id: {}",
                    image.id
                )));
            }
        }

        let mut tier_map = IndexMap::with_capacity(tiers.len());
        for tier in tiers {
            if tier_map.contains_key(&tier.name) {
                return Err(ImageChooserError::config(format!(
                    "duplicate resource tier: {}",
                    tier.name
                )));
            }
            tier_map.insert(tier.name.clone(), tier);
        }

        for (user, allowed) in &entitlements {
            if let Some(missing) = allowed.iter().find(|name| !tier_map.contains_key(*name)) {
                return Err(ImageChooserError::config(format!(
                    "resource_mapping entry '{}' references undefined tier '{}'",
                    user, missing
                )));
            }
        }

        Ok(Self {
            images,
            tiers: tier_map,
            entitlements,
        })
    }

    /// All images, in declared order
    pub fn images(&self) -> &[ImageChoice] {
        &self.images
    }

    /// The first declared image
    pub fn default_image(&self) -> &ImageChoice {
        // Construction rejects an empty list
        &self.images[0]
    }

    pub fn contains_image(&self, id: &str) -> bool {
        self.images.iter().any(|i| i.id == id)
    }

    /// Look up a tier by name
    pub fn tier(&self, name: &str) -> Option<&ResourceTier> {
        self.tiers.get(name)
    }

    /// All tiers, in declared order
    pub fn tiers(&self) -> impl Iterator<Item = &ResourceTier> {
        self.tiers.values()
    }

    /// All tier names, in declared order
    pub fn tier_names(&self) -> Vec<String> {
        self.tiers.keys().cloned().collect()
    }

    /// Explicit entitlement for a user name, if any
    pub fn entitlement(&self, user: &str) -> Option<&[String]> {
        self.entitlements.get(user).map(Vec::as_slice)
    }

    /// The `"default"` entitlement sequence, if declared
    pub fn default_entitlement(&self) -> Option<&[String]> {
        self.entitlement(DEFAULT_ENTITLEMENT)
    }

    /// Fail unless a non-empty `"default"` entitlement exists.
    ///
    /// Unmapped non-admin users cannot be served without one.
    pub fn check_default_entitlement(&self) -> Result<()> {
        match self.default_entitlement() {
            None => Err(ImageChooserError::config(
                "resource_mapping has no \"default\" entry",
            )),
            Some([]) => Err(ImageChooserError::config(
                "resource_mapping \"default\" entry is empty",
            )),
            Some(_) => Ok(()),
        }
    }
}
