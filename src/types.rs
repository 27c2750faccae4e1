//! Core value types shared by the catalog, resolver and form modules.
//!
//! Everything here is immutable once built. The host supplies an [`Identity`],
//! the catalog supplies [`ImageChoice`] and [`ResourceTier`] values, and the
//! resolver hands back a [`LaunchOptions`] record for the launch step.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Reserved entitlement key holding the fallback tier sequence
pub const DEFAULT_ENTITLEMENT: &str = "default";

/// The caller as seen by the resolver.
///
/// Only the name and admin flag matter; authentication happens in the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl Identity {
    /// Regular (non-admin) user
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_admin: false,
        }
    }

    /// Admin user
    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_admin: true,
        }
    }
}

/// A selectable container image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageChoice {
    pub id: String,
    pub title: String,
}

impl ImageChoice {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// A named bundle of RAM/CPU limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTier {
    pub name: String,
    pub title: String,
    pub ram: f64,
    pub cpu: f64,
}

/// Normalized selection handed to the orchestration backend.
///
/// Field names match the keys the launch step reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchOptions {
    pub container_image: String,
    pub resource_name: String,
    pub resource_ram: f64,
    pub resource_cpu: f64,
}

/// Names of the submitted form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum FormField {
    /// Image `<select>`
    #[strum(serialize = "dockerimage")]
    DockerImage,
    /// Resource tier `<select>`
    Resources,
}
