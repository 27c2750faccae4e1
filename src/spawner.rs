//! Host-facing adapter.
//!
//! A spawner host needs two hooks: the HTML options form shown before launch,
//! and the conversion of the submitted form into launch options. `ImageChooser`
//! provides both on top of a [`CatalogStore`] without any host base class.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::catalog_file::Catalog;
use crate::error::Result;
use crate::form::{FormSelection, FormTemplate};
use crate::store::{CatalogSource, CatalogStore};
use crate::types::{Identity, LaunchOptions};

pub struct ImageChooser<S> {
    store: CatalogStore<S>,
    template: FormTemplate,
}

impl<S: CatalogSource> ImageChooser<S> {
    pub fn new(store: CatalogStore<S>) -> Self {
        Self::with_template(store, FormTemplate::default())
    }

    pub fn with_template(store: CatalogStore<S>, template: FormTemplate) -> Self {
        Self { store, template }
    }

    pub fn store(&self) -> &CatalogStore<S> {
        &self.store
    }

    /// Options form listing every image and the identity's entitled tiers
    pub fn options_form(&self, identity: &Identity) -> Result<String> {
        let resolver = self.store.resolver()?;
        let tiers = resolver.allowed_tier_details(identity)?;
        Ok(self.template.render(resolver.available_images(), &tiers))
    }

    /// Normalize a submitted form into launch options
    pub fn options_from_form(
        &self,
        identity: &Identity,
        form_data: &HashMap<String, Vec<String>>,
    ) -> Result<LaunchOptions> {
        let selection = FormSelection::from_form_data(form_data);
        let options = self.store.resolver()?.resolve_selection(
            identity,
            selection.image.as_deref(),
            selection.resource.as_deref(),
        )?;
        info!(
            "Resolved launch options for {}: image={} tier={} ram={} cpu={}",
            identity.name,
            options.container_image,
            options.resource_name,
            options.resource_ram,
            options.resource_cpu
        );
        Ok(options)
    }

    /// Reload the catalog, e.g. after an edit or on a refresh signal
    pub fn refresh(&self) -> Result<Arc<Catalog>> {
        self.store.refresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_file::CatalogDocument;
    use crate::store::StaticCatalogSource;

    fn chooser() -> ImageChooser<StaticCatalogSource> {
        let catalog = CatalogDocument::from_json(
            r#"{
                "dockerimages": ["img-a", "img-b"],
                "dockertitles": ["Image A", "Image B"],
                "resources": {
                    "small": {"title": "Small", "ram": 1024, "cpu": 1},
                    "large": {"title": "Large", "ram": 8192, "cpu": 4}
                },
                "resource_mapping": {"default": ["small"], "alice": ["small", "large"]}
            }"#,
        )
        .unwrap()
        .into_catalog()
        .unwrap();
        ImageChooser::new(CatalogStore::new(StaticCatalogSource::new(catalog)))
    }

    fn form(image: &str, resource: &str) -> HashMap<String, Vec<String>> {
        HashMap::from([
            ("dockerimage".to_string(), vec![image.to_string()]),
            ("resources".to_string(), vec![resource.to_string()]),
        ])
    }

    #[test]
    fn test_form_only_offers_entitled_tiers() {
        let chooser = chooser();

        let bob = chooser.options_form(&Identity::user("bob")).unwrap();
        assert!(bob.contains(r#"value="img-b""#));
        assert!(bob.contains(r#"value="small""#));
        assert!(!bob.contains(r#"value="large""#));

        let alice = chooser.options_form(&Identity::user("alice")).unwrap();
        assert!(alice.contains(r#"value="large""#));
    }

    #[test]
    fn test_options_from_form() {
        let chooser = chooser();
        let opts = chooser
            .options_from_form(&Identity::user("alice"), &form("img-b", "large"))
            .unwrap();
        assert_eq!(opts.container_image, "img-b");
        assert_eq!(opts.resource_name, "large");
        assert_eq!(opts.resource_ram, 8192.0);
    }

    #[test]
    fn test_options_from_tampered_form_falls_back() {
        let chooser = chooser();
        let opts = chooser
            .options_from_form(&Identity::user("bob"), &form("attacker/image", "large"))
            .unwrap();
        assert_eq!(opts.container_image, "img-a");
        assert_eq!(opts.resource_name, "small");
    }

    #[test]
    fn test_options_from_empty_form_uses_defaults() {
        let chooser = chooser();
        let opts = chooser
            .options_from_form(&Identity::admin("ops"), &HashMap::new())
            .unwrap();
        assert_eq!(opts.container_image, "img-a");
        assert_eq!(opts.resource_name, "small");
    }
}
