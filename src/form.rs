//! Options form rendering and submitted form-data parsing.
//!
//! Rendering is plain string templating over resolver output; no web framework
//! is involved. The host posts the form back as a multi-valued map
//! (`{"dockerimage": ["img-a"], "resources": ["small"]}`), which
//! [`FormSelection::from_form_data`] reduces to the two raw values the
//! resolver normalizes.

use std::collections::HashMap;

use crate::types::{FormField, ImageChoice, ResourceTier};

/// Default outer form. `{docker_options}` and `{resource_options}` are replaced
/// by the rendered `<option>` lists.
pub const DEFAULT_FORM_TEMPLATE: &str = r#"
<label for="dockerimage">Select a Docker image:</label>
<select class="form-control" name="dockerimage" required autofocus>
{docker_options}</select>
<label for="resources">Select a container size:</label>
<select class="form-control" name="resources" required>
{resource_options}</select>
"#;

/// Default per-choice template. `{value}` and `{title}` are HTML-escaped.
pub const DEFAULT_OPTION_TEMPLATE: &str = "    <option value=\"{value}\">{title}</option>\n";

/// Configurable templates for the options form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTemplate {
    pub form: String,
    pub option: String,
}

impl Default for FormTemplate {
    fn default() -> Self {
        Self {
            form: DEFAULT_FORM_TEMPLATE.to_string(),
            option: DEFAULT_OPTION_TEMPLATE.to_string(),
        }
    }
}

impl FormTemplate {
    pub fn new(form: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            form: form.into(),
            option: option.into(),
        }
    }

    /// Render the form for a set of images and the tiers a user may pick.
    ///
    /// Tiers are rendered in the order given, so the first one is the
    /// browser's preselected default.
    pub fn render(&self, images: &[ImageChoice], tiers: &[&ResourceTier]) -> String {
        let docker_options: String = images
            .iter()
            .map(|image| self.render_option(&image.id, &image.title))
            .collect();
        let resource_options: String = tiers
            .iter()
            .map(|tier| self.render_option(&tier.name, &tier.title))
            .collect();

        fill(
            &self.form,
            &[
                ("{docker_options}", docker_options.as_str()),
                ("{resource_options}", resource_options.as_str()),
            ],
        )
    }

    fn render_option(&self, value: &str, title: &str) -> String {
        fill(
            &self.option,
            &[
                ("{value}", escape_html(value).as_str()),
                ("{title}", escape_html(title).as_str()),
            ],
        )
    }
}

/// Raw, unvalidated values pulled out of a form submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSelection {
    pub image: Option<String>,
    pub resource: Option<String>,
}

impl FormSelection {
    /// First value of each known field; missing or empty lists become `None`
    pub fn from_form_data(form_data: &HashMap<String, Vec<String>>) -> Self {
        let first = |field: FormField| {
            form_data
                .get(field.as_ref())
                .and_then(|values| values.first())
                .cloned()
        };

        Self {
            image: first(FormField::DockerImage),
            resource: first(FormField::Resources),
        }
    }
}

/// Single-pass placeholder substitution; inserted text is never re-scanned.
fn fill(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match substitutions
            .iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder))
        {
            Some((placeholder, text)) => {
                out.push_str(text);
                rest = &tail[placeholder.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
