//! Explicit template registry.

use std::collections::HashMap;

use crate::template::{RenderError, Template};

/// A collection of compiled templates, keyed by identifier.
///
/// The registry is a plain value passed by reference; there is no global
/// registration. Adding a template with an existing id replaces it.
pub struct Registry {
    templates: HashMap<String, Template>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Create a registry seeded with the built-in templates.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        let welcome = Template::compile("welcome", WELCOME_TEMPLATE)
            .expect("Failed to compile welcome template")
            .with_subject("Welcome!")
            .expect("Failed to compile welcome subject")
            .with_description("Styled welcome email with a website link")
            .with_sample_props(sample(&[("userName", "Ada")]));
        registry.add(welcome);

        let minimal = Template::compile("welcome-minimal", WELCOME_MINIMAL_TEMPLATE)
            .expect("Failed to compile welcome-minimal template")
            .with_subject("Welcome!")
            .expect("Failed to compile welcome-minimal subject")
            .with_description("Minimal welcome email without styling")
            .with_sample_props(sample(&[("name", "Ada")]));
        registry.add(minimal);

        registry
    }

    /// Add a template, replacing any existing entry with the same id.
    pub fn add(&mut self, template: Template) {
        self.templates.insert(template.id().to_string(), template);
    }

    /// Look up a template by exact id.
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    /// Look up a template by name and locale.
    ///
    /// Tries `name.locale` first, then falls back to the bare name.
    pub fn get_localized(&self, name: &str, locale: &str) -> Option<&Template> {
        self.templates
            .get(&format!("{name}.{locale}"))
            .or_else(|| self.templates.get(name))
    }

    /// Render a template by id.
    pub fn render(
        &self,
        id: &str,
        props: &HashMap<String, String>,
    ) -> Result<String, RenderError> {
        let template = self
            .get(id)
            .ok_or_else(|| RenderError::TemplateNotFound(id.to_string()))?;
        template.render(props)
    }

    /// Render a template by name and locale, falling back to the bare name.
    pub fn render_localized(
        &self,
        name: &str,
        locale: &str,
        props: &HashMap<String, String>,
    ) -> Result<String, RenderError> {
        let template = self
            .get_localized(name, locale)
            .ok_or_else(|| RenderError::TemplateNotFound(name.to_string()))?;
        template.render(props)
    }

    /// Template ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all templates.
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn sample(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

const WELCOME_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="UTF-8">
    <title>Welcome!</title>
  </head>
  <body>
    <h1>Welcome, {{userName}}!</h1>
    <p>Thank you for joining our service. We’re excited to have you on board.</p>
    <p><a href="https://yourcompany.com">Visit our website</a></p>
  </body>
</html>
"#;

const WELCOME_MINIMAL_TEMPLATE: &str = r#"<html>
  <body>
    <h1>Hello, {{name}}!</h1>
    <p>Welcome to our service.</p>
  </body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::RenderError;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn renders_builtin_welcome() {
        let registry = Registry::with_builtins();
        let html = registry
            .render("welcome", &props(&[("userName", "Ada")]))
            .unwrap();

        assert!(html.contains("Welcome, Ada!"));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("</html>"));
    }

    #[test]
    fn welcome_escapes_user_name() {
        let registry = Registry::with_builtins();
        let raw = "<img src=x onerror=alert(1)>";
        let html = registry.render("welcome", &props(&[("userName", raw)])).unwrap();

        assert!(!html.contains(raw));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
    }

    #[test]
    fn unknown_template_fails() {
        let registry = Registry::with_builtins();
        let err = registry.render("unknown-template", &HashMap::new()).unwrap_err();

        assert!(matches!(err, RenderError::TemplateNotFound(id) if id == "unknown-template"));
    }

    #[test]
    fn missing_user_name_fails() {
        let registry = Registry::with_builtins();
        let err = registry.render("welcome", &HashMap::new()).unwrap_err();

        assert!(matches!(err, RenderError::MissingProperty { slot, .. } if slot == "userName"));
    }

    #[test]
    fn both_welcome_variants_coexist() {
        let registry = Registry::with_builtins();

        assert!(registry.get("welcome").is_some());
        assert!(registry.get("welcome-minimal").is_some());

        let html = registry
            .render("welcome-minimal", &props(&[("name", "Ada")]))
            .unwrap();
        assert!(html.contains("Hello, Ada!"));
    }

    #[test]
    fn add_replaces_same_id() {
        let mut registry = Registry::new();
        registry.add(Template::compile("t", "one").unwrap());
        registry.add(Template::compile("t", "two").unwrap());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.render("t", &HashMap::new()).unwrap(), "two");
    }

    #[test]
    fn localized_lookup_falls_back() {
        let mut registry = Registry::new();
        registry.add(Template::compile("greet", "hello").unwrap());
        registry.add(Template::compile("greet.tr", "merhaba").unwrap());

        let p = HashMap::new();
        assert_eq!(registry.render_localized("greet", "tr", &p).unwrap(), "merhaba");
        assert_eq!(registry.render_localized("greet", "de", &p).unwrap(), "hello");

        let err = registry.render_localized("missing", "tr", &p).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
    }

    #[test]
    fn ids_are_sorted() {
        let registry = Registry::with_builtins();
        assert_eq!(registry.ids(), vec!["welcome", "welcome-minimal"]);
    }
}
