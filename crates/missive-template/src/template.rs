//! Compiled templates: static fragments plus named slots.

use std::collections::HashMap;

use crate::escape::escape_html;

/// One piece of a compiled template.
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    /// Static text, emitted verbatim.
    Literal(String),

    /// Named insertion point. `fallback` is used when the prop is absent;
    /// a slot without a fallback is required.
    Slot {
        name: String,
        fallback: Option<String>,
    },
}

/// Errors that can occur while compiling template source.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Unclosed slot starting at byte {0} - missing }}}}")]
    UnclosedSlot(usize),

    #[error("Empty slot name at byte {0}")]
    EmptySlotName(usize),

    #[error("Invalid slot name '{0}' - expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidSlotName(String),
}

/// Errors that can occur while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template not found: '{0}'")]
    TemplateNotFound(String),

    #[error("Missing property '{slot}' for template '{template}'")]
    MissingProperty { template: String, slot: String },
}

/// An immutable, compiled email template.
///
/// The body is HTML; slot values are escaped on insertion. The optional
/// subject line shares the slot syntax but is plain text, so its values are
/// inserted verbatim.
#[derive(Debug, Clone)]
pub struct Template {
    id: String,
    source: String,
    body: Vec<Segment>,
    subject: Option<Vec<Segment>>,
    description: Option<String>,
    sample_props: Option<HashMap<String, String>>,
}

impl Template {
    /// Compile template source into a sequence of fragments and slots.
    pub fn compile(id: impl Into<String>, source: &str) -> Result<Self, CompileError> {
        Ok(Self {
            id: id.into(),
            source: source.to_string(),
            body: compile_segments(source)?,
            subject: None,
            description: None,
            sample_props: None,
        })
    }

    /// Attach a subject line, compiled with the same slot syntax.
    pub fn with_subject(mut self, subject: &str) -> Result<Self, CompileError> {
        self.subject = Some(compile_segments(subject)?);
        Ok(self)
    }

    /// Attach a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach sample props used for previews and exports.
    pub fn with_sample_props(mut self, props: HashMap<String, String>) -> Self {
        self.sample_props = Some(props);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The raw template source as authored.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn sample_props(&self) -> Option<&HashMap<String, String>> {
        self.sample_props.as_ref()
    }

    /// Names of slots that must be present in the props (no fallback).
    pub fn required_slots(&self) -> Vec<&str> {
        self.body
            .iter()
            .filter_map(|seg| match seg {
                Segment::Slot {
                    name,
                    fallback: None,
                } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Render the HTML body, escaping every substituted value.
    ///
    /// Pure and synchronous; identical inputs yield byte-identical output.
    pub fn render(&self, props: &HashMap<String, String>) -> Result<String, RenderError> {
        render_segments(&self.id, &self.body, props, true)
    }

    /// Render the subject line, if the template has one. Subject values are
    /// plain text and are not HTML-escaped.
    pub fn render_subject(
        &self,
        props: &HashMap<String, String>,
    ) -> Result<Option<String>, RenderError> {
        match &self.subject {
            Some(segments) => render_segments(&self.id, segments, props, false).map(Some),
            None => Ok(None),
        }
    }
}

/// Scan `source` into literal and slot segments.
///
/// `{{name}}` is a required slot, `{{name|fallback}}` supplies a literal
/// fallback. Braces have no escape form; an unclosed `{{` is an error.
fn compile_segments(source: &str) -> Result<Vec<Segment>, CompileError> {
    let mut segments = Vec::new();
    let mut rest = source;
    let mut offset = 0;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }

        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or(CompileError::UnclosedSlot(offset + open))?;
        let inner = &after[..close];

        let (name, fallback) = match inner.find('|') {
            Some(pipe) => (&inner[..pipe], Some(inner[pipe + 1..].to_string())),
            None => (inner, None),
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(CompileError::EmptySlotName(offset + open));
        }
        if !is_valid_slot_name(name) {
            return Err(CompileError::InvalidSlotName(name.to_string()));
        }

        segments.push(Segment::Slot {
            name: name.to_string(),
            fallback,
        });

        offset += open + 2 + close + 2;
        rest = &after[close + 2..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }

    Ok(segments)
}

fn is_valid_slot_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn render_segments(
    template_id: &str,
    segments: &[Segment],
    props: &HashMap<String, String>,
    escape: bool,
) -> Result<String, RenderError> {
    let mut out = String::new();

    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Slot { name, fallback } => {
                let value = match props.get(name) {
                    Some(v) => v.as_str(),
                    None => match fallback {
                        Some(f) => f.as_str(),
                        None => {
                            return Err(RenderError::MissingProperty {
                                template: template_id.to_string(),
                                slot: name.clone(),
                            })
                        }
                    },
                };
                if escape {
                    out.push_str(&escape_html(value));
                } else {
                    out.push_str(value);
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_slot_values() {
        let t = Template::compile("greet", "<p>Hi {{who}}!</p>").unwrap();
        assert_eq!(t.render(&props(&[("who", "Ada")])).unwrap(), "<p>Hi Ada!</p>");
    }

    #[test]
    fn escapes_substituted_values() {
        let t = Template::compile("greet", "<p>{{who}}</p>").unwrap();
        let html = t
            .render(&props(&[("who", "<script>alert('x')</script>")]))
            .unwrap();

        assert!(!html.contains("<script>"));
        assert_eq!(
            html,
            "<p>&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn escapes_exactly_once() {
        let t = Template::compile("greet", "{{v}}").unwrap();
        assert_eq!(t.render(&props(&[("v", "&amp;")])).unwrap(), "&amp;amp;");
    }

    #[test]
    fn rendering_is_deterministic() {
        let t = Template::compile("greet", "<p>{{a}} {{b}}</p>").unwrap();
        let p = props(&[("a", "one"), ("b", "two")]);

        assert_eq!(t.render(&p).unwrap(), t.render(&p).unwrap());
    }

    #[test]
    fn missing_required_slot_fails() {
        let t = Template::compile("greet", "<p>{{who}}</p>").unwrap();
        let err = t.render(&HashMap::new()).unwrap_err();

        match err {
            RenderError::MissingProperty { template, slot } => {
                assert_eq!(template, "greet");
                assert_eq!(slot, "who");
            }
            other => panic!("expected MissingProperty, got {other:?}"),
        }
    }

    #[test]
    fn fallback_used_when_prop_absent() {
        let t = Template::compile("greet", "Hi {{who|there}}!").unwrap();

        assert_eq!(t.render(&HashMap::new()).unwrap(), "Hi there!");
        assert_eq!(t.render(&props(&[("who", "Ada")])).unwrap(), "Hi Ada!");
    }

    #[test]
    fn fallback_value_is_escaped_too() {
        let t = Template::compile("greet", "{{who|<b>}}").unwrap();
        assert_eq!(t.render(&HashMap::new()).unwrap(), "&lt;b&gt;");
    }

    #[test]
    fn unclosed_slot_is_a_compile_error() {
        let err = Template::compile("bad", "hello {{who").unwrap_err();
        assert!(matches!(err, CompileError::UnclosedSlot(6)));
    }

    #[test]
    fn empty_slot_name_is_a_compile_error() {
        let err = Template::compile("bad", "hello {{}}").unwrap_err();
        assert!(matches!(err, CompileError::EmptySlotName(_)));

        let err = Template::compile("bad", "hello {{|fallback}}").unwrap_err();
        assert!(matches!(err, CompileError::EmptySlotName(_)));
    }

    #[test]
    fn invalid_slot_name_is_a_compile_error() {
        let err = Template::compile("bad", "{{user name}}").unwrap_err();
        assert!(matches!(err, CompileError::InvalidSlotName(_)));

        let err = Template::compile("bad", "{{1st}}").unwrap_err();
        assert!(matches!(err, CompileError::InvalidSlotName(_)));
    }

    #[test]
    fn subject_is_not_html_escaped() {
        let t = Template::compile("greet", "<p>{{who}}</p>")
            .unwrap()
            .with_subject("Order <{{who}}>")
            .unwrap();

        let subject = t.render_subject(&props(&[("who", "Ada")])).unwrap();
        assert_eq!(subject.as_deref(), Some("Order <Ada>"));
    }

    #[test]
    fn template_without_subject_renders_none() {
        let t = Template::compile("greet", "<p>hi</p>").unwrap();
        assert_eq!(t.render_subject(&HashMap::new()).unwrap(), None);
    }

    #[test]
    fn lists_required_slots() {
        let t = Template::compile("greet", "{{a}} {{b|x}} {{c}}").unwrap();
        assert_eq!(t.required_slots(), vec!["a", "c"]);
    }
}
