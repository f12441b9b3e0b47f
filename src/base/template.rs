//! Response message templates.
//!
//! Templates use Go-style field actions: `I'm away from {{.From}} until {{.Until}}.`
//! Whitespace inside the braces is allowed, and `{{/* ... */}}` comments are dropped.
//! Templates are parsed up front so that a malformed one is rejected before anything
//! is fetched or sent; a reference to a field the renderer doesn't supply is only
//! discovered at render time.

use std::sync::LazyLock;

use regex::Regex;

use super::error::TemplateError;

static ACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("action pattern is valid"));
static FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\.([A-Za-z_][A-Za-z0-9_]*)$").expect("field pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
}

/// A parsed response template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template source.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for captures in ACTION.captures_iter(source) {
            let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };

            // An opening brace pair inside the previous text means an earlier action never closed.
            if let Some(offset) = source[cursor..whole.start()].find("{{") {
                return Err(TemplateError::Unclosed(cursor + offset));
            }

            push_text(&mut segments, &source[cursor..whole.start()]);
            cursor = whole.end();

            let action = inner.as_str().trim();

            if action.starts_with("/*") && action.ends_with("*/") && action.len() >= 4 {
                continue;
            }

            if action.is_empty() {
                return Err(TemplateError::EmptyAction(whole.start()));
            }

            let Some(field) = FIELD.captures(action).and_then(|c| c.get(1)) else {
                return Err(TemplateError::UnsupportedAction {
                    action: action.to_string(),
                    position: whole.start(),
                });
            };

            segments.push(Segment::Field(field.as_str().to_string()));
        }

        if let Some(offset) = source[cursor..].find("{{") {
            return Err(TemplateError::Unclosed(cursor + offset));
        }

        push_text(&mut segments, &source[cursor..]);

        Ok(Self { segments })
    }

    /// Render the template with the given named fields.
    pub fn render(&self, fields: &[(&str, &str)]) -> Result<String, TemplateError> {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(name) => {
                    let value = fields
                        .iter()
                        .find_map(|(key, value)| (*key == name.as_str()).then_some(*value))
                        .ok_or_else(|| TemplateError::MissingField(name.clone()))?;

                    out.push_str(value);
                }
            }
        }

        Ok(out)
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[(&str, &str)] = &[("From", "02 Jan 20 15:04 UTC"), ("Until", "03 Jan 20 16:00 UTC")];

    #[test]
    fn renders_fields_and_text() {
        let template = Template::parse("{{.From}} / {{.Until}}").unwrap();

        assert_eq!(template.render(FIELDS).unwrap(), "02 Jan 20 15:04 UTC / 03 Jan 20 16:00 UTC");
    }

    #[test]
    fn allows_whitespace_and_comments() {
        let template = Template::parse("Back {{ .Until }}.{{/* signature */}} Bye").unwrap();

        assert_eq!(template.render(FIELDS).unwrap(), "Back 03 Jan 20 16:00 UTC. Bye");
    }

    #[test]
    fn plain_text_is_untouched() {
        let template = Template::parse("I'm away } and }} too").unwrap();

        assert_eq!(template.render(&[]).unwrap(), "I'm away } and }} too");
    }

    #[test]
    fn rejects_unclosed_action() {
        assert_eq!(Template::parse("away until {{.Until").unwrap_err(), TemplateError::Unclosed(11));
        assert_eq!(Template::parse("{{.From {{.Until}}").unwrap_err(), TemplateError::UnsupportedAction {
            action: ".From {{.Until".to_string(),
            position: 0,
        });
    }

    #[test]
    fn rejects_empty_and_unsupported_actions() {
        assert_eq!(Template::parse("a {{ }} b").unwrap_err(), TemplateError::EmptyAction(2));
        assert!(matches!(Template::parse("{{ if .From }}").unwrap_err(), TemplateError::UnsupportedAction { .. }));
        assert!(matches!(Template::parse("{{.}}").unwrap_err(), TemplateError::UnsupportedAction { .. }));
    }

    #[test]
    fn missing_field_fails_at_render_time() {
        let template = Template::parse("Ask {{.Backup}} instead").unwrap();

        assert_eq!(template.render(FIELDS).unwrap_err(), TemplateError::MissingField("Backup".to_string()));
    }
}
