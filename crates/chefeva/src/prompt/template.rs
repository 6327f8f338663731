//! Minimal `{{...}}` prompt templates.
//!
//! A tag is either a variable path (`{{servings}}`, `{{event.guests}}`) or a
//! helper call with arguments (`{{join courses ", "}}`). Arguments are
//! variable paths or double-quoted literals. Values come from a
//! `serde_json::Value` object.
//!
//! Helpers:
//!
//! | Helper | Arguments | Output |
//! |--------|-----------|--------|
//! | `join` | list, separator (default `", "`) | items joined |
//! | `bullets` | list | one `- item` line per item |
//! | `lower` / `upper` | value | case-converted text |
//! | `default` | value, fallback | value, or fallback when missing, null, blank or an empty list |

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown helper '{0}'")]
    UnknownHelper(String),
    #[error("missing template variable '{0}'")]
    MissingVariable(String),
    #[error("unclosed template tag near '{0}'")]
    Unclosed(String),
    #[error("empty template tag")]
    EmptyTag,
    #[error("helper '{helper}' expects {expected}")]
    BadArguments {
        helper: &'static str,
        expected: &'static str,
    },
}

/// A parsed-on-render template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    source: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render against `vars`, which should be a JSON object.
    pub fn render(&self, vars: &Value) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();
        while let Some((before, after)) = rest.split_once("{{") {
            out.push_str(before);
            let (tag, remainder) = after
                .split_once("}}")
                .ok_or_else(|| TemplateError::Unclosed(excerpt(after)))?;
            out.push_str(&render_tag(tag, vars)?);
            rest = remainder;
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(24).collect()
}

#[derive(Debug, PartialEq)]
enum Arg {
    Path(String),
    Literal(String),
}

fn tokenize(tag: &str) -> Result<Vec<Arg>, TemplateError> {
    let mut args = Vec::new();
    let mut chars = tag.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut literal = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => literal.push(ch),
                    None => return Err(TemplateError::Unclosed(excerpt(tag))),
                }
            }
            args.push(Arg::Literal(literal));
        } else {
            let mut path = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                path.push(ch);
                chars.next();
            }
            args.push(Arg::Path(path));
        }
    }
    Ok(args)
}

fn lookup<'v>(vars: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(vars, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn resolve(arg: &Arg, vars: &Value) -> Option<Value> {
    match arg {
        Arg::Path(path) => lookup(vars, path).cloned(),
        Arg::Literal(text) => Some(Value::String(text.clone())),
    }
}

fn require(arg: &Arg, vars: &Value) -> Result<Value, TemplateError> {
    resolve(arg, vars).ok_or_else(|| match arg {
        Arg::Path(path) => TemplateError::MissingVariable(path.clone()),
        Arg::Literal(_) => TemplateError::EmptyTag,
    })
}

/// Text form of a value. Lists are joined with `", "`; null is empty.
fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn items(value: &Value, helper: &'static str) -> Result<Vec<String>, TemplateError> {
    match value {
        Value::Array(items) => Ok(items.iter().map(display).collect()),
        Value::Null => Ok(Vec::new()),
        Value::Object(_) => Err(TemplateError::BadArguments {
            helper,
            expected: "a list",
        }),
        scalar => Ok(vec![display(scalar)]),
    }
}

fn render_tag(tag: &str, vars: &Value) -> Result<String, TemplateError> {
    let args = tokenize(tag)?;
    let (head, rest) = args.split_first().ok_or(TemplateError::EmptyTag)?;
    if rest.is_empty() {
        return Ok(display(&require(head, vars)?));
    }
    let helper = match head {
        Arg::Path(name) => name.as_str(),
        Arg::Literal(_) => {
            return Err(TemplateError::BadArguments {
                helper: "literal",
                expected: "no arguments",
            });
        }
    };
    match helper {
        "join" => {
            let list = items(&require(&rest[0], vars)?, "join")?;
            let sep = match rest.get(1) {
                Some(arg) => display(&require(arg, vars)?),
                None => ", ".to_string(),
            };
            Ok(list.join(&sep))
        }
        "bullets" => Ok(items(&require(&rest[0], vars)?, "bullets")?
            .iter()
            .map(|i| format!("- {i}"))
            .collect::<Vec<_>>()
            .join("\n")),
        "lower" => Ok(display(&require(&rest[0], vars)?).to_lowercase()),
        "upper" => Ok(display(&require(&rest[0], vars)?).to_uppercase()),
        "default" => {
            let fallback = rest.get(1).ok_or(TemplateError::BadArguments {
                helper: "default",
                expected: "a value and a fallback",
            })?;
            let value = resolve(&rest[0], vars);
            if is_blank(value.as_ref()) {
                Ok(display(&require(fallback, vars)?))
            } else {
                Ok(value.as_ref().map(display).unwrap_or_default())
            }
        }
        other => Err(TemplateError::UnknownHelper(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::classify::{ErrorKind, classify};
    use serde_json::json;

    fn render(source: &str, vars: Value) -> Result<String, TemplateError> {
        PromptTemplate::new("test", source).render(&vars)
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("no tags here", json!({})).unwrap(), "no tags here");
    }

    #[test]
    fn variables_and_paths() {
        let out = render(
            "{{ name }} for {{event.guests}} ({{event.kind}})",
            json!({"name": "Paella", "event": {"guests": 8, "kind": "birthday"}}),
        )
        .unwrap();
        assert_eq!(out, "Paella for 8 (birthday)");
    }

    #[test]
    fn lists_render_joined_by_default() {
        let out = render("{{items}}", json!({"items": ["a", "b"]})).unwrap();
        assert_eq!(out, "a, b");
    }

    #[test]
    fn join_and_bullets() {
        let vars = json!({"courses": ["starter", "main", "dessert"]});
        assert_eq!(
            render("{{join courses \" / \"}}", vars.clone()).unwrap(),
            "starter / main / dessert"
        );
        assert_eq!(
            render("{{bullets courses}}", vars).unwrap(),
            "- starter\n- main\n- dessert"
        );
    }

    #[test]
    fn case_helpers() {
        let vars = json!({"cuisine": "Thai"});
        assert_eq!(render("{{lower cuisine}}", vars.clone()).unwrap(), "thai");
        assert_eq!(render("{{upper cuisine}}", vars).unwrap(), "THAI");
    }

    #[test]
    fn default_helper() {
        let template = "{{default cuisine \"any\"}}";
        assert_eq!(render(template, json!({})).unwrap(), "any");
        assert_eq!(render(template, json!({"cuisine": null})).unwrap(), "any");
        assert_eq!(render(template, json!({"cuisine": " "})).unwrap(), "any");
        assert_eq!(render(template, json!({"cuisine": "Thai"})).unwrap(), "Thai");
        assert_eq!(
            render("{{default diet \"none\"}}", json!({"diet": []})).unwrap(),
            "none"
        );
    }

    #[test]
    fn unknown_helper_is_classified() {
        let err = render("{{eq a b}}", json!({"a": 1, "b": 1})).unwrap_err();
        assert_eq!(err, TemplateError::UnknownHelper("eq".into()));

        let classified = classify(&err.to_string());
        assert_eq!(classified.kind, ErrorKind::UnknownTemplateHelper);
        assert_eq!(classified.detail.as_deref(), Some("eq"));
    }

    #[test]
    fn missing_variable() {
        assert_eq!(
            render("{{servings}}", json!({})).unwrap_err(),
            TemplateError::MissingVariable("servings".into())
        );
    }

    #[test]
    fn unclosed_tags() {
        assert!(matches!(
            render("Hello {{name", json!({"name": "x"})),
            Err(TemplateError::Unclosed(_))
        ));
        assert!(matches!(
            render("{{join xs \"oops}}", json!({"xs": []})),
            Err(TemplateError::Unclosed(_))
        ));
    }

    #[test]
    fn empty_tag() {
        assert_eq!(render("{{  }}", json!({})).unwrap_err(), TemplateError::EmptyTag);
    }

    #[test]
    fn objects_are_not_lists() {
        assert!(matches!(
            render("{{bullets o}}", json!({"o": {"k": 1}})),
            Err(TemplateError::BadArguments { helper: "bullets", .. })
        ));
    }
}
