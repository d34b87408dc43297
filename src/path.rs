//! Path template handling.
//!
//! Route templates may constrain a named segment with a pattern, as in
//! `/users/{id:[0-9]+}`. Swagger has no syntax for that inside a path, so the
//! pattern is moved out of the template and attached to the path parameter.

use crate::error::{BuildError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Placeholder substituted by [`format_template`]
pub const TEMPLATE_PLACEHOLDER: &str = "%s";

/// Strip pattern constraints from named segments.
///
/// `/api/v1/{name:[a-z]+}/x` becomes `/api/v1/{name}/x` and the returned map
/// holds `name -> [a-z]+`. Empty segments are dropped, so the result always
/// starts with a single `/`.
pub fn sanitize_path(template: &str) -> (String, HashMap<String, String>) {
    let mut sanitized = String::new();
    let mut patterns = HashMap::new();

    for fragment in template.split('/') {
        if fragment.is_empty() {
            continue;
        }
        sanitized.push('/');
        match fragment
            .strip_prefix('{')
            .and_then(|inner| inner.split_once(':'))
        {
            Some((name, rest)) => {
                let pattern = rest.strip_suffix('}').unwrap_or(rest);
                patterns.insert(name.to_string(), pattern.to_string());
                sanitized.push('{');
                sanitized.push_str(name);
                sanitized.push('}');
            }
            None => sanitized.push_str(fragment),
        }
    }

    if sanitized.is_empty() {
        sanitized.push('/');
    }
    (sanitized, patterns)
}

/// Join a service root with a route sub-path using exactly one separator
pub fn concat_path(root: &str, sub_path: &str) -> String {
    format!(
        "{}/{}",
        root.trim_end_matches('/'),
        sub_path.trim_start_matches('/')
    )
}

/// Check that every `{` in a template is closed.
///
/// Braces may nest inside a segment pattern (`{id:[0-9]{3}}`), but they must
/// balance within the segment.
pub fn validate_template(template: &str) -> Result<()> {
    for fragment in template.split('/') {
        let mut depth = 0usize;
        for c in fragment.chars() {
            match c {
                '{' => depth += 1,
                '}' => {
                    if depth == 0 {
                        return Err(malformed(template, "unexpected '}'"));
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        if depth > 0 {
            return Err(malformed(template, "unclosed '{'"));
        }
    }
    Ok(())
}

/// Substitute each `%s` placeholder of a template with the next token
pub fn format_template(template: &str, tokens: &[String]) -> Result<String> {
    let placeholders = template.matches(TEMPLATE_PLACEHOLDER).count();
    if placeholders != tokens.len() {
        return Err(malformed(
            template,
            &format!(
                "{} placeholders for {} parameters",
                placeholders,
                tokens.len()
            ),
        ));
    }
    let mut formatted = template.to_string();
    for token in tokens {
        formatted = formatted.replacen(TEMPLATE_PLACEHOLDER, token, 1);
    }
    Ok(formatted)
}

/// Remove markup tags from a snippet, keeping entities.
///
/// `<b>&lt;Hi!&gt;</b> <br>` becomes `&lt;Hi!&gt; `.
pub fn strip_tags(html: &str) -> String {
    MARKUP_TAG.replace_all(html, "").into_owned()
}

fn malformed(path: &str, reason: &str) -> BuildError {
    BuildError::MalformedPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain_path() {
        let (path, patterns) = sanitize_path("/tests/a/b");
        assert_eq!(path, "/tests/a/b");
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_sanitize_extracts_patterns() {
        let (path, patterns) = sanitize_path("/tests/{v}/a/{b}/{c:[a-z]+}/{d:[1-9]+}/e");
        assert_eq!(path, "/tests/{v}/a/{b}/{c}/{d}/e");
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns["c"], "[a-z]+");
        assert_eq!(patterns["d"], "[1-9]+");
        assert!(!patterns.contains_key("v"));
    }

    #[test]
    fn test_sanitize_keeps_colons_and_braces_inside_pattern() {
        let (path, patterns) = sanitize_path("/t/{at:[0-9]{2}:[0-9]{2}}");
        assert_eq!(path, "/t/{at}");
        assert_eq!(patterns["at"], "[0-9]{2}:[0-9]{2}");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let (once, _) = sanitize_path("//users//{id:[0-9]+}/");
        let (twice, patterns) = sanitize_path(&once);
        assert_eq!(once, "/users/{id}");
        assert_eq!(once, twice);
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_sanitize_root() {
        assert_eq!(sanitize_path("").0, "/");
        assert_eq!(sanitize_path("/").0, "/");
    }

    #[test]
    fn test_concat_path_trims_duplicate_separators() {
        assert_eq!(concat_path("/users/", "/{id}"), "/users/{id}");
        assert_eq!(concat_path("/users", "{id}"), "/users/{id}");
        assert_eq!(concat_path("/", "/"), "/");
        assert_eq!(concat_path("/users", ""), "/users/");
    }

    #[test]
    fn test_validate_template() {
        assert!(validate_template("/a/{b}/{c:[0-9]{3}}").is_ok());
        assert!(matches!(
            validate_template("/a/{b"),
            Err(BuildError::MalformedPath { .. })
        ));
        assert!(matches!(
            validate_template("/a/b}"),
            Err(BuildError::MalformedPath { .. })
        ));
    }

    #[test]
    fn test_format_template() {
        let formatted =
            format_template("/{%s}/x/{%s}", &["id".to_string(), "n:[a-z]+".to_string()])
                .unwrap();
        assert_eq!(formatted, "/{id}/x/{n:[a-z]+}");
        assert!(format_template("/{%s}", &[]).is_err());
    }

    #[test]
    fn test_strip_tags_keeps_entities() {
        assert_eq!(strip_tags("<b>&lt;Hi!&gt;</b> <br>"), "&lt;Hi!&gt; ");
        assert_eq!(
            strip_tags("get the <strong>a</strong> <em>b</em> test"),
            "get the a b test"
        );
    }
}
