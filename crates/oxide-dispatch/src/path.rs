//! Path template compilation, matching and reverse generation.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, RouterError, UriError};
use crate::request::Attributes;

/// Regex bound to a `:name` parameter that has no explicit one.
pub const DEFAULT_PARAM_REGEX: &str = "[^/]+";

/// `{name:regex}`, allowing one level of nested braces inside the regex.
static EXPLICIT_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_]\w*):((?:[^{}]|\{[^{}]*\})*)\}").expect("explicit param regex")
});

/// `:name`
static SHORTHAND_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z_]\w*)").expect("shorthand param regex"));

/// A piece of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parameter name bound to its regex.
#[derive(Debug, Clone)]
pub struct Binding {
    name: String,
    regex: String,
    validator: Regex,
}

impl Binding {
    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Regex the parameter value must match.
    pub fn regex(&self) -> &str {
        &self.regex
    }
}

/// A compiled path template.
///
/// Template syntax:
/// - `/users` - Literal path
/// - `/users/:id` - Parameter matching one or more non-slash characters
/// - `/posts/{id:\d+}-{slug:[a-z]+}` - Parameters with inline regexes
#[derive(Debug, Clone)]
pub struct PathTemplate {
    /// The template with surrounding slashes trimmed.
    template: String,
    segments: Vec<Segment>,
    /// Bound parameters in registration order.
    bindings: Vec<Binding>,
    /// Parameter names in capture-group order.
    keys: Vec<String>,
    matcher: Regex,
}

impl PathTemplate {
    /// Compiles a path template.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_dispatch::PathTemplate;
    ///
    /// let template = PathTemplate::new(r"/post/{id:\d+}-{slug:[a-z]+}").unwrap();
    /// let attributes = template.match_path("/post/1-slug").unwrap();
    /// assert_eq!(attributes.get("id"), Some("1"));
    /// assert_eq!(attributes.get("slug"), Some("slug"));
    /// ```
    pub fn new(template: &str) -> Result<Self> {
        Self::compile(template, Vec::new())
    }

    /// Binds `name` to `regex` and recompiles the template.
    ///
    /// Shorthand `:name` parameters pick up the new regex. A binding made
    /// here takes precedence over an inline `{name:regex}`.
    pub fn with(&self, name: &str, regex: &str) -> Result<Self> {
        let mut bindings: Vec<(String, String)> = self
            .bindings
            .iter()
            .map(|b| (b.name.clone(), b.regex.clone()))
            .collect();
        let regex = non_capturing(regex);
        match bindings.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = regex,
            None => bindings.push((name.to_string(), regex)),
        }
        Self::compile(&self.template, bindings)
    }

    fn compile(template: &str, mut bindings: Vec<(String, String)>) -> Result<Self> {
        let template = template.trim_matches('/').to_string();

        // Pass 1: inline regexes become parameter slots.
        let mut explicit = Vec::new();
        let mut last = 0;
        for caps in EXPLICIT_PARAM.captures_iter(&template) {
            let (Some(whole), Some(name), Some(regex)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            push_literal(&mut explicit, &template[last..whole.start()]);
            bind_if_absent(&mut bindings, name.as_str(), &non_capturing(regex.as_str()));
            explicit.push(Segment::Param(name.as_str().to_string()));
            last = whole.end();
        }
        push_literal(&mut explicit, &template[last..]);

        // Pass 2: remaining `:name` tokens in literal text.
        let mut segments = Vec::new();
        for segment in explicit {
            let Segment::Literal(text) = segment else {
                segments.push(segment);
                continue;
            };
            let mut last = 0;
            for caps in SHORTHAND_PARAM.captures_iter(&text) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                push_literal(&mut segments, &text[last..whole.start()]);
                bind_if_absent(&mut bindings, name.as_str(), DEFAULT_PARAM_REGEX);
                segments.push(Segment::Param(name.as_str().to_string()));
                last = whole.end();
            }
            push_literal(&mut segments, &text[last..]);
        }

        let mut keys: Vec<String> = Vec::new();
        let mut pattern = String::from("(?i)^");
        for segment in &segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Param(name) => {
                    if keys.contains(name) {
                        return Err(RouterError::InvalidPattern(format!(
                            "parameter \"{name}\" appears more than once in \"{template}\""
                        )));
                    }
                    let regex = bindings
                        .iter()
                        .find(|(n, _)| n == name)
                        .map_or(DEFAULT_PARAM_REGEX, |(_, r)| r.as_str());
                    pattern.push('(');
                    pattern.push_str(regex);
                    pattern.push(')');
                    keys.push(name.clone());
                }
            }
        }
        pattern.push('$');

        let matcher = Regex::new(&pattern)
            .map_err(|e| RouterError::InvalidPattern(format!("\"{template}\": {e}")))?;
        let bindings = bindings
            .into_iter()
            .map(|(name, regex)| {
                let validator = Regex::new(&format!("(?i)^(?:{regex})$")).map_err(|e| {
                    RouterError::InvalidPattern(format!("parameter \"{name}\": {e}"))
                })?;
                Ok(Binding {
                    name,
                    regex,
                    validator,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            template,
            segments,
            bindings,
            keys,
            matcher,
        })
    }

    /// Attempts to match a path against this template.
    ///
    /// Returns the extracted attributes if the path matches.
    pub fn match_path(&self, path: &str) -> Option<Attributes> {
        let caps = self.matcher.captures(path.trim_matches('/'))?;
        Some(
            self.keys
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    let value = caps.get(i + 1).map_or("", |m| m.as_str());
                    (key.clone(), value.to_string())
                })
                .collect(),
        )
    }

    /// Generates a path from parameters.
    ///
    /// Every bound parameter must be supplied and match its regex. Pairs
    /// that are not path parameters become the query string.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_dispatch::PathTemplate;
    ///
    /// let template = PathTemplate::new("/posts/:id").unwrap();
    /// let path = template.generate([("id", "123"), ("page", "2")], None).unwrap();
    /// assert_eq!(path, "/posts/123?page=2");
    /// ```
    pub fn generate<I, K, V>(&self, params: I, fragment: Option<&str>) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let mut supplied: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();

        let mut values: HashMap<&str, String> = HashMap::new();
        for binding in &self.bindings {
            let position = supplied
                .iter()
                .position(|(k, _)| *k == binding.name)
                .ok_or_else(|| UriError::Missing {
                    parameter: binding.name.clone(),
                })?;
            let (_, value) = supplied.remove(position);
            if !binding.validator.is_match(&value) {
                return Err(UriError::Mismatch {
                    parameter: binding.name.clone(),
                    value,
                    regex: binding.regex.clone(),
                }
                .into());
            }
            values.insert(binding.name.as_str(), value);
        }

        let mut path = String::from("/");
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Param(name) => {
                    path.push_str(values.get(name.as_str()).map_or("", String::as_str));
                }
            }
        }

        if !supplied.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(supplied.iter())
                .finish();
            path.push('?');
            path.push_str(&query);
        }
        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
            path.push('#');
            path.push_str(fragment);
        }

        Ok(path)
    }

    /// Returns the template with surrounding slashes trimmed.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the parameter names in capture-group order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns the bound parameters in registration order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Returns the regex bound to `name`.
    pub fn binding(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(Binding::regex)
    }

    /// Returns the compiled matcher source.
    pub fn matcher(&self) -> &str {
        self.matcher.as_str()
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
}

fn bind_if_absent(bindings: &mut Vec<(String, String)>, name: &str, regex: &str) {
    if !bindings.iter().any(|(n, _)| n == name) {
        bindings.push((name.to_string(), regex.to_string()));
    }
}

/// Rewrites capturing groups, named ones included, as non-capturing.
fn non_capturing(regex: &str) -> String {
    let mut out = String::with_capacity(regex.len() + 8);
    let mut escaped = false;
    let mut class_depth = 0_usize;
    let mut rest = regex;
    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => {
                class_depth += 1;
                out.push(c);
                // A `]` right after `[` or `[^` is a literal.
                if let Some(after) = rest.strip_prefix('^') {
                    out.push('^');
                    rest = after;
                }
                if let Some(after) = rest.strip_prefix(']') {
                    out.push(']');
                    rest = after;
                }
                continue;
            }
            ']' if class_depth > 0 => class_depth -= 1,
            '(' if class_depth == 0 => {
                let named = rest.strip_prefix("?P<").or_else(|| rest.strip_prefix("?<"));
                if let Some(end) = named.and_then(|n| n.find('>').map(|i| &n[i + 1..])) {
                    out.push_str("(?:");
                    rest = end;
                    continue;
                }
                if !rest.starts_with('?') {
                    out.push_str("(?:");
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
    }
    out
}
