//! Parsers for query strings, urlencoded bodies, cookie headers and MIME
//! header blocks.
use std::collections::HashMap;

use percent_encoding::percent_decode_str;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FormError {
    #[error("multipart content type is missing its boundary")]
    MissingBoundary,
}

/// Form fields by name. A name may carry several values, kept in submission
/// order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    /// Replace every value of `name` with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), vec![value.into()]);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Splits `pair` on `=` only when it yields exactly a key and a value.
fn key_value(pair: &str) -> Option<(&str, &str)> {
    let mut parts = pair.split('=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(value), None) => Some((key, value)),
        _ => None,
    }
}

/// Parse a query string. Values are percent-decoded, keys are kept verbatim
/// and a repeated key keeps its last value.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(key_value)
        .map(|(key, value)| (key.to_owned(), decode(value)))
        .collect()
}

/// Parse an `application/x-www-form-urlencoded` body.
pub fn parse_urlencoded(body: &str) -> FormData {
    let mut form = FormData::new();
    for (key, value) in body.split('&').filter_map(key_value) {
        let key = decode(&key.replace('+', " "));
        let value = decode(&value.replace('+', " "));
        form.append(key, value);
    }
    form
}

/// Parse the value of a `Cookie` request header.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split("; ")
        .filter_map(key_value)
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !matches!(b, b':' | b' '))
}

/// Parse a block of MIME headers into a map keyed by lowercase header name.
///
/// Folded continuation lines are appended to the previous header. Repeated
/// headers are merged into one comma separated value.
pub fn parse_headers(block: &str) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = HashMap::new();
    let mut last: Option<String> = None;

    for line in block.lines() {
        if line.starts_with([' ', '\t']) {
            if let Some(value) = last.as_ref().and_then(|name| headers.get_mut(name)) {
                value.push_str(line);
            }
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !is_token(name) {
            continue;
        }
        let name = name.to_ascii_lowercase();
        let value = value.trim_start();

        match headers.get_mut(&name) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => {
                headers.insert(name.clone(), value.to_owned());
            }
        }
        last = Some(name);
    }

    headers
}

/// Parse the `;` separated fields of a header value such as
/// `form-data; name="upload"; filename="a.txt"`.
///
/// Bare items map to `None`. Quotes around values are stripped.
pub fn parse_header_fields(header: &str) -> HashMap<String, Option<String>> {
    header
        .split(';')
        .map(|item| match item.split_once('=') {
            Some((key, value)) => (
                key.trim().to_owned(),
                Some(value.trim().trim_matches('"').to_owned()),
            ),
            None => (item.trim().to_owned(), None),
        })
        .collect()
}
