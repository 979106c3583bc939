mod handler;

use std::{collections::HashMap, fmt, sync::Arc};

use regex::Regex;

pub use self::handler::{HandlerResult, RequestHandler};

/// A URI pattern and the handler serving requests that match it.
///
/// Patterns are regular expressions anchored at the start of the path only,
/// so `^` is implied while `$` has to be spelled out.
pub struct Route {
    pattern: String,
    regex: Regex,
    pub(crate) handler: Arc<dyn RequestHandler>,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)?;
        f.write_str(" { handler: ... }")
    }
}

impl Route {
    pub fn new(pattern: &str, handler: Arc<dyn RequestHandler>) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        Ok(Self {
            pattern: pattern.to_owned(),
            regex,
            handler,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &Arc<dyn RequestHandler> {
        &self.handler
    }

    /// Match `path` and collect the capture groups.
    pub fn matches(&self, path: &str) -> Option<Args> {
        let captures = self.regex.captures(path)?;

        let positional = captures
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_owned()))
            .collect();
        let named = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_owned(), m.as_str().to_owned()))
            })
            .collect();

        Some(Args { positional, named })
    }
}

/// Capture groups of a matched route.
///
/// Groups that did not take part in the match are `None`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Args {
    positional: Vec<Option<String>>,
    named: HashMap<String, String>,
}

impl Args {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.positional.get(index)?.as_deref()
    }

    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        self.positional.iter().map(Option::as_deref)
    }
}
