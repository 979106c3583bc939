use std::{
    fs, io,
    path::{Path, PathBuf},
};

use hyper::body::Bytes;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("could not read template {name:?}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("template {0:?} escapes the view directory")]
    InvalidName(String),
    #[error("no template directory is configured")]
    NotConfigured,
    #[error("template error")]
    Template(#[from] liquid::Error),
}

/// Renders Liquid templates from a directory.
pub struct View {
    path: PathBuf,
    parser: liquid::Parser,
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl View {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ViewError> {
        let parser = liquid::ParserBuilder::with_stdlib().build()?;
        Ok(Self {
            path: path.into(),
            parser,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the template file `name` with `context` as its globals.
    ///
    /// `context` must serialize to a map.
    pub fn render<C>(&self, name: &str, context: &C) -> Result<Bytes, ViewError>
    where
        C: Serialize,
    {
        let source = self.read(name)?;
        self.render_str(&source, context)
    }

    /// Render an inline template.
    pub fn render_str<C>(&self, source: &str, context: &C) -> Result<Bytes, ViewError>
    where
        C: Serialize,
    {
        let template = self.parser.parse(source)?;
        let globals = liquid::to_object(context)?;
        let output = template.render(&globals)?;
        Ok(Bytes::from(output))
    }

    fn read(&self, name: &str) -> Result<String, ViewError> {
        let relative = Path::new(name);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes {
            return Err(ViewError::InvalidName(name.to_owned()));
        }

        fs::read_to_string(self.path.join(relative)).map_err(|source| ViewError::Read {
            name: name.to_owned(),
            source,
        })
    }
}
