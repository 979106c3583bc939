// Application settings, loaded from an optional file and `MORTIMER_*`
// environment variables.

use std::{
    net::{AddrParseError, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use ::config::{builder::DefaultState, ConfigBuilder, ConfigError, Environment};
use serde::Deserialize;

use crate::session::{DummyStore, FileStore, MemoryStore, SessionStore};

pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=UTF-8";
pub const DEFAULT_SESSION_COOKIE: &str = "session_id";
pub const DEFAULT_MAX_BODY_SIZE: u64 = 1024 * 64;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub http: HttpSettings,
    pub session: SessionSettings,
    #[serde(default)]
    pub templates: TemplateSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    /// Requests with larger bodies are rejected with `413`.
    pub max_body_size: u64,
    /// `Content-Type` of handler responses unless the handler overrides it.
    pub default_content_type: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    None,
    Memory,
    File,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub store: StoreKind,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TemplateSettings {
    /// Directory of the templates rendered by the application's view.
    pub path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_owned(),
                port: 8080,
            },
            http: HttpSettings {
                max_body_size: DEFAULT_MAX_BODY_SIZE,
                default_content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            },
            session: SessionSettings {
                cookie_name: DEFAULT_SESSION_COOKIE.to_owned(),
                store: StoreKind::None,
                path: PathBuf::from("/tmp/session/"),
            },
            templates: TemplateSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (extension optional, the file may be missing)
    /// with `MORTIMER_` prefixed environment overrides, e.g.
    /// `MORTIMER_SERVER__PORT=3000`.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Self::load(path, Self::environment())
    }

    fn load(path: &str, environment: Environment) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(::config::File::with_name(path).required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    fn environment() -> Environment {
        Environment::with_prefix("MORTIMER")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        ::config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("http.max_body_size", DEFAULT_MAX_BODY_SIZE)?
            .set_default("http.default_content_type", DEFAULT_CONTENT_TYPE)?
            .set_default("session.cookie_name", DEFAULT_SESSION_COOKIE)?
            .set_default("session.store", "none")?
            .set_default("session.path", "/tmp/session/")
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    /// The session store selected by `session.store`.
    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        match self.session.store {
            StoreKind::None => Arc::new(DummyStore),
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::File => Arc::new(FileStore::new(self.session.path.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_without_file() {
        let settings = Settings::load_from("does-not-exist").unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.http.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(settings.http.default_content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(settings.session.cookie_name, "session_id");
        assert_eq!(settings.session.store, StoreKind::None);
        assert_eq!(settings.templates.path, None);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mortimer.toml");
        std::fs::write(
            &file,
            "[server]\nport = 3000\n\n[session]\nstore = \"memory\"\n\n[templates]\npath = \"views\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(file.to_str().unwrap()).unwrap();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.session.store, StoreKind::Memory);
        assert_eq!(settings.templates.path, Some(PathBuf::from("views")));
    }

    #[test]
    fn socket_addr() {
        let settings = Settings::default();
        assert_eq!(
            settings.socket_addr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );

        let mut settings = Settings::default();
        settings.server.host = "localhost".to_owned();
        assert!(settings.socket_addr().is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mortimer.toml");
        std::fs::write(&file, "[server]\nport = 3000\n").unwrap();

        let environment = Settings::environment().source(Some(
            [
                ("MORTIMER_SERVER__PORT", "4000"),
                ("MORTIMER_SESSION__COOKIE_NAME", "sid"),
                ("MORTIMER_SESSION__STORE", "file"),
                ("OTHER_SERVER__PORT", "1"),
            ]
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect(),
        ));

        let settings = Settings::load(file.to_str().unwrap(), environment).unwrap();
        assert_eq!(settings.server.port, 4000);
        assert_eq!(settings.session.cookie_name, "sid");
        assert_eq!(settings.session.store, StoreKind::File);
    }
}
