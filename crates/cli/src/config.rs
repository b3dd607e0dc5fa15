//! Service configuration for `andor serve`.
//!
//! ```toml
//! [service]
//! host = "127.0.0.1"
//! port = 8000
//! collections = ["articles", "reviews"]
//! model = "articles.toml"
//! users = "users.toml"
//! store_dir = "data"        # data/<collection>/; omit for in-memory stores
//! htdocs = "htdocs"         # static files served for unmatched paths
//! cors_origin = "*"
//! tls_cert = "cert.pem"     # both or neither; needs the `tls` feature
//! tls_key = "key.pem"
//! ```
//!
//! Relative paths are resolved against the directory holding the config
//! file. Every collection shares the model, the users and the one mutation
//! token.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ServiceConfigError {
    #[error("could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("collection name '{0}' must be a single non-empty path segment")]
    InvalidCollection(String),

    #[error("no collections configured")]
    NoCollections,

    #[error("collection '{0}' is configured more than once")]
    DuplicateCollection(String),

    #[error("tls_cert and tls_key must both be set or both be omitted")]
    IncompleteTls,

    #[error("cors_origin '{0}' is not a valid header value")]
    InvalidCorsOrigin(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    service: ServiceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServiceConfig {
    #[serde(default = "default_host")]
    pub(crate) host: String,
    #[serde(default = "default_port")]
    pub(crate) port: u16,
    pub(crate) collections: Vec<String>,
    pub(crate) model: PathBuf,
    pub(crate) users: PathBuf,
    #[serde(default)]
    pub(crate) store_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) htdocs: Option<PathBuf>,
    #[serde(default)]
    pub(crate) cors_origin: Option<String>,
    #[serde(default)]
    pub(crate) tls_cert: Option<PathBuf>,
    #[serde(default)]
    pub(crate) tls_key: Option<PathBuf>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ServiceConfig {
    pub(crate) fn load(path: &Path) -> Result<Self, ServiceConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ServiceConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            toml::from_str(&content).map_err(|source| ServiceConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let config = file.service.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(mut self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.model = join(self.model);
        self.users = join(self.users);
        self.store_dir = self.store_dir.map(join);
        self.htdocs = self.htdocs.map(join);
        self.tls_cert = self.tls_cert.map(join);
        self.tls_key = self.tls_key.map(join);
        self
    }

    fn validate(&self) -> Result<(), ServiceConfigError> {
        if self.collections.is_empty() {
            return Err(ServiceConfigError::NoCollections);
        }
        let mut seen = BTreeSet::new();
        for c in &self.collections {
            if c.is_empty() || c.contains(['/', '{', '}']) || c.trim() != c || c == "health" {
                return Err(ServiceConfigError::InvalidCollection(c.clone()));
            }
            if !seen.insert(c.as_str()) {
                return Err(ServiceConfigError::DuplicateCollection(c.clone()));
            }
        }
        if self.tls_cert.is_some() != self.tls_key.is_some() {
            return Err(ServiceConfigError::IncompleteTls);
        }
        Ok(())
    }

    pub(crate) fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Directory holding `collection`'s documents, if stored on disk.
    pub(crate) fn store_dir_for(&self, collection: &str) -> Option<PathBuf> {
        self.store_dir.as_ref().map(|dir| dir.join(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("andor.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_with_defaults_and_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[service]
collections = ["articles", "reviews"]
model = "articles.toml"
users = "/etc/andor/users.toml"
store_dir = "data"
"#,
        );
        let c = ServiceConfig::load(&path).unwrap();
        assert_eq!(c.bind_addr(), "127.0.0.1:8000");
        assert_eq!(c.model, dir.path().join("articles.toml"));
        assert_eq!(c.users, PathBuf::from("/etc/andor/users.toml"));
        assert_eq!(c.store_dir, Some(dir.path().join("data")));
        assert_eq!(
            c.store_dir_for("reviews"),
            Some(dir.path().join("data").join("reviews"))
        );
        assert!(c.htdocs.is_none());
    }

    #[test]
    fn rejects_bad_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[service]\ncollections = [\"a/b\"]\nmodel = \"m.toml\"\nusers = \"u.toml\"\n",
        );
        assert!(matches!(
            ServiceConfig::load(&path),
            Err(ServiceConfigError::InvalidCollection(_))
        ));
    }

    #[test]
    fn rejects_empty_or_repeated_collections() {
        let dir = tempfile::tempdir().unwrap();
        for (list, expected) in [
            ("[]", "no collections"),
            ("[\"a\", \"a\"]", "more than once"),
            ("[\"health\"]", "single non-empty path segment"),
        ] {
            let path = write_config(
                dir.path(),
                &format!(
                    "[service]\ncollections = {list}\nmodel = \"m.toml\"\nusers = \"u.toml\"\n"
                ),
            );
            let err = ServiceConfig::load(&path).unwrap_err();
            assert!(err.to_string().contains(expected), "{list}: {err}");
        }
    }

    #[test]
    fn rejects_half_tls() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[service]\ncollections = [\"a\"]\nmodel = \"m.toml\"\nusers = \"u.toml\"\ntls_cert = \"c.pem\"\n",
        );
        assert!(matches!(
            ServiceConfig::load(&path),
            Err(ServiceConfigError::IncompleteTls)
        ));
    }

    #[test]
    fn rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[service]\ncollections = [\"a\"]\nmodel = \"m.toml\"\nusers = \"u.toml\"\nrate_limit = 5\n",
        );
        assert!(matches!(
            ServiceConfig::load(&path),
            Err(ServiceConfigError::Parse { .. })
        ));
    }
}
