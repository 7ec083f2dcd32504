//! The sos configuration file
//!
//! `config.toml` lives in `$SOS_CONFIG_DIR` when set, otherwise in the
//! platform config directory (`~/.config/sos` on Linux). It names the
//! endpoints (aliases) commands may connect to and a few defaults.
//!
//! Bumping `SCHEMA_VERSION` needs a migration for older files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: u32 = 1;

/// Overrides the directory holding `config.toml`
pub const CONFIG_DIR_ENV: &str = "SOS_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub schema_version: u32,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub aliases: Vec<Alias>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            aliases: Vec::new(),
        }
    }
}

/// `[defaults]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// "human" or "json"
    #[serde(default = "Defaults::output")]
    pub output: String,

    /// Alias used when `--alias` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Keys per listing page; the backend decides when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
}

impl Defaults {
    fn output() -> String {
        "human".into()
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: Self::output(),
            alias: None,
            page_size: None,
        }
    }
}

impl Config {
    /// Pick the alias to connect with.
    ///
    /// An explicit name wins, then `defaults.alias`. With neither, a config
    /// holding exactly one alias uses it.
    pub fn alias(&self, name: Option<&str>) -> Result<&Alias> {
        if let Some(name) = name.or(self.defaults.alias.as_deref()) {
            return self
                .aliases
                .iter()
                .find(|alias| alias.name == name)
                .ok_or_else(|| Error::AliasNotFound(name.to_string()));
        }

        match self.aliases.as_slice() {
            [only] => Ok(only),
            [] => Err(Error::Config("No alias configured".into())),
            _ => Err(Error::Config(
                "Several aliases configured; pass --alias or set defaults.alias".into(),
            )),
        }
    }
}

/// An `[[aliases]]` entry: one S3-compatible endpoint and its keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,

    #[serde(default = "Alias::default_region")]
    pub region: String,

    /// "auto", "path" or "dns"
    #[serde(default = "Alias::default_lookup")]
    pub bucket_lookup: String,
}

impl Alias {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: Self::default_region(),
            bucket_lookup: Self::default_lookup(),
        }
    }

    fn default_region() -> String {
        "us-east-1".into()
    }

    fn default_lookup() -> String {
        "auto".into()
    }

    /// Reject endpoints a client cannot be built from
    pub fn validate(&self) -> Result<()> {
        let endpoint = url::Url::parse(&self.endpoint)?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Alias '{}': endpoint must use http or https, got '{}'",
                self.name,
                endpoint.scheme()
            )));
        }

        match self.bucket_lookup.as_str() {
            "auto" | "path" | "dns" => Ok(()),
            other => Err(Error::Config(format!(
                "Alias '{}': unknown bucket_lookup '{other}' (auto, path or dns)",
                self.name
            ))),
        }
    }

    /// Buckets go in the URL path unless virtual-host lookup is forced
    pub fn path_style(&self) -> bool {
        self.bucket_lookup != "dns"
    }
}

/// Reads and writes one config file
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Locate `config.toml` from the environment
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .map(|dir| dir.join("sos"))
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?,
        };
        Ok(Self::with_path(dir.join(CONFIG_FILE)))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// Read the file; a missing file is an empty default config
    pub fn load(&self) -> Result<Config> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e.into()),
        };

        let mut config: Config = toml::from_str(&text)?;
        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "{} uses schema version {}, newer than supported version {SCHEMA_VERSION}. Please upgrade sos.",
                self.path.display(),
                config.schema_version
            )));
        }
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }

    /// Write the file, creating its directory; owner-only permissions on unix
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, toml::to_string_pretty(config)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (ConfigManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("nested").join(CONFIG_FILE));
        (manager, dir)
    }

    fn config_with(names: &[&str]) -> Config {
        Config {
            aliases: names
                .iter()
                .map(|n| Alias::new(*n, "https://sos-ch-gva-2.exo.io", "key", "secret"))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_file_is_default() {
        let (manager, _dir) = manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.defaults.output, "human");
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let (manager, _dir) = manager();

        let mut config = config_with(&["gva"]);
        config.defaults.page_size = Some(500);
        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded.aliases[0].name, "gva");
        assert_eq!(loaded.aliases[0].region, "us-east-1");
        assert_eq!(loaded.defaults.page_size, Some(500));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (manager, _dir) = manager();
        manager.save(&Config::default()).unwrap();
        let mode = std::fs::metadata(manager.config_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_handwritten_file() {
        let (manager, _dir) = manager();
        std::fs::create_dir_all(manager.config_path().parent().unwrap()).unwrap();
        std::fs::write(
            manager.config_path(),
            r#"
            schema_version = 1

            [defaults]
            output = "json"

            [[aliases]]
            name = "zrh"
            endpoint = "https://sos-ch-dk-2.exo.io"
            access_key = "EXO123"
            secret_key = "s3cr3t"
            bucket_lookup = "path"
            "#,
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.defaults.output, "json");
        let alias = config.alias(None).unwrap();
        assert_eq!(alias.name, "zrh");
        assert!(alias.path_style());
        assert!(alias.validate().is_ok());
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let (manager, _dir) = manager();
        std::fs::create_dir_all(manager.config_path().parent().unwrap()).unwrap();
        std::fs::write(
            manager.config_path(),
            format!("schema_version = {}\n", SCHEMA_VERSION + 1),
        )
        .unwrap();

        let err = manager.load().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("Please upgrade sos"));
    }

    #[test]
    fn test_alias_selection() {
        let mut config = config_with(&["gva", "zrh"]);
        assert_eq!(config.alias(Some("zrh")).unwrap().name, "zrh");
        assert!(matches!(
            config.alias(Some("nope")),
            Err(Error::AliasNotFound(_))
        ));
        assert!(matches!(config.alias(None), Err(Error::Config(_))));

        config.defaults.alias = Some("gva".into());
        assert_eq!(config.alias(None).unwrap().name, "gva");

        assert!(matches!(config_with(&[]).alias(None), Err(Error::Config(_))));
    }

    #[test]
    fn test_alias_validation() {
        let alias = Alias::new("bad", "not a url", "k", "s");
        assert!(matches!(alias.validate(), Err(Error::InvalidUrl(_))));

        let alias = Alias::new("ftp", "ftp://example.com", "k", "s");
        assert!(matches!(alias.validate(), Err(Error::Config(_))));

        let mut alias = Alias::new("dns", "https://example.com", "k", "s");
        alias.bucket_lookup = "dns".into();
        assert!(alias.validate().is_ok());
        assert!(!alias.path_style());

        alias.bucket_lookup = "virtual".into();
        assert!(matches!(alias.validate(), Err(Error::Config(_))));
    }
}
