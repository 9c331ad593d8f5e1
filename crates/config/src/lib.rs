//! Configuration loading.
//!
//! Every value is fixed at deployment time. The [`Config`] record is built
//! once at startup by layering, in increasing order of precedence:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. a TOML file ([`DEFAULT_CONFIG_PATH`] unless another path is given),
//! 3. environment variables prefixed with `PACFS_` (e.g. `PACFS_DB_DIR`).
//!
//! The record is then passed by reference into everything that needs it;
//! there is no ambient global configuration.

pub mod error;

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file read when no explicit path is given. It's fine for this
/// file to be missing.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pacfs/config.toml";
/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "PACFS_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// pacman's package cache directory.
    pub cache_dir: PathBuf,
    /// pacman's sync database directory (holds `<repo>.db`).
    pub db_dir: PathBuf,
    /// pacman's configuration file, read for repository sections and sync
    /// directives.
    pub pacman_conf: PathBuf,
    /// Lock marker held while cache and database files are mutated.
    pub lock_file: PathBuf,
    /// Where the content store's mutable namespace is mounted.
    pub mount_root: PathBuf,
    /// Account the content store daemon runs as; publishing happens as this
    /// user.
    #[serde(deserialize_with = "scalar_string")]
    pub service_user: String,
    /// Domain of the package mirror inside the store namespace.
    #[serde(deserialize_with = "scalar_string")]
    pub domain: String,
    #[serde(deserialize_with = "scalar_string")]
    pub distribution: String,
    #[serde(deserialize_with = "scalar_string")]
    pub architecture: String,
    #[serde(deserialize_with = "scalar_string")]
    pub repository_set: String,
    /// Process name of the content store daemon.
    #[serde(deserialize_with = "scalar_string")]
    pub daemon_process: String,
    /// Content store command line client, looked up on `PATH`.
    #[serde(deserialize_with = "scalar_string")]
    pub store_binary: String,
}

/// Deserialize a string, also accepting integers and booleans as written.
///
/// Environment variables are parsed before they reach serde, so
/// `PACFS_REPOSITORY_SET=2024` arrives as a number; the same goes for an
/// unquoted `architecture = 64` in the TOML file.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Unsigned(u64),
        Signed(i64),
        Bool(bool),
    }
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::String(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("/var/cache/pacman/pkg"),
            db_dir: PathBuf::from("/var/lib/pacman/sync"),
            pacman_conf: PathBuf::from("/etc/pacman.conf"),
            lock_file: PathBuf::from("/var/lib/pacman/db.lck"),
            mount_root: PathBuf::from("/ipns"),
            service_user: "ipfs".to_string(),
            domain: "pacman.store".to_string(),
            distribution: "arch".to_string(),
            architecture: "x86_64".to_string(),
            repository_set: "default".to_string(),
            daemon_process: "ipfs".to_string(),
            store_binary: "ipfs".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// When `path` is `None` the [default path](DEFAULT_CONFIG_PATH) is used
    /// if it exists. An explicit `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => path,
            None => Path::new(DEFAULT_CONFIG_PATH),
        };
        tracing::debug!(path = %file.display(), "Loading configuration");
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        Ok(config)
    }

    /// The first required value (in [`Field`] order) that is empty, if any.
    pub fn first_empty(&self) -> Option<Field> {
        Field::ALL.into_iter().find(|field| self.value(*field).is_empty())
    }

    fn value(&self, field: Field) -> &str {
        // Non-UTF-8 paths aren't empty, which is all that matters here.
        fn path(p: &Path) -> &str {
            p.to_str().unwrap_or("?").trim()
        }
        match field {
            Field::CacheDir => path(&self.cache_dir),
            Field::DbDir => path(&self.db_dir),
            Field::PacmanConf => path(&self.pacman_conf),
            Field::LockFile => path(&self.lock_file),
            Field::MountRoot => path(&self.mount_root),
            Field::ServiceUser => self.service_user.trim(),
            Field::Domain => self.domain.trim(),
            Field::Distribution => self.distribution.trim(),
            Field::Architecture => self.architecture.trim(),
            Field::RepositorySet => self.repository_set.trim(),
        }
    }

    /// Directory on the store mount that holds the published `<repo>.db`
    /// files: `<mount_root>/pkg.<domain>/<distribution>/<architecture>/<repository_set>/db`.
    pub fn remote_db_dir(&self) -> PathBuf {
        self.mount_root
            .join(format!("pkg.{}", self.domain))
            .join(&self.distribution)
            .join(&self.architecture)
            .join(&self.repository_set)
            .join("db")
    }
}

/// A configuration value that must not be empty.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    #[display("cache_dir")]
    CacheDir,
    #[display("db_dir")]
    DbDir,
    #[display("pacman_conf")]
    PacmanConf,
    #[display("lock_file")]
    LockFile,
    #[display("mount_root")]
    MountRoot,
    #[display("service_user")]
    ServiceUser,
    #[display("domain")]
    Domain,
    #[display("distribution")]
    Distribution,
    #[display("architecture")]
    Architecture,
    #[display("repository_set")]
    RepositorySet,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Self::CacheDir,
        Self::DbDir,
        Self::PacmanConf,
        Self::LockFile,
        Self::MountRoot,
        Self::ServiceUser,
        Self::Domain,
        Self::Distribution,
        Self::Architecture,
        Self::RepositorySet,
    ];

    /// Process exit status used when this value is empty.
    ///
    /// The three segments of the remote database path share one status.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::CacheDir => 10,
            Self::DbDir => 11,
            Self::PacmanConf => 12,
            Self::LockFile => 13,
            Self::MountRoot => 14,
            Self::ServiceUser => 15,
            Self::Domain => 16,
            Self::Distribution | Self::Architecture | Self::RepositorySet => 17,
        }
    }
}
