//! Reading repositories and sync directives from `pacman.conf`.
//!
//! Only two things are extracted:
//!
//! - **Repositories**: every `[section]` header except `[options]`, in the
//!   order they first appear (pacman's own repository priority order). As
//!   with pacman, a header may be followed by a `#` comment.
//! - **The sync list**: repository names from comment directives of the form
//!   `#PacfsSync = core extra multilib`. Being a comment, the directive is
//!   invisible to pacman itself. It may appear anywhere and any number of
//!   times; names may be separated by whitespace or commas.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Section reserved for pacman's global options.
pub const RESERVED_SECTION: &str = "options";

regex!(SECTION_REGEX, r"^\s*\[\s*([^\]]*?)\s*\]\s*(?:#.*)?$");
regex!(DIRECTIVE_REGEX, r"^\s*#\s*PacfsSync\s*=(.*)$");

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PacmanConf {
    repositories: Vec<String>,
    sync: Vec<String>,
}

impl PacmanConf {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).or_raise(|| ErrorKind::PacmanConf)?;
        let conf = Self::parse(&text);
        tracing::debug!(
            path = %path.display(),
            repositories = conf.repositories.len(),
            sync = conf.sync.len(),
            "Read pacman configuration"
        );
        Ok(conf)
    }

    pub fn parse(text: &str) -> Self {
        let mut conf = Self::default();
        for line in text.lines() {
            if let Some(captures) = SECTION_REGEX.captures(line) {
                let name = &captures[1];
                if !name.is_empty() && name != RESERVED_SECTION && !conf.repositories.iter().any(|r| r == name) {
                    conf.repositories.push(name.to_string());
                }
            } else if let Some(captures) = DIRECTIVE_REGEX.captures(line) {
                for name in captures[1].split(|c: char| c.is_whitespace() || c == ',').filter(|n| !n.is_empty()) {
                    if !conf.sync.iter().any(|s| s == name) {
                        conf.sync.push(name.to_string());
                    }
                }
            }
        }
        conf
    }

    /// Repository sections, in configuration order.
    pub fn repositories(&self) -> &[String] {
        &self.repositories
    }

    /// Repository names marked for sync, in directive order.
    pub fn sync_list(&self) -> &[String] {
        &self.sync
    }

    /// Repositories to refresh: configured repositories that are also in the
    /// sync list, in configuration order.
    ///
    /// Sync list entries without a matching section are reported and
    /// ignored; pacman doesn't know about them, so neither do we.
    pub fn tracked(&self) -> Vec<&str> {
        for name in self.sync.iter().filter(|s| !self.repositories.contains(s)) {
            tracing::warn!(repository = %name, "Repository marked for sync is not configured in pacman.conf; ignoring");
        }
        self.repositories.iter().filter(|r| self.sync.contains(r)).map(String::as_str).collect()
    }
}
