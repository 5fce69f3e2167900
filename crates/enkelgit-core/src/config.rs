//! Repository configuration.
//!
//! The `config` file is INI-like: `[core]` carries the bareness flag and
//! each `[remote "<name>"]` section carries that remote's filesystem url.
//! Unknown sections and keys are ignored on read and not preserved.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::EnkelResult;
use crate::fsutil::replace_file;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// True for a repository with no working copy.
    pub bare: bool,
    /// Named remotes: name -> filesystem path.
    pub remotes: BTreeMap<String, String>,
}

impl Config {
    pub fn new(bare: bool) -> Self {
        Self {
            bare,
            remotes: BTreeMap::new(),
        }
    }

    /// Load from a config file. A missing file is a default config.
    pub fn load(path: &Path) -> EnkelResult<Config> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(_) => Ok(Config::default()),
        }
    }

    /// Save to a config file.
    pub fn save(&self, path: &Path) -> EnkelResult<()> {
        replace_file(path, self.serialize().as_bytes())
    }

    /// Parse INI-like config text.
    pub fn parse(content: &str) -> Config {
        let mut config = Config::default();
        // (section, optional subsection), e.g. ("remote", Some("origin"))
        let mut section: (String, Option<String>) = (String::new(), None);

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(inner) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let inner = inner.trim();
                section = match inner.split_once(' ') {
                    Some((name, sub)) => (
                        name.to_string(),
                        Some(sub.trim().trim_matches('"').to_string()),
                    ),
                    None => (inner.to_string(), None),
                };
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match (section.0.as_str(), &section.1, key) {
                ("core", None, "bare") => config.bare = value == "true",
                ("remote", Some(name), "url") => {
                    config.remotes.insert(name.clone(), value.to_string());
                }
                _ => {}
            }
        }
        config
    }

    /// Render back into INI-like text.
    pub fn serialize(&self) -> String {
        let mut out = format!("[core]\n  bare = {}\n", self.bare);
        for (name, url) in &self.remotes {
            out.push_str(&format!("[remote \"{name}\"]\n  url = {url}\n"));
        }
        out
    }
}
