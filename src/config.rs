use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, info};

use crate::citation::FieldPolicy;

const FILE_NAME: &str = "papers-crawler.toml";

/// Crawl settings, read from TOML. Every field has a default so partial files work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Sent to Entrez as `email` so NCBI can reach the crawler's operator.
    pub contact: Option<String>,
    pub api_key: Option<String>,
    /// Directory holding the `<user>_<index>.xml` documents.
    pub data_dir: PathBuf,
    pub max_results: u32,
    pub timeout_secs: u64,
    pub policy: FieldPolicy,
    /// Tracked users and the name variants they publish under.
    pub users: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        let users = BTreeMap::from([(
            "bjimenez".to_string(),
            vec![
                "jimenez-garcia b".to_string(),
                "jimenez, brian".to_string(),
                "jimenez-garci b".to_string(),
            ],
        )]);
        Config {
            contact: None,
            api_key: None,
            data_dir: PathBuf::from("."),
            max_results: 20,
            timeout_secs: 30,
            policy: FieldPolicy::Strict,
            users,
        }
    }
}

/// One name variant of one tracked user, with its place in the user's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant<'a> {
    pub user: &'a str,
    pub index: usize,
    pub name: &'a str,
}

impl Variant<'_> {
    pub fn file_name(&self) -> String {
        format!("{}_{}.xml", self.user, self.index)
    }
}

impl Config {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("invalid configuration")
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Load `explicit` if given, otherwise the first of `./papers-crawler.toml` and
    /// the platform config file that exists, otherwise the defaults.
    ///
    /// A file that exists but does not parse is an error wherever it was found.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_path(path)?,
            None => Self::discover([Some(PathBuf::from(FILE_NAME)), platform_path()])?,
        };
        if let Ok(key) = std::env::var("NCBI_API_KEY")
            && !key.trim().is_empty()
        {
            config.api_key = Some(key);
        }
        Ok(config)
    }

    fn discover(candidates: impl IntoIterator<Item = Option<PathBuf>>) -> anyhow::Result<Self> {
        for path in candidates.into_iter().flatten() {
            if !path.is_file() {
                continue;
            }
            let config = Self::from_path(&path)?;
            debug!(path = %path.display(), "loaded configuration");
            return Ok(config);
        }
        info!("no configuration file found, tracking the built-in default users");
        Ok(Self::default())
    }

    /// Every user's name variants, users sorted by name and variants in listed order.
    pub fn variants(&self) -> impl Iterator<Item = Variant<'_>> {
        self.users.iter().flat_map(|(user, names)| {
            names.iter().enumerate().map(move |(index, name)| Variant {
                user,
                index,
                name,
            })
        })
    }

    pub fn document_path(&self, variant: &Variant<'_>) -> PathBuf {
        self.data_dir.join(variant.file_name())
    }
}

/// `<config_dir>/papers-crawler/config.toml`.
pub fn platform_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("papers-crawler").join("config.toml"))
}
