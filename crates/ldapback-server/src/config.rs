//! Backend configuration.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use ldapback_core::DirectoryLayout;
use ldapback_proto::SearchScope;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default base DN when neither a config file nor `--base-dn` supplies one.
pub const DEFAULT_BASE_DN: &str = "dc=example,dc=com";

/// Default filter for CLI searches.
pub const DEFAULT_SEARCH_FILTER: &str = "(objectClass=*)";

/// Where identity and group records come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Datastore {
    /// Built-in fixture records.
    #[default]
    Stub,
    /// A JSON document loaded into memory.
    File {
        /// Path to the document.
        path: PathBuf,
    },
    /// A sled database.
    Sled {
        /// Database directory.
        path: PathBuf,
    },
}

/// Backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Naming layout of the tree.
    #[serde(flatten)]
    pub layout: DirectoryLayout,

    /// Record source.
    #[serde(default)]
    pub datastore: Datastore,
}

impl BackendConfig {
    /// Create a stub-backed configuration under `base_dn`.
    pub fn new(base_dn: impl Into<String>) -> Self {
        Self {
            layout: DirectoryLayout::new(base_dn),
            datastore: Datastore::Stub,
        }
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Replace the layout.
    pub fn with_layout(mut self, layout: DirectoryLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the group RDN attribute.
    pub fn with_group_format(mut self, attr: impl Into<String>) -> Self {
        self.layout.group_format = attr.into();
        self
    }

    /// Set the groups hierarchy.
    pub fn with_groups_hierarchy(mut self, hierarchy: impl Into<String>) -> Self {
        self.layout.groups_hierarchy = hierarchy.into();
        self
    }

    /// Set the record source.
    pub fn with_datastore(mut self, datastore: Datastore) -> Self {
        self.datastore = datastore;
        self
    }

    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.layout.base_dn.trim().is_empty() {
            return Err(Error::Config("base DN must not be empty".to_string()));
        }
        for (key, value) in [
            ("nameformat", &self.layout.name_format),
            ("groupformat", &self.layout.group_format),
        ] {
            if value.is_empty() || value.contains(['=', ',']) {
                return Err(Error::Config(format!("invalid {}: {:?}", key, value)));
            }
        }
        for (key, value) in [
            ("groupshierarchy", &self.layout.groups_hierarchy),
            ("usershierarchy", &self.layout.users_hierarchy),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DN)
    }
}

/// Datastore kinds selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatastoreKind {
    Stub,
    File,
    Sled,
}

/// Options shared by every subcommand.
#[derive(clap::Args, Debug, Default)]
pub struct ConfigArgs {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base DN (overrides the config file).
    #[arg(long, global = true)]
    pub base_dn: Option<String>,

    /// Group RDN attribute (overrides the config file).
    #[arg(long, global = true)]
    pub group_format: Option<String>,

    /// Groups hierarchy (overrides the config file).
    #[arg(long, global = true)]
    pub groups_hierarchy: Option<String>,

    /// Record source (overrides the config file).
    #[arg(long, value_enum, global = true)]
    pub datastore: Option<DatastoreKind>,

    /// Path for the `file` or `sled` datastore.
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,
}

impl ConfigArgs {
    /// Build the configuration: config file first, then command-line overrides.
    pub fn into_config(self) -> Result<BackendConfig> {
        let mut config = match &self.config {
            Some(path) => BackendConfig::from_file(path)?,
            None => BackendConfig::default(),
        };

        if let Some(base_dn) = self.base_dn {
            config.layout.base_dn = base_dn;
        }
        if let Some(group_format) = self.group_format {
            config.layout.group_format = group_format;
        }
        if let Some(hierarchy) = self.groups_hierarchy {
            config.layout.groups_hierarchy = hierarchy;
        }

        config.datastore = match (self.datastore, self.data) {
            (None, None) => config.datastore,
            (Some(DatastoreKind::Stub), _) => Datastore::Stub,
            (Some(DatastoreKind::File), Some(path)) => Datastore::File { path },
            (Some(DatastoreKind::Sled), Some(path)) => Datastore::Sled { path },
            (Some(kind), None) => match (kind, config.datastore) {
                (DatastoreKind::File, existing @ Datastore::File { .. })
                | (DatastoreKind::Sled, existing @ Datastore::Sled { .. }) => existing,
                (kind, _) => {
                    return Err(Error::Config(format!(
                        "datastore {:?} requires --data",
                        kind
                    )))
                }
            },
            (None, Some(path)) => match config.datastore {
                Datastore::File { .. } => Datastore::File { path },
                Datastore::Sled { .. } => Datastore::Sled { path },
                Datastore::Stub => {
                    return Err(Error::Config(
                        "--data requires --datastore file or sled".to_string(),
                    ))
                }
            },
        };

        config.validate()?;
        Ok(config)
    }
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "ldapback")]
#[command(version, about = "Directory backend lookups, binds and searches", long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a user.
    User {
        /// User name, or e-mail with --mail.
        name: String,
        /// Look the user up by e-mail.
        #[arg(long)]
        mail: bool,
    },
    /// Resolve a group.
    Group {
        /// Group name.
        name: String,
    },
    /// List accounts under a hierarchy.
    Accounts {
        /// Hierarchy; defaults to the users hierarchy.
        hierarchy: Option<String>,
    },
    /// List groups under a hierarchy.
    Groups {
        /// Hierarchy; defaults to the groups hierarchy.
        hierarchy: Option<String>,
    },
    /// Check a bind.
    Bind {
        /// Bind DN or e-mail.
        dn: String,
        /// Password.
        password: String,
    },
    /// Bind, then search.
    Search {
        /// Search base.
        base: String,
        /// Search filter.
        #[arg(default_value = DEFAULT_SEARCH_FILTER)]
        filter: String,
        /// Bind DN.
        #[arg(long)]
        bind_dn: String,
        /// Bind password.
        #[arg(long)]
        password: String,
        /// Search scope: base, one or sub.
        #[arg(long, default_value = "sub")]
        scope: SearchScope,
        /// Attributes to return (comma separated).
        #[arg(long, value_delimiter = ',')]
        attributes: Vec<String>,
        /// Maximum number of entries (0 = unlimited).
        #[arg(long, default_value_t = 0)]
        size_limit: usize,
    },
    /// Import a JSON directory document into the sled datastore.
    Import {
        /// Directory document.
        file: PathBuf,
    },
}
