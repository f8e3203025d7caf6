use std::convert::TryFrom;

use crate::Result;

/// Default value for maximum number of nodes a tree can hold.
pub const DEFAULT_MAX_NODES: usize = u32::MAX as usize;
/// Default number of node slots in the first arena chunk. Every
/// subsequent chunk is double the size of its predecessor.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Configuration for [Tree][crate::Tree] and [Coarse][crate::Coarse].
///
/// Use [Config::new] and the `set_*` methods, or load it from a TOML
/// document with [Config::from_toml]:
///
/// ```toml
/// name = "users"
/// max_nodes = 1000000
/// chunk_size = 4096
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Name of the tree, used in logs and statistics.
    pub name: String,
    /// Maximum number of entries the tree can hold. Once reached, insert
    /// of a new key shall fail with [Error::ArenaFull][crate::Error::ArenaFull].
    /// Must not exceed `isize::MAX / chunk_size`.
    ///
    /// Default: [DEFAULT_MAX_NODES]
    pub max_nodes: usize,
    /// Number of slots in the first arena chunk, must be a power of two.
    ///
    /// Default: [DEFAULT_CHUNK_SIZE]
    pub chunk_size: usize,
}

impl Config {
    /// Create a new configuration value, use the `set_*` methods to add more
    /// configuration.
    pub fn new(name: &str) -> Config {
        Config {
            name: name.to_string(),
            max_nodes: DEFAULT_MAX_NODES,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Limit the number of entries that can be held by the tree.
    pub fn set_max_nodes(&mut self, max_nodes: usize) -> &mut Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Set the size of the first arena chunk.
    pub fn set_chunk_size(&mut self, chunk_size: usize) -> &mut Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Check configuration parameters for sanity.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            err_at!(InvalidConfig, msg: "tree name can't be empty")?;
        }
        if self.max_nodes == 0 {
            err_at!(InvalidConfig, msg: "{:?} max_nodes must be > 0", self.name)?;
        }
        if !self.chunk_size.is_power_of_two() {
            err_at!(
                InvalidConfig,
                msg: "{:?} chunk_size {} not a power of two",
                self.name,
                self.chunk_size
            )?;
        }
        // every slot must be addressable without overflowing the arena.
        let limit = (isize::MAX as usize) / self.chunk_size;
        if self.max_nodes > limit {
            err_at!(
                InvalidConfig,
                msg: "{:?} max_nodes {} exceeds {} for chunk_size {}",
                self.name,
                self.max_nodes,
                limit,
                self.chunk_size
            )?;
        }
        Ok(())
    }

    /// Parse configuration from a TOML document. `name` is mandatory, other
    /// fields fall back to their defaults.
    pub fn from_toml(text: &str) -> Result<Config> {
        let value: toml::Value = err_at!(InvalidConfig, text.parse::<toml::Value>())?;
        let dict = match value.as_table() {
            Some(dict) => dict,
            None => err_at!(InvalidConfig, msg: "config, not a table")?,
        };

        let name = match dict.get("name").map(|v| v.as_str()) {
            Some(Some(name)) => name,
            Some(None) => err_at!(InvalidConfig, msg: "config, name not a string")?,
            None => err_at!(InvalidConfig, msg: "config, missing name")?,
        };
        let mut config = Config::new(name);

        if let Some(n) = to_usize(dict, "max_nodes")? {
            config.set_max_nodes(n);
        }
        if let Some(n) = to_usize(dict, "chunk_size")? {
            config.set_chunk_size(n);
        }

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration as a TOML document.
    pub fn to_toml(&self) -> Result<String> {
        use toml::Value::{Integer, String as TomlStr, Table};

        let mut dict = toml::map::Map::new();
        let max_nodes = err_at!(FailConvert, i64::try_from(self.max_nodes))?;
        let chunk_size = err_at!(FailConvert, i64::try_from(self.chunk_size))?;

        dict.insert("name".to_string(), TomlStr(self.name.clone()));
        dict.insert("max_nodes".to_string(), Integer(max_nodes));
        dict.insert("chunk_size".to_string(), Integer(chunk_size));

        Ok(Table(dict).to_string())
    }
}

fn to_usize(dict: &toml::map::Map<String, toml::Value>, key: &str) -> Result<Option<usize>> {
    match dict.get(key).map(|v| v.as_integer()) {
        Some(Some(n)) => Ok(Some(err_at!(FailConvert, usize::try_from(n), "{}", key)?)),
        Some(None) => err_at!(InvalidConfig, msg: "config, {} not an integer", key),
        None => Ok(None),
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new("rbcc")
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
