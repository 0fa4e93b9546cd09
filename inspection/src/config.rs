use std::path::Path;

use serde::{Deserialize, Serialize};

/// External I/O configuration reference the server owns on behalf of task
/// executors. The concrete log I/O layer is out of scope for this core; this
/// struct is intentionally thin, carrying just enough for executors to find
/// their inputs.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct IoConfig {
    /// Root directory executors resolve relative log/result paths against.
    #[serde(default)]
    pub working_dir: String,
    /// Soft upper bound on concurrently in-flight query tasks; purely
    /// advisory to the (out-of-scope) executor implementations.
    #[serde(default)]
    pub max_concurrent_queries: Option<usize>,
}

impl IoConfig {
    pub fn from_toml_str(contents: &str) -> Result<IoConfig, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn from_toml_file(path: &Path) -> std::io::Result<IoConfig> {
        let contents = std::fs::read_to_string(path)?;
        IoConfig::from_toml_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
