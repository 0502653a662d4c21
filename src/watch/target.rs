use std::fmt;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Identifies the single remote resource being observed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchTarget {
    /// Namespace/scope of the resource
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Resource name inside the namespace
    #[serde(default)]
    pub name: String,
}

impl WatchTarget {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "target namespace cannot be empty".into(),
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "target name cannot be empty".into(),
            )));
        }
        Ok(())
    }
}

impl Default for WatchTarget {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            name: String::new(),
        }
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

fn default_namespace() -> String {
    "default".to_string()
}
