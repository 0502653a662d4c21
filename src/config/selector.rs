use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::FieldSelector;
use crate::Result;

/// Which data field to track and, optionally, its baseline value
///
/// When `baseline` is unset the host reads the resource once before the
/// first watch attempt and uses the field's current value.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SelectorConfig {
    #[serde(default = "default_field")]
    pub field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            field: default_field(),
            baseline: None,
        }
    }
}

impl SelectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.field.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "selector field cannot be empty".into(),
            )));
        }
        Ok(())
    }

    /// Builds the immutable selector once the baseline is known
    pub fn with_baseline(
        &self,
        baseline: impl Into<String>,
    ) -> FieldSelector {
        FieldSelector::new(self.field.clone(), baseline)
    }
}

fn default_field() -> String {
    "LOG_LEVEL".to_string()
}
