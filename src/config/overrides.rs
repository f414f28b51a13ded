use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::parallel::ResourceMode;

/// Values passed on the command line. Only fields that were actually given
/// take part in the merge, so unset flags never mask file or env values.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    pub encryption: EncryptionOverrides,
    pub execution: ExecutionOverrides,
    pub output: OutputOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EncryptionOverrides {
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionOverrides {
    pub mode: Option<ResourceMode>,
    pub threads: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputOverrides {
    pub directory: Option<PathBuf>,
    pub progress: Option<bool>,
}

impl ConfigOverrides {
    /// Serialized form with unset values and empty sections removed.
    pub fn to_value(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        prune_unset(&mut value);
        value
    }
}

/// Drop nulls, then any object left empty by that.
fn prune_unset(value: &mut Value) {
    if let Value::Object(map) = value {
        for child in map.values_mut() {
            prune_unset(child);
        }
        map.retain(|_, child| !is_unset(child));
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unset_overrides_are_pruned() {
        assert_eq!(ConfigOverrides::default().to_value(), json!({}));
    }

    #[test]
    fn test_only_given_values_remain() {
        let overrides = ConfigOverrides {
            execution: ExecutionOverrides {
                mode: Some(ResourceMode::Full),
                threads: None,
            },
            output: OutputOverrides {
                directory: None,
                progress: Some(false),
            },
            ..ConfigOverrides::default()
        };

        assert_eq!(
            overrides.to_value(),
            json!({ "execution": { "mode": "full" }, "output": { "progress": false } })
        );
    }
}
