use std::collections::HashMap;
use std::path::Path;

use serde_yaml::Value as Yaml;

use super::value::ConfigValue;
use super::ConfigError;

pub(crate) type Values = HashMap<String, ConfigValue>;

/// Merge `path` into `values`; a file that does not exist contributes nothing.
pub(crate) fn merge_file(path: &Path, values: &mut Values) -> Result<(), ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => merge_str(&content, values),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::Load(format!("{}: {e}", path.display()))),
    }
}

/// Merge a YAML document, keyed by its dotted paths. Sequence items are keyed
/// by index (`sort.0`, `sort.1`).
pub(crate) fn merge_str(content: &str, values: &mut Values) -> Result<(), ConfigError> {
    let root: Yaml = serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    let mut pending = vec![(String::new(), &root)];
    while let Some((path, node)) = pending.pop() {
        match node {
            Yaml::Mapping(map) => {
                for (key, child) in map {
                    let key = match key {
                        Yaml::String(s) => s.clone(),
                        Yaml::Number(n) => n.to_string(),
                        Yaml::Bool(b) => b.to_string(),
                        other => return Err(ConfigError::Load(format!("unsupported key {other:?}"))),
                    };
                    pending.push((join(&path, &key), child));
                }
            }
            Yaml::Sequence(items) => {
                for (i, child) in items.iter().enumerate() {
                    pending.push((join(&path, &i.to_string()), child));
                }
            }
            Yaml::Tagged(tagged) => pending.push((path, &tagged.value)),
            scalar if !path.is_empty() => {
                values.insert(path, ConfigValue::from_scalar(scalar));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Overlay `QDSL_*` variables: `QDSL_DATA_PAGE_MAX` sets `qdsl.data.page.max`.
pub(crate) fn merge_env(vars: impl IntoIterator<Item = (String, String)>, values: &mut Values) {
    for (name, value) in vars {
        if name.starts_with("QDSL_") {
            values.insert(name.to_lowercase().replace('_', "."), ConfigValue::String(value));
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
