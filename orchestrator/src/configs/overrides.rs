use serde_yaml::{Mapping, Value};

use super::ConfigErr;

/// Applies a single `key.path=value` override to a configuration document.
///
/// The value is parsed as a YAML scalar, so `lr=0.1` sets a number and `name=abc` a string.
/// Overriding a key that isn't in the document is an error unless the override starts with
/// `+`, in which case the key and any missing parents are created.
pub fn apply_override(doc: &mut Value, raw: &str) -> Result<(), ConfigErr> {
    let invalid = |reason: &str| ConfigErr::Override {
        arg: raw.to_string(),
        reason: reason.to_string(),
    };

    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| invalid("expected key=value"))?;

    let (append, key) = match key.strip_prefix('+') {
        Some(key) => (true, key),
        None => (false, key),
    };

    let segments: Vec<_> = key.split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(invalid("empty key segment"));
    }

    let value = parse_value(value).map_err(|e| invalid(&e.to_string()))?;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| invalid("empty key"))?;

    let mut node = doc;
    for segment in parents {
        let mapping = node
            .as_mapping_mut()
            .ok_or_else(|| invalid(&format!("{segment} is not inside a mapping")))?;

        let segment = Value::String(segment.to_string());
        if !mapping.contains_key(&segment) {
            if !append {
                return Err(invalid("key not in config, prefix it with + to add it"));
            }
            mapping.insert(segment.clone(), Value::Mapping(Mapping::new()));
        }

        node = mapping
            .get_mut(&segment)
            .ok_or_else(|| invalid("key not in config"))?;
    }

    let mapping = node
        .as_mapping_mut()
        .ok_or_else(|| invalid(&format!("{last} is not inside a mapping")))?;

    let last = Value::String(last.to_string());
    if !append && !mapping.contains_key(&last) {
        return Err(invalid("key not in config, prefix it with + to add it"));
    }

    mapping.insert(last, value);
    Ok(())
}

fn parse_value(raw: &str) -> Result<Value, serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::String(String::new()));
    }

    serde_yaml::from_str(raw)
}
