//! Schema validation helpers for data-source definition documents.

use super::SchemaMode;
use super::node::Node;
use crate::ConfigError;

/// Keys accepted inside a single data-source entry.
const DATASOURCE_KEYS: &[&str] = &[
    "host",
    "port",
    "db",
    "user",
    "password",
    "tables",
    "source_type",
];

/// Validate the document structure of one definition layer.
///
/// Every entry is checked for types, unknown keys and duplicates; required
/// keys are only enforced per entry at load time.
pub(super) fn validate_document(root: &Node, layer: &str) -> Result<(), ConfigError> {
    let entries = expect_object(root, layer, "")?;
    ensure_unique_keys(entries, layer, "")?;
    ensure_allowed_keys(entries, &["$schema", "datasources"], layer, "")?;

    if let Some(value) = root.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = root.get("datasources") {
        validate_datasources(value, layer, "datasources")?;
    }
    Ok(())
}

/// Validate the "datasources" block.
fn validate_datasources(value: &Node, layer: &str, path: &str) -> Result<(), ConfigError> {
    let entries = expect_object(value, layer, path)?;
    ensure_unique_keys(entries, layer, path)?;
    for (name, entry) in entries {
        if name.trim().is_empty() {
            return Err(invalid_field(layer, path, "data source name must not be empty"));
        }
        validate_datasource(entry, SchemaMode::Partial, layer, &join_path(path, name))?;
    }
    Ok(())
}

/// Validate a single data-source entry.
pub(super) fn validate_datasource(
    value: &Node,
    mode: SchemaMode,
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    let entries = expect_object(value, layer, path)?;
    ensure_unique_keys(entries, layer, path)?;
    ensure_allowed_keys(entries, DATASOURCE_KEYS, layer, path)?;

    if matches!(mode, SchemaMode::Full) {
        for key in DATASOURCE_KEYS {
            if value.get(key).is_none() {
                return Err(invalid_field(
                    layer,
                    &join_path(path, key),
                    "missing required key",
                ));
            }
        }
    }

    for key in ["host", "db", "user", "password", "source_type"] {
        if let Some(value) = value.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = value.get("port") {
        expect_integer(value, layer, &join_path(path, "port"))?;
    }
    if let Some(value) = value.get("tables") {
        validate_tables(value, layer, &join_path(path, "tables"))?;
    }
    Ok(())
}

/// Validate the ordered table mapping of an entry.
fn validate_tables(value: &Node, layer: &str, path: &str) -> Result<(), ConfigError> {
    let entries = expect_object(value, layer, path)?;
    ensure_unique_keys(entries, layer, path)?;
    for (key, value) in entries {
        if key.trim().is_empty() {
            return Err(invalid_field(layer, path, "table key must not be empty"));
        }
        expect_string(value, layer, &join_path(path, key))?;
    }
    Ok(())
}

/// Expect an object node or return a typed error.
fn expect_object<'a>(
    value: &'a Node,
    layer: &str,
    path: &str,
) -> Result<&'a [(String, Node)], ConfigError> {
    value
        .as_object()
        .ok_or_else(|| invalid_field(layer, path, "expected object"))
}

/// Expect a string or return a typed error.
fn expect_string(value: &Node, layer: &str, path: &str) -> Result<(), ConfigError> {
    if matches!(value, Node::String(_)) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect an integer that fits the decoded field type.
fn expect_integer(value: &Node, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Node::Integer(number) if i64::try_from(*number).is_ok() => Ok(()),
        Node::Integer(_) => Err(invalid_field(layer, path, "integer out of range")),
        _ => Err(invalid_field(layer, path, "expected integer")),
    }
}

/// Ensure no key appears twice in one object.
fn ensure_unique_keys(
    entries: &[(String, Node)],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for (idx, (key, _)) in entries.iter().enumerate() {
        if entries[..idx].iter().any(|(earlier, _)| earlier == key) {
            return Err(invalid_field(layer, &join_path(path, key), "duplicate key"));
        }
    }
    Ok(())
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    entries: &[(String, Node)],
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for (key, _) in entries {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
pub(super) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
pub(super) fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
