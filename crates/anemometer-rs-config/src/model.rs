//! Data-source record types.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::ConfigError;

/// Source type tag for definitions fed from a slow query log.
pub const SLOW_QUERY_LOG: &str = "slow_query_log";

/// Text shown in place of a password.
pub const REDACTED: &str = "[REDACTED]";

/// Validated connection parameters and table mapping for one data source.
///
/// Built once by [`crate::ConfigLoader`] or [`DataSourceConfigBuilder`] and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSourceConfig {
    #[serde(skip)]
    name: String,
    host: String,
    port: u16,
    #[serde(rename = "db")]
    database: String,
    user: String,
    password: Password,
    tables: TableMapping,
    source_type: String,
}

impl DataSourceConfig {
    /// Start building a record in code.
    pub fn builder(name: impl Into<String>) -> DataSourceConfigBuilder {
        DataSourceConfigBuilder::new(name)
    }

    /// Name the record was loaded under (e.g. `writer`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn tables(&self) -> &TableMapping {
        &self.tables
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub fn is_slow_query_log(&self) -> bool {
        self.source_type == SLOW_QUERY_LOG
    }

    pub(crate) fn from_raw(name: &str, raw: RawDataSource) -> Result<Self, FieldIssue> {
        let port = check_fields(&raw.host, raw.port, &raw.db, &raw.user, &raw.source_type)?;
        Ok(Self {
            name: name.to_string(),
            host: raw.host,
            port,
            database: raw.db,
            user: raw.user,
            password: raw.password,
            tables: raw.tables,
            source_type: raw.source_type,
        })
    }
}

/// Decoded form of a single definition entry, before field checks.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawDataSource {
    host: String,
    port: i64,
    db: String,
    user: String,
    password: Password,
    tables: TableMapping,
    source_type: String,
}

/// A field that failed a record-level check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldIssue {
    pub field: &'static str,
    pub message: &'static str,
}

/// Check the invariants shared by the loader and the builder, returning the
/// narrowed port.
fn check_fields(
    host: &str,
    port: i64,
    database: &str,
    user: &str,
    source_type: &str,
) -> Result<u16, FieldIssue> {
    for (field, value) in [
        ("host", host),
        ("db", database),
        ("user", user),
        ("source_type", source_type),
    ] {
        if value.trim().is_empty() {
            return Err(FieldIssue {
                field,
                message: "must not be empty",
            });
        }
    }
    if port <= 0 {
        return Err(FieldIssue {
            field: "port",
            message: "must be a positive integer",
        });
    }
    u16::try_from(port).map_err(|_| FieldIssue {
        field: "port",
        message: "must not exceed 65535",
    })
}

/// Authentication secret that never prints its contents.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Plaintext secret, for handing to a database driver.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for Password {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

/// Warehouse role a table can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    Fact,
    Dimension,
}

impl TableRole {
    /// Parse a role tag; anything else is treated as a table alias.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "fact" => Some(TableRole::Fact),
            "dimension" => Some(TableRole::Dimension),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableRole::Fact => "fact",
            TableRole::Dimension => "dimension",
        }
    }
}

/// One `tables` entry, stored exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub key: String,
    pub value: String,
}

/// Interpretation of a `tables` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTable<'a> {
    /// Physical table name to query.
    pub physical: &'a str,
    /// Role tag when the entry carries one.
    pub role: Option<TableRole>,
}

/// Ordered logical-table mapping with unique keys.
///
/// Values are opaque: some definitions tag tables with a role (`fact`,
/// `dimension`), others alias a logical table to a physical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMapping {
    entries: Vec<TableEntry>,
}

impl TableMapping {
    /// Build a mapping from ordered pairs, rejecting repeated keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mapping = TableMapping::default();
        for (key, value) in pairs {
            let key = key.into();
            if mapping.contains_key(&key) {
                return Err(ConfigError::InvalidField {
                    path: format!("tables.{key}"),
                    message: "duplicate key".to_string(),
                });
            }
            mapping.entries.push(TableEntry {
                key,
                value: value.into(),
            });
        }
        Ok(mapping)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the physical table behind a logical key.
    ///
    /// Role-tagged entries name their own table; any other value is the
    /// physical name.
    pub fn resolve(&self, key: &str) -> Option<ResolvedTable<'_>> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| match TableRole::from_tag(&entry.value) {
                Some(role) => ResolvedTable {
                    physical: entry.key.as_str(),
                    role: Some(role),
                },
                None => ResolvedTable {
                    physical: entry.value.as_str(),
                    role: None,
                },
            })
    }
}

impl Serialize for TableMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TableMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableMappingVisitor;

        impl<'de> Visitor<'de> for TableMappingVisitor {
            type Value = TableMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of table names to strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TableMapping, A::Error> {
                let mut mapping = TableMapping::default();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    if mapping.contains_key(&key) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate table key `{key}`"
                        )));
                    }
                    mapping.entries.push(TableEntry { key, value });
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(TableMappingVisitor)
    }
}

/// Builder for assembling a [`DataSourceConfig`] in code.
#[derive(Debug, Clone)]
pub struct DataSourceConfigBuilder {
    name: String,
    host: String,
    port: i64,
    database: String,
    user: String,
    password: Password,
    tables: Vec<(String, String)>,
    source_type: String,
}

impl DataSourceConfigBuilder {
    /// Create a builder for a slow-query-log source with empty fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: String::new(),
            port: 0,
            database: String::new(),
            user: String::new(),
            password: Password::new(""),
            tables: Vec::new(),
            source_type: SLOW_QUERY_LOG.to_string(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: i64) -> Self {
        self.port = port;
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Password::new(password);
        self
    }

    /// Append a `tables` entry; order is kept.
    pub fn table(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tables.push((key.into(), value.into()));
        self
    }

    pub fn source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self
    }

    /// Validate and return the record.
    pub fn build(self) -> Result<DataSourceConfig, ConfigError> {
        let port = check_fields(
            &self.host,
            self.port,
            &self.database,
            &self.user,
            &self.source_type,
        )
        .map_err(|issue| {
            ConfigError::Invalid(format!(
                "{}.{}: {}",
                self.name, issue.field, issue.message
            ))
        })?;
        let tables = TableMapping::from_pairs(self.tables)?;
        Ok(DataSourceConfig {
            name: self.name,
            host: self.host,
            port,
            database: self.database,
            user: self.user,
            password: self.password,
            tables,
            source_type: self.source_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn writer() -> DataSourceConfigBuilder {
        DataSourceConfig::builder("writer")
            .host("db1")
            .port(3306)
            .database("slow_log")
            .user("u")
            .password("hunter2")
            .table("global_query_review", "fact")
            .table("global_query_review_history", "dimension")
    }

    #[test]
    fn builder_produces_record() {
        let config = writer().build().expect("config");
        assert_eq!(config.name(), "writer");
        assert_eq!(config.port(), 3306);
        assert_eq!(config.password().expose(), "hunter2");
        assert!(config.is_slow_query_log());
        assert_eq!(
            config.tables().keys().collect::<Vec<_>>(),
            vec!["global_query_review", "global_query_review_history"]
        );
    }

    #[test]
    fn builder_rejects_non_positive_port() {
        for port in [0, -1] {
            let err = writer().port(port).build().unwrap_err();
            assert!(err.is_validation());
            assert!(err.to_string().contains("writer.port"));
        }
    }

    #[test]
    fn builder_rejects_port_above_range() {
        let err = writer().port(70_000).build().unwrap_err();
        assert!(err.to_string().contains("65535"));
    }

    #[test]
    fn builder_rejects_empty_host() {
        let err = writer().host("  ").build().unwrap_err();
        assert!(err.to_string().contains("writer.host"));
    }

    #[test]
    fn builder_rejects_duplicate_table_keys() {
        let err = writer()
            .table("global_query_review", "dimension")
            .build()
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn password_is_redacted_everywhere() {
        let config = writer().build().expect("config");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains(REDACTED));
        assert_eq!(config.password().to_string(), REDACTED);

        let json = serde_json::to_string(&config).expect("json");
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn serializes_in_definition_shape() {
        let config = writer().build().expect("config");
        let value = serde_json::to_value(&config).expect("json");
        assert_eq!(value["db"], "slow_log");
        assert_eq!(value["tables"]["global_query_review_history"], "dimension");
        assert_eq!(value["source_type"], SLOW_QUERY_LOG);
        assert!(value.get("name").is_none());
    }

    #[test]
    fn resolves_role_tagged_and_aliased_tables() {
        let tagged = TableMapping::from_pairs([("global_query_review", "fact")]).expect("tags");
        assert_eq!(
            tagged.resolve("global_query_review"),
            Some(ResolvedTable {
                physical: "global_query_review",
                role: Some(TableRole::Fact),
            })
        );

        let aliased =
            TableMapping::from_pairs([("global_query_review", "review_2024")]).expect("alias");
        assert_eq!(
            aliased.resolve("global_query_review"),
            Some(ResolvedTable {
                physical: "review_2024",
                role: None,
            })
        );
        assert_eq!(aliased.get("global_query_review"), Some("review_2024"));
        assert_eq!(aliased.resolve("missing"), None);
    }

    #[test]
    fn table_mapping_deserialize_rejects_duplicates() {
        let err = json5::from_str::<TableMapping>(r#"{ a: "fact", a: "dimension" }"#).unwrap_err();
        assert!(err.to_string().contains("duplicate table key"));
    }
}
