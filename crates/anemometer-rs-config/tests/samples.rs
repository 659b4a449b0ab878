//! Loads the shipped sample definitions end to end.

use anemometer_rs_config::{
    ConfigLoader, DataSourceConfig, SLOW_QUERY_LOG, TableRole, render_template,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn writer_sample_keeps_role_tags_in_order() {
    init_logging();
    let config = DataSourceConfig::load_from_path(fixture("datasources.json5"), "writer")
        .expect("writer");

    let expected = DataSourceConfig::builder("writer")
        .host("db1")
        .port(3306)
        .database("slow_log")
        .user("u")
        .password("p")
        .table("global_query_review", "fact")
        .table("global_query_review_history", "dimension")
        .source_type(SLOW_QUERY_LOG)
        .build()
        .expect("expected");
    assert_eq!(config, expected);
    assert_eq!(
        config
            .tables()
            .resolve("global_query_review")
            .map(|table| (table.physical, table.role)),
        Some(("global_query_review", Some(TableRole::Fact)))
    );
}

#[test]
fn identity_sample_is_preserved_verbatim() {
    init_logging();
    let config = ConfigLoader::from_path(fixture("datasources.json5"))
        .load("localhost")
        .expect("localhost");

    assert_eq!(
        config.tables().get("global_query_review"),
        Some("global_query_review")
    );
    let resolved = config
        .tables()
        .resolve("global_query_review_history")
        .expect("history");
    assert_eq!(resolved.physical, "global_query_review_history");
    assert_eq!(resolved.role, None);
    assert!(config.is_slow_query_log());
}

#[test]
fn load_all_follows_definition_order() {
    init_logging();
    let loader = ConfigLoader::from_path(fixture("datasources.json5"));
    let names: Vec<String> = loader
        .load_all()
        .expect("all")
        .iter()
        .map(|config| config.name().to_string())
        .collect();
    assert_eq!(names, vec!["writer".to_string(), "localhost".to_string()]);
}

#[test]
fn shipped_template_needs_rendering() {
    init_logging();
    let template = fs::read_to_string(fixture("datasource_writer.json5.tmpl")).expect("template");

    let err = ConfigLoader::embedded(template.clone())
        .load("writer")
        .unwrap_err();
    assert!(err.is_validation());

    let vars: BTreeMap<String, String> = [
        ("ANEMOMETER_MYSQL_HOST", "mysql.internal"),
        ("ANEMOMETER_MYSQL_PORT", "3306"),
        ("ANEMOMETER_MYSQL_DB", "slow_query_log"),
        ("ANEMOMETER_MYSQL_USER", "anemometer"),
        ("ANEMOMETER_MYSQL_PASSWORD", "superSecurePass"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect();
    let rendered = render_template(&template, &vars).expect("render");
    let config = DataSourceConfig::load_from_str(&rendered, "writer").expect("writer");

    assert_eq!(config.host(), "mysql.internal");
    assert_eq!(config.database(), "slow_query_log_writer");
    assert_eq!(config.tables().len(), 2);
    assert!(!format!("{config:?}").contains("superSecurePass"));
}

#[test]
fn partially_rendered_template_reports_missing_tokens() {
    let template = fs::read_to_string(fixture("datasource_writer.json5.tmpl")).expect("template");
    let vars: BTreeMap<String, String> =
        BTreeMap::from([("ANEMOMETER_MYSQL_HOST".to_string(), "db1".to_string())]);

    let err = ConfigLoader::from_template(&template, &vars).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("__ANEMOMETER_MYSQL_PORT__"));
    assert!(message.contains("__ANEMOMETER_MYSQL_PASSWORD__"));
    assert!(!message.contains("__ANEMOMETER_MYSQL_HOST__"));
}
