//! Data-source definition loader.
//!
//! Reads a definition document (a single file, an embedded string, a rendered
//! deployment template, or a stack of layered files), checks its structure,
//! and produces validated [`DataSourceConfig`] records by name. Loading never
//! opens a connection to the described database.

mod layer_io;
mod merge;
mod node;
mod schema;
mod template;


pub use template::render_template;

use crate::model::RawDataSource;
use crate::{ConfigError, DataSourceConfig};
use log::{debug, info};
use node::Node;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default definitions filename in local layers.
const DEFAULT_DEFINITIONS_FILE: &str = "datasources.json5";
/// Default definitions directory under the user's home.
const DEFAULT_DEFINITIONS_DIR: &str = ".anemometer";

#[cfg(unix)]
/// Default system definitions path on Unix.
const SYSTEM_DEFINITIONS_PATH: &str = "/etc/anemometer/datasources.json5";

/// Label used for errors raised against merged layers.
const EFFECTIVE_LABEL: &str = "effective";

/// Schema validation mode for a data-source entry.
#[derive(Debug, Clone, Copy)]
enum SchemaMode {
    /// Types and keys only; used for every entry of a layer.
    Partial,
    /// Required keys as well; used for the entry being loaded.
    Full,
}

/// Origin of one definition layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSource {
    /// System-wide definitions.
    System,
    /// User-specific definitions.
    User,
    /// Explicit override file (highest precedence).
    Override,
    /// Single definition file outside a layered stack.
    File,
    /// Definitions supplied in memory.
    Embedded,
}

/// Metadata about a definition layer that contributed to a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionLayer {
    pub source: LayerSource,
    /// Location on disk if the layer came from a file.
    pub path: Option<PathBuf>,
}

/// Options controlling layered definition discovery.
#[derive(Debug, Clone)]
pub struct LayeredDefinitionOptions {
    /// Optional system path (defaults to `/etc/anemometer/datasources.json5` on Unix).
    pub system_path: Option<PathBuf>,
    /// Optional user path (defaults to `~/.anemometer/datasources.json5`).
    pub user_path: Option<PathBuf>,
    /// Override files applied last, in order. Each must exist.
    pub override_paths: Vec<PathBuf>,
}

impl LayeredDefinitionOptions {
    /// Create options with the default system and user locations.
    pub fn new() -> Self {
        Self {
            system_path: layer_io::default_system_path(),
            user_path: layer_io::default_user_path(),
            override_paths: Vec::new(),
        }
    }

    /// Add an override file that is applied after all previous layers.
    pub fn with_override_path(mut self, path: impl AsRef<Path>) -> Self {
        self.override_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl Default for LayeredDefinitionOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a loader reads its definitions from.
#[derive(Clone)]
pub enum DefinitionSource {
    File(PathBuf),
    Embedded(String),
    Layered(LayeredDefinitionOptions),
}

impl fmt::Debug for DefinitionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionSource::File(path) => f.debug_tuple("File").field(path).finish(),
            // Embedded text may hold passwords.
            DefinitionSource::Embedded(contents) => f
                .debug_struct("Embedded")
                .field("len", &contents.len())
                .finish(),
            DefinitionSource::Layered(options) => {
                f.debug_tuple("Layered").field(options).finish()
            }
        }
    }
}

/// Loads named data-source records from a definition source.
///
/// Each call re-reads the source, so two loads of the same name return equal
/// records unless the files changed in between.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    source: DefinitionSource,
}

impl ConfigLoader {
    pub fn new(source: DefinitionSource) -> Self {
        Self { source }
    }

    /// Read definitions from a single JSON5 file.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::new(DefinitionSource::File(path.as_ref().to_path_buf()))
    }

    /// Use definitions held in memory.
    pub fn embedded(contents: impl Into<String>) -> Self {
        Self::new(DefinitionSource::Embedded(contents.into()))
    }

    /// Render a deployment template and use the result as embedded definitions.
    pub fn from_template(
        template: &str,
        vars: &BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let rendered = render_template(template, vars)?;
        Ok(Self::embedded(rendered))
    }

    /// Read definitions from a layered stack of files.
    pub fn layered(options: LayeredDefinitionOptions) -> Self {
        Self::new(DefinitionSource::Layered(options))
    }

    pub fn source(&self) -> &DefinitionSource {
        &self.source
    }

    /// Read and structurally check the whole definition set.
    pub fn read(&self) -> Result<DefinitionSet, ConfigError> {
        match &self.source {
            DefinitionSource::File(path) => {
                let layer = layer_io::load_required_layer(LayerSource::File, path)?;
                let label = layer_io::layer_label(LayerSource::File, path);
                Ok(DefinitionSet {
                    root: layer.value,
                    label,
                    layers: vec![layer.meta],
                })
            }
            DefinitionSource::Embedded(contents) => {
                debug!("reading embedded definitions (len={})", contents.len());
                let label = "embedded".to_string();
                let root = layer_io::parse_document(contents, &label)?;
                Ok(DefinitionSet {
                    root,
                    label,
                    layers: vec![DefinitionLayer {
                        source: LayerSource::Embedded,
                        path: None,
                    }],
                })
            }
            DefinitionSource::Layered(options) => read_layered(options),
        }
    }

    /// Load and validate the data source registered under `name`.
    pub fn load(&self, name: &str) -> Result<DataSourceConfig, ConfigError> {
        info!("loading data source definition (name={name})");
        self.read()?.get(name)
    }

    /// Names of all defined data sources, in definition order.
    pub fn names(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self
            .read()?
            .names()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Load and validate every data source, in definition order.
    pub fn load_all(&self) -> Result<Vec<DataSourceConfig>, ConfigError> {
        self.read()?.all()
    }
}

/// A parsed definition document whose structure has been checked.
#[derive(Clone)]
pub struct DefinitionSet {
    root: Node,
    label: String,
    layers: Vec<DefinitionLayer>,
}

impl DefinitionSet {
    /// Label used to prefix validation error paths.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Layers that contributed to this set, lowest precedence first.
    pub fn layers(&self) -> &[DefinitionLayer] {
        &self.layers
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries().iter().any(|(entry, _)| entry == name)
    }

    /// Validate and decode the entry registered under `name`.
    pub fn get(&self, name: &str) -> Result<DataSourceConfig, ConfigError> {
        let entry = self
            .entries()
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
            .ok_or_else(|| ConfigError::NotFound {
                name: name.to_string(),
            })?;
        let path = schema::join_path("datasources", name);
        schema::validate_datasource(entry, SchemaMode::Full, &self.label, &path)?;
        let raw: RawDataSource = serde_json::from_value(entry.clone().into_value())?;
        let config = DataSourceConfig::from_raw(name, raw).map_err(|issue| {
            schema::invalid_field(
                &self.label,
                &schema::join_path(&path, issue.field),
                issue.message,
            )
        })?;
        debug!(
            "data source validated (name={name}, tables={}, source_type={})",
            config.tables().len(),
            config.source_type()
        );
        Ok(config)
    }

    /// Validate and decode every entry, in definition order.
    pub fn all(&self) -> Result<Vec<DataSourceConfig>, ConfigError> {
        self.names().into_iter().map(|name| self.get(name)).collect()
    }

    fn entries(&self) -> &[(String, Node)] {
        self.root
            .get("datasources")
            .and_then(Node::as_object)
            .unwrap_or(&[])
    }
}

impl fmt::Debug for DefinitionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionSet")
            .field("label", &self.label)
            .field("layers", &self.layers)
            .field("names", &self.names())
            .finish()
    }
}

impl DataSourceConfig {
    /// Load a single data source from a definition file.
    pub fn load_from_path(path: impl AsRef<Path>, name: &str) -> Result<Self, ConfigError> {
        ConfigLoader::from_path(path).load(name)
    }

    /// Load a single data source from JSON5 contents.
    pub fn load_from_str(contents: &str, name: &str) -> Result<Self, ConfigError> {
        ConfigLoader::embedded(contents).load(name)
    }
}

/// Internal representation of a loaded definition layer.
struct LoadedLayer {
    meta: DefinitionLayer,
    value: Node,
}

/// Read system, user and override layers and merge them in precedence order.
fn read_layered(options: &LayeredDefinitionOptions) -> Result<DefinitionSet, ConfigError> {
    let mut candidates: Vec<(LayerSource, Option<&Path>, bool)> = vec![
        (LayerSource::System, options.system_path.as_deref(), false),
        (LayerSource::User, options.user_path.as_deref(), false),
    ];
    for path in &options.override_paths {
        candidates.push((LayerSource::Override, Some(path.as_path()), true));
    }

    let mut seen_paths = HashSet::new();
    let mut layers = Vec::new();
    let mut root = Node::empty_object();
    for (source, path, required) in candidates {
        let Some(path) = path else {
            continue;
        };
        if !seen_paths.insert(layer_io::unique_path(path)) {
            debug!(
                "skipping duplicate layer (source={:?}, path={})",
                source,
                path.display()
            );
            continue;
        }
        let loaded = if required {
            Some(layer_io::load_required_layer(source, path)?)
        } else {
            layer_io::load_optional_layer(source, Some(path))?
        };
        if let Some(layer) = loaded {
            debug!("merging {:?} layer", layer.meta.source);
            merge::merge_definitions(&mut root, layer.value);
            layers.push(layer.meta);
        }
    }

    schema::validate_document(&root, EFFECTIVE_LABEL)?;
    info!("layered definitions read (layers={})", layers.len());
    Ok(DefinitionSet {
        root,
        label: EFFECTIVE_LABEL.to_string(),
        layers,
    })
}
