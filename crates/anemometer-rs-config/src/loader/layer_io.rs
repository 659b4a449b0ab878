//! IO helpers for reading definition layers from disk.

use super::node::Node;
use super::{
    DEFAULT_DEFINITIONS_DIR, DEFAULT_DEFINITIONS_FILE, DefinitionLayer, LayerSource, LoadedLayer,
    schema,
};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Load an optional layer if the provided path exists.
pub(super) fn load_optional_layer(
    source: LayerSource,
    path: Option<&Path>,
) -> Result<Option<LoadedLayer>, ConfigError> {
    let path = match path {
        Some(path) => path,
        None => return Ok(None),
    };

    if !path.exists() {
        debug!(
            "optional layer missing (source={:?}, path={})",
            source,
            path.display()
        );
        return Ok(None);
    }

    Ok(Some(load_required_layer(source, path)?))
}

/// Load and validate a required layer from disk.
pub(super) fn load_required_layer(
    source: LayerSource,
    path: &Path,
) -> Result<LoadedLayer, ConfigError> {
    debug!(
        "loading definition layer (source={:?}, path={})",
        source,
        path.display()
    );
    let contents = fs::read_to_string(path)?;
    let label = layer_label(source, path);
    let value = parse_document(&contents, &label)?;
    Ok(LoadedLayer {
        meta: DefinitionLayer {
            source,
            path: Some(path.to_path_buf()),
        },
        value,
    })
}

/// Parse JSON5 contents and check the document structure.
pub(super) fn parse_document(contents: &str, label: &str) -> Result<Node, ConfigError> {
    let value: Node = json5::from_str(contents).map_err(|_| ConfigError::ParseFailed {
        label: label.to_string(),
    })?;
    schema::validate_document(&value, label)?;
    Ok(value)
}

/// Build a user-friendly label for schema validation errors.
pub(super) fn layer_label(source: LayerSource, path: &Path) -> String {
    let name = match source {
        LayerSource::System => "system",
        LayerSource::User => "user",
        LayerSource::Override => "override",
        LayerSource::File => "file",
        LayerSource::Embedded => "embedded",
    };
    format!("{name}({})", path.display())
}

/// Produce a stable unique path used for de-duplication.
pub(super) fn unique_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Default system definitions path on Unix; None elsewhere.
pub(super) fn default_system_path() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        Some(PathBuf::from(super::SYSTEM_DEFINITIONS_PATH))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Default user definitions path under the home directory.
pub(super) fn default_user_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_DEFINITIONS_DIR)
            .join(DEFAULT_DEFINITIONS_FILE)
    })
}
