// crates/rowbind-config/src/load.rs
// ============================================================================
// Module: Rowbind Document Loading
// Description: File-backed node trees and property documents.
// Purpose: Read configuration and mapping documents from disk, fail closed.
// Dependencies: rowbind-core, serde_json, toml, tracing
// ============================================================================

//! ## Overview
//! Documents are TOML or JSON serializations of a [`Node`] tree, chosen by
//! file extension (`.json` is JSON, anything else TOML). Every read is
//! guarded: bounded path length and component length, bounded file size,
//! UTF-8 only. Resource references must stay under the source root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use rowbind_core::MapperReference;
use rowbind_core::MappingSource;
use rowbind_core::Node;
use rowbind_core::SourceError;
use rowbind_core::TypeName;
use tracing::debug;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration file name.
pub const DEFAULT_CONFIG_NAME: &str = "rowbind.toml";

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV_VAR: &str = "ROWBIND_CONFIG";

/// Maximum document size in bytes.
pub(crate) const MAX_DOCUMENT_SIZE: usize = 1024 * 1024;

/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;

/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Extensions tried, in order, for type-bound units.
const UNIT_EXTENSIONS: &[&str] = &["toml", "json"];

/// URL scheme accepted for `url` references.
const FILE_SCHEME: &str = "file://";

// ============================================================================
// SECTION: Configuration Path
// ============================================================================

/// Resolves the configuration path from the CLI, the environment, or the default.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the environment path exceeds limits.
pub fn resolve_config_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Reads a node tree from `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Source`] when the document violates a limit or
/// cannot be read or decoded.
pub fn read_node(path: &Path) -> Result<Node, ConfigError> {
    let reference = path.display().to_string();
    let content = read_document(path, &reference)?;
    Ok(decode_node(path, &content, &reference)?)
}

// ============================================================================
// SECTION: File System Source
// ============================================================================

/// Mapping source rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    /// Directory resource paths are resolved against.
    root: PathBuf,
}

impl FileSystemSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the source root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a resource or url reference to a file path.
    fn locate(&self, reference: &MapperReference) -> Result<PathBuf, SourceError> {
        match reference {
            MapperReference::Resource(resource) => {
                let relative = Path::new(resource);
                let escapes = relative
                    .components()
                    .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
                if escapes {
                    return Err(SourceError::Invalid {
                        reference: reference.to_string(),
                        message: "resource paths must stay under the source root".to_string(),
                    });
                }
                Ok(self.root.join(relative))
            }
            MapperReference::Url(url) => url.strip_prefix(FILE_SCHEME).map(PathBuf::from).ok_or_else(|| {
                SourceError::Unsupported {
                    reference: reference.to_string(),
                }
            }),
            MapperReference::Type(type_name) => {
                let base = self.root.join(type_name.as_str().replace('.', "/"));
                UNIT_EXTENSIONS
                    .iter()
                    .map(|extension| base.with_extension(extension))
                    .find(|candidate| candidate.is_file())
                    .ok_or_else(|| SourceError::NotFound {
                        reference: reference.to_string(),
                    })
            }
        }
    }
}

impl MappingSource for FileSystemSource {
    fn load(&self, reference: &MapperReference) -> Result<Node, SourceError> {
        let path = self.locate(reference)?;
        debug!(reference = %reference, path = %path.display(), "loading mapping unit");
        let label = reference.to_string();
        let content = read_document(&path, &label)?;
        decode_node(&path, &content, &label)
    }

    fn package(&self, package: &str) -> Result<Vec<MapperReference>, SourceError> {
        let label = format!("package {package}");
        let directory = self.root.join(package.replace('.', "/"));
        let entries = fs::read_dir(&directory).map_err(|err| SourceError::Io {
            reference: label.clone(),
            message: err.to_string(),
        })?;
        let mut stems = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| SourceError::Io {
                    reference: label.clone(),
                    message: err.to_string(),
                })?
                .path();
            let is_unit = path
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| UNIT_EXTENSIONS.contains(&extension));
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()).filter(|_| is_unit) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();
        stems.dedup();
        Ok(stems
            .into_iter()
            .map(|stem| MapperReference::Type(TypeName::new(format!("{package}.{stem}"))))
            .collect())
    }

    fn properties(&self, reference: &MapperReference) -> Result<BTreeMap<String, String>, SourceError> {
        let path = self.locate(reference)?;
        let label = reference.to_string();
        let content = read_document(&path, &label)?;
        decode_properties(&path, &content, &label)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates `path` against length limits.
fn validate_path(path: &Path, reference: &str) -> Result<(), SourceError> {
    let invalid = |message: &str| SourceError::Invalid {
        reference: reference.to_string(),
        message: message.to_string(),
    };
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(invalid("path exceeds max length"));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(invalid("path component too long"));
        }
    }
    Ok(())
}

/// Reads a bounded UTF-8 document.
fn read_document(path: &Path, reference: &str) -> Result<String, SourceError> {
    validate_path(path, reference)?;
    let bytes = fs::read(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            SourceError::NotFound {
                reference: reference.to_string(),
            }
        } else {
            SourceError::Io {
                reference: reference.to_string(),
                message: err.to_string(),
            }
        }
    })?;
    if bytes.len() > MAX_DOCUMENT_SIZE {
        return Err(SourceError::Invalid {
            reference: reference.to_string(),
            message: "document exceeds size limit".to_string(),
        });
    }
    String::from_utf8(bytes).map_err(|_| SourceError::Invalid {
        reference: reference.to_string(),
        message: "document must be utf-8".to_string(),
    })
}

/// Returns true when `path` names a JSON document.
fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}

/// Decodes a node tree.
fn decode_node(path: &Path, content: &str, reference: &str) -> Result<Node, SourceError> {
    let parsed = if is_json(path) {
        serde_json::from_str(content).map_err(|err| err.to_string())
    } else {
        toml::from_str(content).map_err(|err| err.to_string())
    };
    parsed.map_err(|message| SourceError::Parse {
        reference: reference.to_string(),
        message,
    })
}

/// Decodes a flat property table; non-string scalars keep their literal form.
fn decode_properties(path: &Path, content: &str, reference: &str) -> Result<BTreeMap<String, String>, SourceError> {
    let parse_error = |message: String| SourceError::Parse {
        reference: reference.to_string(),
        message,
    };
    if is_json(path) {
        let table: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(content).map_err(|err| parse_error(err.to_string()))?;
        return Ok(table
            .into_iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(text) => (key, text),
                other => (key, other.to_string()),
            })
            .collect());
    }
    let table: BTreeMap<String, toml::Value> = toml::from_str(content).map_err(|err| parse_error(err.to_string()))?;
    Ok(table
        .into_iter()
        .map(|(key, value)| match value {
            toml::Value::String(text) => (key, text),
            other => (key, other.to_string()),
        })
        .collect())
}
