//! 绑定类型描述文件（`types.json`）。
//!
//! ```json
//! {
//!   "Person": {
//!     "properties": { "id": "int", "name": "text", "tags": "list:text", "address": "Address" },
//!     "assignableTo": ["Entity"]
//!   },
//!   "Entity": { "interface": true }
//! }
//! ```

use appng_binding::{BindRegistry, PropertyDescriptor, PropertyKind, TypeDescriptor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },
    #[error("invalid type file {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeEntry {
    #[serde(default)]
    interface: bool,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    assignable_to: Vec<String>,
    #[serde(default)]
    groups: Vec<String>,
}

/// 读取类型描述；文件不存在时返回空注册表。
pub fn load_registry(path: &Path) -> Result<BindRegistry, TypesError> {
    if !path.is_file() {
        return Ok(BindRegistry::new());
    }
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|err| TypesError::Read {
        path: display.clone(),
        message: err.to_string(),
    })?;
    parse_registry(&content).map_err(|err| TypesError::Parse {
        path: display,
        message: err.to_string(),
    })
}

fn parse_registry(content: &str) -> Result<BindRegistry, serde_json::Error> {
    let entries: BTreeMap<String, TypeEntry> = serde_json::from_str(content)?;
    let mut registry = BindRegistry::new();
    for (name, entry) in entries {
        for group in &entry.groups {
            registry.register_group(group.clone());
        }
        let mut descriptor = if entry.interface {
            TypeDescriptor::interface(name)
        } else {
            TypeDescriptor::new(name)
        };
        for (property, kind) in &entry.properties {
            descriptor = descriptor.property(PropertyDescriptor::new(property, property_kind(kind)));
        }
        let assignable: Vec<&str> = entry.assignable_to.iter().map(String::as_str).collect();
        registry.register(descriptor.assignable_to(&assignable));
    }
    Ok(registry)
}

fn property_kind(kind: &str) -> PropertyKind {
    if let Some(inner) = kind.strip_prefix("list:") {
        return PropertyKind::list_of(property_kind(inner));
    }
    match kind {
        "text" | "string" => PropertyKind::Text,
        "int" | "long" => PropertyKind::Int,
        "decimal" | "double" => PropertyKind::Decimal,
        "boolean" => PropertyKind::Bool,
        "date" => PropertyKind::Date,
        other => PropertyKind::object(other),
    }
}
