//! 配置快照：带版本号的分类条目列表，serde_json 编码。

use crate::error::InvalidConfigurationError;
use crate::state::ConfigState;
use appng_schema::{ApplicationInfo, ApplicationRootConfig, Datasource, Event, PageDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotHeader {
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigSnapshot {
    version: u32,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
enum SnapshotEntry {
    Application(ApplicationInfo),
    Pages(BTreeMap<String, PageDefinition>),
    Events(BTreeMap<String, Event>),
    Datasources(BTreeMap<String, Datasource>),
    RootConfig(ApplicationRootConfig),
    DefaultPage(String),
    SessionParams(Vec<String>),
    ResourceNames(BTreeMap<String, String>),
}

pub fn write_snapshot(state: &ConfigState) -> Result<Vec<u8>, InvalidConfigurationError> {
    let mut entries = vec![
        SnapshotEntry::Application(state.application.clone()),
        SnapshotEntry::Pages(state.pages.clone()),
        SnapshotEntry::Events(state.events.clone()),
        SnapshotEntry::Datasources(state.datasources.clone()),
    ];
    if let Some(root_config) = &state.root_config {
        entries.push(SnapshotEntry::RootConfig(root_config.clone()));
    }
    if let Some(default_page) = &state.default_page {
        entries.push(SnapshotEntry::DefaultPage(default_page.clone()));
    }
    if !state.session_params.is_empty() {
        entries.push(SnapshotEntry::SessionParams(state.session_params.clone()));
    }
    entries.push(SnapshotEntry::ResourceNames(state.resource_names.clone()));
    let snapshot = ConfigSnapshot {
        version: SNAPSHOT_VERSION,
        entries,
    };
    serde_json::to_vec(&snapshot).map_err(|err| InvalidConfigurationError::Snapshot(err.to_string()))
}

pub fn read_snapshot(bytes: &[u8]) -> Result<ConfigState, InvalidConfigurationError> {
    let header: SnapshotHeader = serde_json::from_slice(bytes)
        .map_err(|err| InvalidConfigurationError::Snapshot(err.to_string()))?;
    if header.version != SNAPSHOT_VERSION {
        return Err(InvalidConfigurationError::Snapshot(format!(
            "unsupported snapshot version {} (expected {})",
            header.version, SNAPSHOT_VERSION
        )));
    }
    let snapshot: ConfigSnapshot = serde_json::from_slice(bytes)
        .map_err(|err| InvalidConfigurationError::Snapshot(err.to_string()))?;
    let mut state = ConfigState::default();
    for entry in snapshot.entries {
        match entry {
            SnapshotEntry::Application(application) => state.application = application,
            SnapshotEntry::Pages(pages) => state.pages = pages,
            SnapshotEntry::Events(events) => state.events = events,
            SnapshotEntry::Datasources(datasources) => state.datasources = datasources,
            SnapshotEntry::RootConfig(root_config) => state.root_config = Some(root_config),
            SnapshotEntry::DefaultPage(page) => state.default_page = Some(page),
            SnapshotEntry::SessionParams(params) => state.session_params = params,
            SnapshotEntry::ResourceNames(names) => state.resource_names = names,
        }
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_version_is_rejected() {
        let bytes = br#"{"version":99,"entries":[]}"#;
        assert!(matches!(
            read_snapshot(bytes),
            Err(InvalidConfigurationError::Snapshot(_))
        ));
    }

    #[test]
    fn snapshot_restores_state() {
        let mut state = ConfigState::default();
        state
            .datasources
            .insert("persons".to_string(), Datasource::new("persons"));
        state.default_page = Some("index".to_string());
        let bytes = write_snapshot(&state).expect("write");
        let restored = read_snapshot(&bytes).expect("read");
        assert_eq!(restored, state);
    }
}
