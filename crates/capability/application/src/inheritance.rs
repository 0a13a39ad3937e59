//! 数据源继承（`child::parent`）。
//!
//! 待继承的数据源进入工作队列，逐轮解析；某一轮没有任何进展时终止，
//! 剩余条目记录错误后丢弃。

use appng_schema::{Bean, DataConfig, Datasource, FieldDef, Label, Labels, Linkpanel, Params};
use std::collections::BTreeMap;
use tracing::{debug, error};

pub const INHERITANCE_SEPARATOR: &str = "::";

/// 拆分继承 id：`a::b` → (`a`, `b`)；`a::b::c` 中的父级为 `b`，
/// `b` 自身的继承由其声明决定。
pub fn split_inheritance_id(id: &str) -> Option<(&str, &str)> {
    let (child, rest) = id.split_once(INHERITANCE_SEPARATOR)?;
    let parent = rest
        .split(INHERITANCE_SEPARATOR)
        .next()
        .unwrap_or(rest);
    if child.is_empty() || parent.is_empty() {
        return None;
    }
    Some((child, parent))
}

/// 等待解析的继承数据源。
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDatasource {
    pub resource: String,
    pub datasource: Datasource,
}

#[derive(Debug, Default)]
pub struct InheritanceOutcome {
    /// 已解析：派生 id → 来源资源
    pub resolved: Vec<(String, String)>,
    pub dropped: Vec<PendingDatasource>,
}

/// 在 `datasources` 上执行继承直到不动点。
pub fn process_inheritance(
    application: &str,
    datasources: &mut BTreeMap<String, Datasource>,
    pending: Vec<PendingDatasource>,
) -> InheritanceOutcome {
    let mut outcome = InheritanceOutcome::default();
    let mut worklist = pending;
    while !worklist.is_empty() {
        let before = worklist.len();
        let mut deferred = Vec::new();
        for entry in worklist {
            let Some((child_id, parent_id)) = split_inheritance_id(&entry.datasource.id) else {
                deferred.push(entry);
                continue;
            };
            match datasources.get(parent_id) {
                Some(parent) => {
                    let merged = merge_datasource(parent, &entry.datasource, child_id);
                    debug!(
                        target: "appng.application",
                        application = %application,
                        datasource_id = %child_id,
                        parent_id = %parent_id,
                        "datasource_inherited"
                    );
                    outcome
                        .resolved
                        .push((child_id.to_string(), entry.resource.clone()));
                    datasources.insert(child_id.to_string(), merged);
                }
                None => deferred.push(entry),
            }
        }
        if deferred.len() == before {
            for entry in &deferred {
                error!(
                    target: "appng.application",
                    application = %application,
                    datasource_id = %entry.datasource.id,
                    resource = %entry.resource,
                    "datasource_inheritance_unresolved"
                );
            }
            outcome.dropped = deferred;
            break;
        }
        worklist = deferred;
    }
    outcome
}

/// 以父数据源为基础合并子数据源。
pub fn merge_datasource(parent: &Datasource, child: &Datasource, child_id: &str) -> Datasource {
    let mut merged = parent.clone();
    merged.id = child_id.to_string();
    merge_config(&mut merged.config, &child.config);
    merged.bean = match (merged.bean.take(), &child.bean) {
        (Some(base), Some(overlay)) => Some(merge_bean(base, overlay)),
        (base, None) => base,
        (None, Some(overlay)) => Some(overlay.clone()),
    };
    if child.data.is_some() {
        merged.data = child.data.clone();
    }
    merged
}

fn merge_config(target: &mut DataConfig, overlay: &DataConfig) {
    if overlay.title.is_some() {
        target.title = overlay.title.clone();
    }
    if overlay.description.is_some() {
        target.description = overlay.description.clone();
    }
    if let Some(labels) = &overlay.labels {
        let base = target.labels.get_or_insert_with(Labels::default);
        merge_labels(&mut base.labels, &labels.labels);
    }
    if overlay.permissions.is_some() {
        target.permissions = overlay.permissions.clone();
    }
    if let Some(params) = &overlay.params {
        let base = target.params.get_or_insert_with(Params::default);
        merge_by(&mut base.params, &params.params, |param| param.name.clone());
    }
    if let Some(overlay_meta) = &overlay.meta_data {
        match target.meta_data.as_mut() {
            Some(base) => {
                if overlay_meta.bind_class.is_some() {
                    base.bind_class = overlay_meta.bind_class.clone();
                }
                if overlay_meta.binding.is_some() {
                    base.binding = overlay_meta.binding.clone();
                }
                if overlay_meta.result_selector.is_some() {
                    base.result_selector = overlay_meta.result_selector.clone();
                }
                if overlay_meta.validation.is_some() {
                    base.validation = overlay_meta.validation.clone();
                }
                merge_fields(&mut base.fields, &overlay_meta.fields);
            }
            None => target.meta_data = Some(overlay_meta.clone()),
        }
    }
    merge_linkpanels(&mut target.linkpanels, &overlay.linkpanels);
}

fn merge_labels(target: &mut Vec<Label>, overlay: &[Label]) {
    merge_by(target, overlay, |label| label.id.clone());
}

/// 同名字段原位替换，新字段追加到末尾。
fn merge_fields(target: &mut Vec<FieldDef>, overlay: &[FieldDef]) {
    merge_by(target, overlay, |field| field.name.clone());
}

fn merge_linkpanels(target: &mut Vec<Linkpanel>, overlay: &[Linkpanel]) {
    merge_by(target, overlay, |panel| panel.id.clone());
}

fn merge_bean(mut base: Bean, overlay: &Bean) -> Bean {
    if !overlay.id.is_empty() {
        base.id = overlay.id.clone();
    }
    merge_by(&mut base.options, &overlay.options, |option| option.name.clone());
    base
}

fn merge_by<T: Clone, K: PartialEq>(target: &mut Vec<T>, overlay: &[T], key: impl Fn(&T) -> K) {
    for item in overlay {
        let item_key = key(item);
        match target.iter_mut().find(|existing| key(existing) == item_key) {
            Some(existing) => *existing = item.clone(),
            None => target.push(item.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appng_schema::{FieldType, MetaData};

    fn with_fields(id: &str, fields: &[&str]) -> Datasource {
        let mut datasource = Datasource::new(id);
        datasource.config.meta_data = Some(MetaData {
            fields: fields
                .iter()
                .map(|name| FieldDef::new(*name, FieldType::Text))
                .collect(),
            ..MetaData::default()
        });
        datasource
    }

    #[test]
    fn splits_child_and_parent() {
        assert_eq!(split_inheritance_id("a::b"), Some(("a", "b")));
        assert_eq!(split_inheritance_id("a::b::c"), Some(("a", "b")));
        assert_eq!(split_inheritance_id("plain"), None);
        assert_eq!(split_inheritance_id("::b"), None);
    }

    #[test]
    fn fields_merge_in_place_and_append() {
        let parent = with_fields("base", &["id", "name"]);
        let mut child = with_fields("extended::base", &["name", "email"]);
        if let Some(meta) = child.config.meta_data.as_mut() {
            meta.fields[0].readonly = Some(true);
        }
        let merged = merge_datasource(&parent, &child, "extended");
        let names: Vec<&str> = merged.config.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "email"]);
        assert!(merged.config.fields()[1].is_readonly());
        assert_eq!(merged.id, "extended");
    }

    #[test]
    fn unresolved_parent_is_dropped() {
        let mut datasources = BTreeMap::new();
        let outcome = process_inheritance(
            "demo",
            &mut datasources,
            vec![PendingDatasource {
                resource: "ds.xml".to_string(),
                datasource: Datasource::new("orphan::missing"),
            }],
        );
        assert!(datasources.is_empty());
        assert_eq!(outcome.dropped.len(), 1);
    }
}
