//! 绑定对象到输出模型（Result / Resultset）的转换。

use crate::field_processor::FieldProcessor;
use crate::pageable::Page;
use appng_binding::format_value;
use appng_expression::{ExpressionEvaluator, ParameterSupport};
use appng_schema::{Datafield, FieldDef, FieldType, Linkpanel, ResultRow, Resultset};
use domain::Value;
use std::collections::BTreeMap;

/// 单字段取值与格式化。
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldConverter;

impl FieldConverter {
    pub fn new() -> Self {
        Self
    }

    /// 从对象中按字段绑定路径取值并生成 `Datafield`；linkpanel 字段不产生值。
    pub fn datafield(&self, field: &FieldDef, item: &Value, parent: Option<&str>) -> Option<Datafield> {
        let binding = binding_of(field, parent);
        match field.field_type {
            FieldType::Linkpanel => None,
            FieldType::Object => {
                let mut datafield = Datafield::new(&field.name, "");
                datafield.fields = field
                    .fields
                    .iter()
                    .filter_map(|child| self.datafield(child, item, Some(&binding)))
                    .collect();
                Some(datafield)
            }
            FieldType::ListObject => {
                let mut datafield = Datafield::new(&field.name, "");
                let elements = lookup(item, &binding)
                    .and_then(Value::as_list)
                    .unwrap_or(&[]);
                for (index, element) in elements.iter().enumerate() {
                    let mut entry = Datafield::new(format!("{}[{}]", field.name, index), "");
                    entry.fields = field
                        .fields
                        .iter()
                        .filter_map(|child| self.datafield(child, element, None))
                        .collect();
                    datafield.fields.push(entry);
                }
                Some(datafield)
            }
            _ => {
                let value = lookup(item, &binding).cloned().unwrap_or(Value::Null);
                Some(Datafield::new(&field.name, format_value(field, &value)))
            }
        }
    }
}

fn binding_of(field: &FieldDef, parent: Option<&str>) -> String {
    match (&field.binding, parent) {
        (Some(binding), _) => binding.clone(),
        (None, Some(parent)) => format!("{}.{}", parent, field.name),
        (None, None) => field.name.clone(),
    }
}

fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    item.as_instance().and_then(|instance| instance.get(path))
}

/// 结果构建。
#[derive(Debug, Clone, Default)]
pub struct ResultService {
    converter: FieldConverter,
}

impl ResultService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 单条结果：逐字段取值，字段条件与 result-selector 以 `current` 求值。
    pub fn build_result(
        &self,
        field_processor: &FieldProcessor,
        item: &Value,
        evaluator: &ExpressionEvaluator,
    ) -> ResultRow {
        let mut row_evaluator = evaluator.clone();
        row_evaluator.set_variable("current", item.clone());

        let fields: Vec<Datafield> = field_processor
            .fields()
            .iter()
            .filter(|field| {
                field
                    .condition
                    .as_ref()
                    .is_none_or(|condition| row_evaluator.is_true(&condition.expression))
            })
            .filter_map(|field| self.converter.datafield(field, item, None))
            .collect();

        let selected = field_processor
            .meta_data()
            .result_selector
            .as_deref()
            .filter(|selector| row_evaluator.is_true(selector))
            .map(|_| true);

        let linkpanels = self.row_linkpanels(field_processor, &fields, &row_evaluator);
        ResultRow {
            selected,
            fields,
            linkpanels,
        }
    }

    /// 分页结果集，分页信息直接取自 `Page`。
    pub fn build_resultset(
        &self,
        field_processor: &FieldProcessor,
        page: &Page,
        evaluator: &ExpressionEvaluator,
    ) -> Resultset {
        let last_chunk = page.total_pages().saturating_sub(1);
        Resultset {
            chunk: page.number,
            chunk_name: field_processor.reference().to_string(),
            chunk_size: page.size,
            next_chunk: (page.number + 1).min(last_chunk),
            previous_chunk: page.number.saturating_sub(1),
            first_chunk: 0,
            last_chunk,
            hits: page.total,
            results: page
                .items
                .iter()
                .map(|item| self.build_result(field_processor, item, evaluator))
                .collect(),
        }
    }

    /// linkpanel 字段对应的行内链接面板：`#{field}` 取本行字段值，`${current.x}` 取对象属性。
    fn row_linkpanels(
        &self,
        field_processor: &FieldProcessor,
        fields: &[Datafield],
        row_evaluator: &ExpressionEvaluator,
    ) -> Vec<Linkpanel> {
        let inline: Vec<&FieldDef> = field_processor
            .fields()
            .iter()
            .filter(|field| field.field_type == FieldType::Linkpanel)
            .collect();
        if inline.is_empty() {
            return Vec::new();
        }
        let values: BTreeMap<String, String> = fields
            .iter()
            .map(|field| (field.name.clone(), field.value.clone()))
            .collect();
        let Ok(row_parameters) = ParameterSupport::hash(values) else {
            return Vec::new();
        };
        inline
            .into_iter()
            .filter_map(|field| field_processor.linkpanel(&field.name))
            .map(|linkpanel| {
                let mut linkpanel = linkpanel.clone();
                linkpanel.links.retain(|link| {
                    link.condition
                        .as_ref()
                        .is_none_or(|condition| row_evaluator.is_true(&condition.expression))
                });
                for link in linkpanel.links.iter_mut() {
                    let target = row_parameters.replace(&link.target);
                    link.target = row_evaluator
                        .evaluate_template(&target)
                        .unwrap_or(target);
                }
                linkpanel
            })
            .collect()
    }
}
