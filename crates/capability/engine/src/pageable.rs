//! 分页与排序状态。
//!
//! 请求参数 `sort<Id>` 的格式：`page:0;pageSize:25;name:asc;age:desc`。

use appng_schema::SortOrder;
use domain::Value;
use std::cmp::Ordering;

/// 单个排序字段。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

/// 分页请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pageable {
    pub page: u32,
    pub page_size: u32,
    pub sort: Vec<SortField>,
}

impl Pageable {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            sort: Vec::new(),
        }
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        let field = field.into();
        self.sort.retain(|sort| sort.field != field);
        self.sort.push(SortField { field, order });
        self
    }

    /// 解析 `sort<Id>` 参数值；无法识别的片段忽略。
    pub fn parse(raw: &str, default_page_size: u32) -> Self {
        let mut pageable = Self::new(0, default_page_size);
        for part in raw.split(';').map(str::trim).filter(|part| !part.is_empty()) {
            let Some((key, value)) = part.split_once(':') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "page" => {
                    if let Ok(page) = value.parse::<u32>() {
                        pageable.page = page;
                    }
                }
                "pageSize" => {
                    if let Ok(size) = value.parse::<u32>()
                        && size > 0
                    {
                        pageable.page_size = size;
                    }
                }
                field => match value {
                    "asc" => pageable = pageable.with_sort(field, SortOrder::Asc),
                    "desc" => pageable = pageable.with_sort(field, SortOrder::Desc),
                    _ => {}
                },
            }
        }
        pageable
    }

    /// 同排序同页大小的第一页。
    pub fn first_page(&self) -> Self {
        Self {
            page: 0,
            ..self.clone()
        }
    }

    pub fn offset(&self) -> usize {
        self.page as usize * self.page_size as usize
    }

    pub fn to_query_value(&self) -> String {
        let mut parts = vec![
            format!("page:{}", self.page),
            format!("pageSize:{}", self.page_size),
        ];
        parts.extend(
            self.sort
                .iter()
                .map(|sort| format!("{}:{}", sort.field, sort.order.as_str())),
        );
        parts.join(";")
    }
}

/// 数据源的排序参数名：`sort` + 首字母大写的数据源 id。
pub fn sort_parameter_name(datasource_id: &str) -> String {
    let mut chars = datasource_id.chars();
    match chars.next() {
        Some(first) => format!("sort{}{}", first.to_uppercase(), chars.as_str()),
        None => "sort".to_string(),
    }
}

/// 一页数据。
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub number: u32,
    pub size: u32,
    pub total: u64,
}

impl Page {
    pub fn new(items: Vec<Value>, pageable: &Pageable, total: u64) -> Self {
        Self {
            items,
            number: pageable.page,
            size: pageable.page_size,
            total,
        }
    }

    /// 对完整集合排序并截取请求页。
    pub fn of(mut all: Vec<Value>, pageable: &Pageable) -> Self {
        if !pageable.sort.is_empty() {
            all.sort_by(|left, right| compare_items(left, right, &pageable.sort));
        }
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(pageable.offset())
            .take(pageable.page_size as usize)
            .collect();
        Self::new(items, pageable, total)
    }

    pub fn total_pages(&self) -> u32 {
        if self.size == 0 {
            return 1;
        }
        self.total.div_ceil(self.size as u64).max(1) as u32
    }

    /// 请求页超出现有页数（第一页永远有效）。
    pub fn is_out_of_range(&self) -> bool {
        self.number > 0 && self.number >= self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn compare_items(left: &Value, right: &Value, sort: &[SortField]) -> Ordering {
    for field in sort {
        let left_value = property(left, &field.field);
        let right_value = property(right, &field.field);
        let ordering = compare_values(left_value, right_value);
        let ordering = match field.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn property<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    item.as_instance().and_then(|instance| instance.get(path))
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) if !matches!(left, Value::Text(_)) => {
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            _ => left.to_string().cmp(&right.to_string()),
        },
    }
}
