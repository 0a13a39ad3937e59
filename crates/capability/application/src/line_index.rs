use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;

/// 元素行号索引：记录带 `id`/`name` 属性的元素所在行（从 1 开始）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlLineIndex {
    lines: BTreeMap<(String, String), usize>,
}

impl XmlLineIndex {
    /// 解析失败时返回已收集的部分。
    pub fn build(xml: &str) -> Self {
        let mut index = Self::default();
        let mut reader = Reader::from_str(xml);
        loop {
            let start = reader.buffer_position() as usize;
            match reader.read_event() {
                Ok(Event::Start(ref element)) | Ok(Event::Empty(ref element)) => {
                    if let Some(key) = identifier(element) {
                        let line = line_at(xml, start);
                        index.lines.entry(key).or_insert(line);
                    }
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
        }
        index
    }

    pub fn line_of(&self, element: &str, id: &str) -> Option<usize> {
        self.lines
            .get(&(element.to_string(), id.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn identifier(element: &BytesStart<'_>) -> Option<(String, String)> {
    let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
    let mut fallback = None;
    for attribute in element.attributes().flatten() {
        let key = attribute.key.local_name();
        let value = String::from_utf8_lossy(&attribute.value).into_owned();
        match key.as_ref() {
            b"id" => return Some((name, value)),
            b"name" => fallback = Some(value),
            _ => {}
        }
    }
    fallback.map(|value| (name, value))
}

/// 事件起始偏移之后的首个 `<` 所在行。
fn line_at(xml: &str, offset: usize) -> usize {
    let offset = offset.min(xml.len());
    let tag = xml[offset..]
        .find('<')
        .map(|position| offset + position)
        .unwrap_or(offset);
    xml.as_bytes()[..tag].iter().filter(|byte| **byte == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_lines_of_identified_elements() {
        let xml = "<datasources>\n  <datasource id=\"a\">\n    <config/>\n  </datasource>\n  <datasource id=\"b\"/>\n</datasources>";
        let index = XmlLineIndex::build(xml);
        assert_eq!(index.line_of("datasource", "a"), Some(2));
        assert_eq!(index.line_of("datasource", "b"), Some(5));
        assert_eq!(index.line_of("datasource", "c"), None);
    }

    #[test]
    fn name_attribute_is_used_without_id() {
        let xml = "<page id=\"p\">\n<param name=\"x\"/>\n</page>";
        let index = XmlLineIndex::build(xml);
        assert_eq!(index.line_of("param", "x"), Some(2));
        assert_eq!(index.len(), 2);
    }
}
