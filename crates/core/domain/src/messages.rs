/// 消息类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Notice,
    Ok,
    Error,
    Invalid,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Notice => "NOTICE",
            MessageKind::Ok => "OK",
            MessageKind::Error => "ERROR",
            MessageKind::Invalid => "INVALID",
        }
    }
}

/// 单条消息。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
    /// 产生消息的元素（动作/数据源 id），可为空。
    pub reference: Option<String>,
}

impl Message {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            reference: None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, MessageKind::Error | MessageKind::Invalid)
    }
}

/// 消息集合（保持添加顺序）。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Messages {
    items: Vec<Message>,
}

impl Messages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: Message) {
        self.items.push(message);
    }

    pub fn ok(&mut self, text: impl Into<String>) {
        self.add(Message::new(MessageKind::Ok, text));
    }

    pub fn notice(&mut self, text: impl Into<String>) {
        self.add(Message::new(MessageKind::Notice, text));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.add(Message::new(MessageKind::Error, text));
    }

    pub fn invalid(&mut self, text: impl Into<String>) {
        self.add(Message::new(MessageKind::Invalid, text));
    }

    pub fn extend(&mut self, other: &Messages) {
        self.items.extend(other.items.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Message::is_error)
    }

    pub fn of_kind(&self, kind: MessageKind) -> Vec<&Message> {
        self.items.iter().filter(|message| message.kind == kind).collect()
    }

    /// 保留满足条件的消息。
    pub fn retain(&mut self, keep: impl FnMut(&Message) -> bool) {
        self.items.retain(keep);
    }

    /// 返回 `self` 中不在 `before` 里的消息（按出现次数计算）。
    pub fn added_since(&self, before: &Messages) -> Messages {
        let mut remaining = before.items.clone();
        let mut added = Messages::new();
        for message in &self.items {
            if let Some(index) = remaining.iter().position(|existing| existing == message) {
                remaining.remove(index);
            } else {
                added.add(message.clone());
            }
        }
        added
    }

    /// 删除与 `other` 中相同的消息（每条只删一次）。
    pub fn remove_all(&mut self, other: &Messages) {
        for message in &other.items {
            if let Some(index) = self.items.iter().position(|existing| existing == message) {
                self.items.remove(index);
            }
        }
    }
}
