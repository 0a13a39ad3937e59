pub mod data;
pub mod messages;
pub mod properties;
pub mod session;
pub mod subject;

pub use data::{Instance, Value};
pub use messages::{Message, MessageKind, Messages};
pub use properties::{Property, PropertyHolder, PropertyType};
pub use session::{InMemorySessionStore, SessionError, SessionStore};
pub use subject::{Group, Role, Subject};

use std::sync::{Arc, Mutex};

/// 站点信息。
#[derive(Debug, Clone)]
pub struct Site {
    pub name: String,
    pub host: String,
    pub domain: String,
}

impl Site {
    pub fn new(name: impl Into<String>, host: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            domain: domain.into(),
        }
    }
}

/// 当前应用：名称与应用级属性。
#[derive(Debug, Clone)]
pub struct ApplicationContext {
    pub name: String,
    pub properties: PropertyHolder,
}

impl ApplicationContext {
    pub fn new(name: impl Into<String>, properties: PropertyHolder) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }
}

/// 重定向记录（HTTP 层负责真正发送）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub status: u16,
}

/// 请求上下文：所有模块共享的执行上下文。
///
/// 站点、应用、当前用户、会话与平台属性都通过该结构显式传递，
/// 不依赖任何全局查找。
#[derive(Clone)]
pub struct RequestContext {
    pub site: Site,
    pub application: ApplicationContext,
    pub subject: Option<Subject>,
    pub session: Arc<dyn SessionStore>,
    pub platform: PropertyHolder,
    pub locale: String,
    pub servlet_path: String,
    pub output_prefix: String,
    redirects: Arc<Mutex<Vec<Redirect>>>,
}

impl RequestContext {
    /// 构造显式身份与会话的请求上下文。
    pub fn new(
        site: Site,
        application: ApplicationContext,
        subject: Option<Subject>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            site,
            application,
            subject,
            session,
            platform: PropertyHolder::new("platform.", Vec::new()),
            locale: "en".to_string(),
            servlet_path: String::new(),
            output_prefix: String::new(),
            redirects: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_servlet_path(mut self, servlet_path: impl Into<String>) -> Self {
        self.servlet_path = servlet_path.into();
        self
    }

    pub fn with_output_prefix(mut self, output_prefix: impl Into<String>) -> Self {
        self.output_prefix = output_prefix.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_platform(mut self, platform: PropertyHolder) -> Self {
        self.platform = platform;
        self
    }

    /// 记录一次重定向。
    pub fn send_redirect(&self, target: impl Into<String>, status: u16) {
        let redirect = Redirect {
            target: target.into(),
            status,
        };
        match self.redirects.lock() {
            Ok(mut redirects) => redirects.push(redirect),
            Err(poisoned) => poisoned.into_inner().push(redirect),
        }
    }

    /// 已记录的重定向（按发生顺序）。
    pub fn redirects(&self) -> Vec<Redirect> {
        self.redirects
            .lock()
            .map(|redirects| redirects.clone())
            .unwrap_or_default()
    }

    pub fn is_redirected(&self) -> bool {
        !self.redirects().is_empty()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("site", &self.site.name)
            .field("application", &self.application.name)
            .field("subject", &self.subject.as_ref().map(|subject| &subject.name))
            .field("locale", &self.locale)
            .field("servlet_path", &self.servlet_path)
            .finish()
    }
}
