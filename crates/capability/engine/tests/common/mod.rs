#![allow(dead_code)]

use appng_application::{ApplicationConfigProvider, InMemoryResources, LoadOptions};
use appng_binding::{BindRegistry, PropertyDescriptor, PropertyKind, TypeDescriptor};
use appng_engine::{
    ActionProvider, ApplicationRequest, ApplicationRuntime, BeanRegistry, DataContainer,
    DataProvider, FieldProcessor, InMemoryMessageSource, Options, Pageable, ProviderError,
};
use async_trait::async_trait;
use domain::{
    ApplicationContext, Group, InMemorySessionStore, Instance, PropertyHolder, RequestContext,
    Role, Site, Subject, Value,
};
use std::sync::{Arc, Mutex};

pub const SERVLET_PATH: &str = "/manager/localhost/demo/persons";

const APPLICATION: &str = r#"<application>
  <name>demo</name>
  <permissions>
    <permission id="persons.list">list</permission>
    <permission id="persons.edit">edit</permission>
  </permissions>
</application>"#;

const ROOT_CONFIG: &str = r#"<applicationRootConfig>
  <name>demo</name>
  <config>
    <default-page>persons</default-page>
    <session>
      <session-params>
        <session-param name="lang"/>
      </session-params>
    </session>
  </config>
</applicationRootConfig>"#;

const DATASOURCES: &str = r##"<datasources>
  <datasource id="persons">
    <config>
      <title id="persons.title" params="#{filter}, 'a, b'"/>
      <permissions>
        <permission ref="persons.list" mode="SET"/>
      </permissions>
      <params>
        <param name="filter" default="all"/>
      </params>
      <meta-data bindClass="Person">
        <field name="id" type="int" readonly="true"/>
        <field name="name" type="text"/>
      </meta-data>
    </config>
    <bean id="personProvider"/>
  </datasource>
  <datasource id="tags">
    <config>
      <meta-data bindClass="Set"/>
    </config>
    <bean id="tagProvider"/>
  </datasource>
  <datasource id="broken">
    <config>
      <meta-data bindClass="Person">
        <field name="name" type="text"/>
      </meta-data>
    </config>
    <bean id="brokenProvider"/>
  </datasource>
  <datasource id="empty">
    <config/>
    <bean id="emptyProvider"/>
  </datasource>
  <datasource id="withDefault">
    <config>
      <params>
        <param name="p" default="D"/>
      </params>
    </config>
  </datasource>
  <datasource id="noDefault">
    <config>
      <params>
        <param name="p"/>
      </params>
    </config>
  </datasource>
</datasources>"##;

const EVENTS: &str = r#"<events>
  <event id="personEvent">
    <config/>
    <action id="create" onSuccess="/persons">
      <config>
        <meta-data bindClass="Person">
          <field name="id" type="int" readonly="true"/>
          <field name="name" type="text"/>
          <field name="password" type="password"/>
        </meta-data>
      </config>
      <bean id="savePerson"/>
    </action>
    <action id="fail">
      <config>
        <meta-data bindClass="Person">
          <field name="name" type="text"/>
        </meta-data>
      </config>
      <bean id="failingAction"/>
    </action>
    <action id="reject">
      <config>
        <meta-data bindClass="Person">
          <field name="name" type="text"/>
          <field name="password" type="password"/>
        </meta-data>
      </config>
      <bean id="rejectingAction"/>
    </action>
    <action id="flag" onSuccess="/persons">
      <config/>
      <bean id="flaggingAction"/>
    </action>
    <action id="edit">
      <config/>
      <datasource id="broken"/>
      <bean id="savePerson"/>
    </action>
    <action id="import" async="true">
      <config/>
      <bean id="failingAction"/>
    </action>
    <action id="crash" async="true">
      <config/>
      <bean id="panickingAction"/>
    </action>
    <action id="export" async="true">
      <config/>
      <bean id="savePerson"/>
    </action>
  </event>
</events>"#;

const PAGES: &str = r#"<pages>
  <page id="persons" type="index">
    <config>
      <title id="persons.page"/>
      <url-schema>
        <url-params>
          <param name="action"/>
        </url-params>
        <get-params>
          <param name="filter"/>
        </get-params>
      </url-schema>
    </config>
    <structure>
      <section id="main">
        <element>
          <datasource id="persons">
            <params>
              <param name="filter">${filter}</param>
            </params>
          </datasource>
        </element>
        <element>
          <action eventId="personEvent" id="create">
            <condition expression="${action eq 'create'}"/>
          </action>
        </element>
      </section>
    </structure>
  </page>
  <page id="admin">
    <config>
      <permissions>
        <permission ref="persons.edit" mode="SET"/>
      </permissions>
    </config>
    <structure/>
  </page>
</pages>"#;

pub fn registry() -> BindRegistry {
    BindRegistry::new()
        .with_type(
            TypeDescriptor::new("Person")
                .property(PropertyDescriptor::new("id", PropertyKind::Int))
                .property(PropertyDescriptor::new("name", PropertyKind::Text))
                .property(PropertyDescriptor::new("password", PropertyKind::Text)),
        )
        .with_type(TypeDescriptor::interface("Set"))
        .with_type(TypeDescriptor::interface("List"))
        .with_type(TypeDescriptor::new("ArrayList").assignable_to(&["List"]))
}

pub fn person(id: i64, name: &str) -> Value {
    Value::Object(Instance::new("Person").with("id", id).with("name", name))
}

/// 返回三个人员，按请求的分页切片。
pub struct PersonProvider;

#[async_trait]
impl DataProvider for PersonProvider {
    async fn get_data(
        &self,
        _context: &RequestContext,
        _options: &Options,
        _request: &ApplicationRequest,
        field_processor: &mut FieldProcessor,
    ) -> Result<Option<DataContainer>, ProviderError> {
        let pageable = field_processor
            .pageable()
            .cloned()
            .unwrap_or_else(|| Pageable::new(0, 25));
        let persons = vec![person(1, "Jane"), person(2, "John"), person(3, "Jim")];
        Ok(Some(DataContainer::from_items(persons, &pageable)))
    }
}

/// 返回与声明的 `Set` 不兼容的 `ArrayList`。
pub struct TagProvider;

#[async_trait]
impl DataProvider for TagProvider {
    async fn get_data(
        &self,
        _context: &RequestContext,
        _options: &Options,
        _request: &ApplicationRequest,
        _field_processor: &mut FieldProcessor,
    ) -> Result<Option<DataContainer>, ProviderError> {
        Ok(Some(DataContainer::single(Instance::new("ArrayList"))))
    }
}

pub struct BrokenProvider;

#[async_trait]
impl DataProvider for BrokenProvider {
    async fn get_data(
        &self,
        _context: &RequestContext,
        _options: &Options,
        _request: &ApplicationRequest,
        _field_processor: &mut FieldProcessor,
    ) -> Result<Option<DataContainer>, ProviderError> {
        Err(ProviderError::message("person.missing", &["42"]))
    }
}

pub struct EmptyProvider;

#[async_trait]
impl DataProvider for EmptyProvider {
    async fn get_data(
        &self,
        _context: &RequestContext,
        _options: &Options,
        _request: &ApplicationRequest,
        _field_processor: &mut FieldProcessor,
    ) -> Result<Option<DataContainer>, ProviderError> {
        Ok(None)
    }
}

/// 记录收到的绑定对象。
#[derive(Default)]
pub struct SavePerson {
    pub saved: Mutex<Vec<Instance>>,
}

impl SavePerson {
    pub fn saved(&self) -> Vec<Instance> {
        self.saved.lock().map(|saved| saved.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ActionProvider for SavePerson {
    async fn perform(
        &self,
        _context: &RequestContext,
        _options: &Options,
        _request: &ApplicationRequest,
        bind_object: Option<&Instance>,
        field_processor: &mut FieldProcessor,
    ) -> Result<(), ProviderError> {
        if let Some(instance) = bind_object
            && let Ok(mut saved) = self.saved.lock()
        {
            saved.push(instance.clone());
        }
        field_processor.add_ok_message("saved");
        Ok(())
    }
}

pub struct FailingAction;

#[async_trait]
impl ActionProvider for FailingAction {
    async fn perform(
        &self,
        _context: &RequestContext,
        _options: &Options,
        _request: &ApplicationRequest,
        _bind_object: Option<&Instance>,
        _field_processor: &mut FieldProcessor,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::failed("database unavailable"))
    }
}

/// 通过字段处理器报告错误，但正常返回。
pub struct FlaggingAction;

#[async_trait]
impl ActionProvider for FlaggingAction {
    async fn perform(
        &self,
        _context: &RequestContext,
        _options: &Options,
        _request: &ApplicationRequest,
        _bind_object: Option<&Instance>,
        field_processor: &mut FieldProcessor,
    ) -> Result<(), ProviderError> {
        field_processor.add_error_message("X");
        Ok(())
    }
}

/// 执行时 panic。
pub struct PanickingAction;

#[async_trait]
impl ActionProvider for PanickingAction {
    async fn perform(
        &self,
        _context: &RequestContext,
        _options: &Options,
        _request: &ApplicationRequest,
        _bind_object: Option<&Instance>,
        _field_processor: &mut FieldProcessor,
    ) -> Result<(), ProviderError> {
        let rows: Vec<Instance> = Vec::new();
        let _first = &rows[0];
        Ok(())
    }
}

pub struct RejectingAction;

#[async_trait]
impl ActionProvider for RejectingAction {
    async fn perform(
        &self,
        _context: &RequestContext,
        _options: &Options,
        _request: &ApplicationRequest,
        bind_object: Option<&Instance>,
        _field_processor: &mut FieldProcessor,
    ) -> Result<(), ProviderError> {
        let name = bind_object
            .and_then(|instance| instance.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Err(ProviderError::message("person.exists", &[name.as_str()]))
    }
}

pub struct Fixture {
    pub runtime: ApplicationRuntime,
    pub saved: Arc<SavePerson>,
}

pub fn fixture() -> Fixture {
    let registry = Arc::new(registry());
    let resources = Arc::new(
        InMemoryResources::new()
            .with_application_xml(APPLICATION)
            .with_resource("conf/root.xml", ROOT_CONFIG)
            .with_resource("conf/datasources.xml", DATASOURCES)
            .with_resource("conf/events.xml", EVENTS)
            .with_resource("conf/pages.xml", PAGES),
    );
    let config = ApplicationConfigProvider::load(
        "demo",
        resources,
        registry.clone(),
        LoadOptions::default(),
    )
    .expect("load config");

    let saved = Arc::new(SavePerson::default());
    let beans = BeanRegistry::new()
        .with_data_provider("personProvider", Arc::new(PersonProvider))
        .with_data_provider("tagProvider", Arc::new(TagProvider))
        .with_data_provider("brokenProvider", Arc::new(BrokenProvider))
        .with_data_provider("emptyProvider", Arc::new(EmptyProvider))
        .with_action_provider("savePerson", saved.clone())
        .with_action_provider("failingAction", Arc::new(FailingAction))
        .with_action_provider("rejectingAction", Arc::new(RejectingAction))
        .with_action_provider("flaggingAction", Arc::new(FlaggingAction))
        .with_action_provider("panickingAction", Arc::new(PanickingAction));
    let messages = InMemoryMessageSource::new()
        .with_message("en", "person.exists", "Person {0} already exists")
        .with_message("en", "person.missing", "Person {0} not found")
        .with_message("en", "persons.title", "Persons: {0} [{1}]");
    let runtime = ApplicationRuntime::new(Arc::new(config), Arc::new(beans), registry)
        .with_messages(Arc::new(messages));
    Fixture { runtime, saved }
}

pub fn subject(permissions: &[&str]) -> Subject {
    Subject::new(
        "jane",
        vec![Group {
            name: "users".to_string(),
            roles: vec![Role::new("user", "demo", permissions)],
        }],
    )
}

pub fn context(subject: Option<Subject>) -> RequestContext {
    RequestContext::new(
        Site::new("localhost", "localhost", "http://localhost:8080"),
        ApplicationContext::new("demo", PropertyHolder::new("demo.", Vec::new())),
        subject,
        Arc::new(InMemorySessionStore::new()),
    )
    .with_servlet_path(SERVLET_PATH)
}

pub fn full_access() -> RequestContext {
    context(Some(subject(&["persons.list", "persons.edit"])))
}
