use appng_application::{
    ApplicationConfigProvider, InMemoryResources, InvalidConfigurationError, LoadOptions,
    Resource, ResourceKind, Resources,
};
use appng_binding::BindRegistry;
use appng_schema::MarshallService;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

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

const BASE: &str = r#"<datasources>
  <datasource id="base">
    <config>
      <title id="base.title">Base</title>
      <params>
        <param name="id"/>
      </params>
      <meta-data bindClass="Person">
        <field name="id" type="int" readonly="true"/>
        <field name="name" type="text"/>
      </meta-data>
    </config>
    <bean id="personProvider">
      <option name="mode" id="list"/>
    </bean>
  </datasource>
</datasources>"#;

const DERIVED: &str = r#"<datasources>
  <datasource id="middle::base">
    <config>
      <title id="middle.title">Middle</title>
      <meta-data>
        <field name="email" type="email"/>
      </meta-data>
    </config>
  </datasource>
  <datasource id="leaf::middle">
    <config>
      <params>
        <param name="filter" default="all"/>
      </params>
    </config>
    <bean id="">
      <option name="mode" id="leaf"/>
    </bean>
  </datasource>
  <datasource id="orphan::missing"/>
</datasources>"#;

const EVENTS: &str = r#"<events>
  <event id="personEvent">
    <config/>
    <action id="create">
      <config/>
    </action>
    <action id="create">
      <config>
        <title id="create.title">Create</title>
      </config>
    </action>
  </event>
</events>"#;

const PAGES: &str = r#"<pages>
  <page id="persons" type="index">
    <config>
      <url-schema>
        <url-params>
          <param name="action"/>
        </url-params>
      </url-schema>
    </config>
    <structure>
      <section>
        <element>
          <datasource id="base"/>
        </element>
      </section>
    </structure>
  </page>
</pages>"#;

fn resources(order: &[(&str, &str)]) -> Arc<InMemoryResources> {
    let mut resources = InMemoryResources::new().with_application_xml(APPLICATION);
    for (name, xml) in order {
        resources = resources.with_resource(*name, *xml);
    }
    Arc::new(resources)
}

/// 可在加载后修改内容的资源集合。
struct EditableResources {
    files: Mutex<BTreeMap<String, String>>,
}

impl EditableResources {
    fn new(order: &[(&str, &str)]) -> Self {
        let files = order
            .iter()
            .map(|(name, xml)| (name.to_string(), xml.to_string()))
            .collect();
        Self {
            files: Mutex::new(files),
        }
    }

    fn replace(&self, name: &str, xml: &str) {
        self.files
            .lock()
            .expect("files lock")
            .insert(name.to_string(), xml.to_string());
    }
}

impl Resources for EditableResources {
    fn application_descriptor(&self) -> Result<Option<Resource>, InvalidConfigurationError> {
        Ok(Some(Resource::new("application.xml", APPLICATION)))
    }

    fn config_resources(&self) -> Result<Vec<Resource>, InvalidConfigurationError> {
        let files = self.files.lock().map_err(|_| InvalidConfigurationError::Lock)?;
        Ok(files
            .iter()
            .map(|(name, xml)| Resource::new(name.clone(), xml.clone()))
            .collect())
    }
}

fn static_datasource(id: &str) -> String {
    format!(r#"<datasources><datasource id="{}"><config/></datasource></datasources>"#, id)
}

fn registry() -> Arc<BindRegistry> {
    Arc::new(BindRegistry::new())
}

fn load(order: &[(&str, &str)], options: LoadOptions) -> ApplicationConfigProvider {
    ApplicationConfigProvider::load("demo", resources(order), registry(), options)
        .expect("load config")
}

fn standard() -> Vec<(&'static str, &'static str)> {
    vec![
        ("conf/base.xml", BASE),
        ("conf/derived.xml", DERIVED),
        ("conf/events.xml", EVENTS),
        ("conf/pages.xml", PAGES),
        ("conf/root.xml", ROOT_CONFIG),
    ]
}

#[test]
fn loading_twice_is_idempotent() {
    let first = load(&standard(), LoadOptions::default());
    let second = load(&standard(), LoadOptions::default());
    assert_eq!(first.datasources(), second.datasources());
    assert_eq!(first.events(), second.events());
    assert_eq!(first.pages(), second.pages());
    assert_eq!(first.state().resource_names, second.state().resource_names);

    first.reload().expect("reload from snapshot");
    assert_eq!(first.datasources(), second.datasources());
}

#[test]
fn inheritance_is_independent_of_resource_order() {
    let forward = load(&standard(), LoadOptions::default());
    let mut reversed = standard();
    reversed.reverse();
    let backward = load(&reversed, LoadOptions::default());

    let leaf = forward.datasource("leaf").expect("leaf resolved");
    assert_eq!(backward.datasource("leaf"), Some(leaf.clone()));

    let titles = leaf.config.title.as_ref().map(|label| label.id.as_str());
    assert_eq!(titles, Some("middle.title"));
    let fields: Vec<&str> = leaf.config.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["id", "name", "email"]);
    let params: Vec<&str> = leaf.config.params().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["id", "filter"]);
    let bean = leaf.bean.as_ref().expect("bean");
    assert_eq!(bean.id, "personProvider");
    assert_eq!(bean.option("mode").and_then(|o| o.id.as_deref()), Some("leaf"));

    assert_eq!(
        forward.resource_name(ResourceKind::Datasource, "leaf").as_deref(),
        Some("conf/derived.xml")
    );
}

#[test]
fn unresolved_inheritance_is_dropped() {
    let provider = load(&standard(), LoadOptions::default());
    assert!(provider.datasource("orphan").is_none());
    assert!(provider.datasource("orphan::missing").is_none());
    assert!(provider.datasource("middle").is_some());
}

#[test]
fn duplicate_actions_keep_the_last_definition() {
    let provider = load(&standard(), LoadOptions::default());
    let event = provider.event("personEvent").expect("event");
    assert_eq!(event.actions.len(), 1);
    let action = provider.action("personEvent", "create").expect("action");
    assert_eq!(action.event_id.as_deref(), Some("personEvent"));
    assert!(action.config.title.is_some());
}

#[test]
fn root_config_provides_default_page_and_session_params() {
    let provider = load(&standard(), LoadOptions::default());
    assert_eq!(provider.default_page().as_deref(), Some("persons"));
    assert_eq!(provider.session_params(), vec!["lang".to_string()]);
}

#[test]
fn second_root_config_is_rejected() {
    let mut order = standard();
    order.push(("conf/root2.xml", ROOT_CONFIG));
    let result =
        ApplicationConfigProvider::load("demo", resources(&order), registry(), LoadOptions::default());
    assert!(matches!(
        result,
        Err(InvalidConfigurationError::DuplicateRootConfig { .. })
    ));
}

#[test]
fn missing_application_descriptor_is_rejected() {
    let resources = Arc::new(InMemoryResources::new().with_resource("conf/base.xml", BASE));
    let result = ApplicationConfigProvider::load("demo", resources, registry(), LoadOptions::default());
    assert!(matches!(
        result,
        Err(InvalidConfigurationError::MissingApplicationInfo(name)) if name == "demo"
    ));
}

#[test]
fn broken_and_unknown_resources_are_skipped() {
    let mut order = standard();
    order.push(("conf/unknown.xml", "<foo/>"));
    order.push(("conf/broken.xml", "<datasources><datasource id=\"x\">"));
    let provider = load(&order, LoadOptions::default());
    assert!(provider.datasource("base").is_some());
    assert!(provider.datasource("x").is_none());
}

#[test]
fn snapshot_roundtrip_and_clone() {
    let provider = load(&standard(), LoadOptions::default());
    let bytes = provider.write_data().expect("write data");

    let other = load(&[("conf/pages.xml", PAGES)], LoadOptions::default());
    other.read_data(&bytes).expect("read data");
    assert_eq!(other.datasources(), provider.datasources());

    let clone = provider.clone_config().expect("clone");
    assert_eq!(clone.datasources(), provider.datasources());
    clone.clear().expect("clear clone");
    assert!(clone.datasources().is_empty());
    assert!(provider.datasource("base").is_some());
}

#[test]
fn dev_mode_clone_reparses() {
    let provider = load(&standard(), LoadOptions::dev());
    let clone = provider.clone_config().expect("clone");
    assert_eq!(clone.datasources(), provider.datasources());
}

#[test]
fn dev_mode_rereads_changed_xml_on_access() {
    let one = static_datasource("one");
    let resources = Arc::new(EditableResources::new(&[
        ("conf/root.xml", ROOT_CONFIG),
        ("conf/datasources.xml", one.as_str()),
    ]));
    let provider =
        ApplicationConfigProvider::load("demo", resources.clone(), registry(), LoadOptions::dev())
            .expect("load config");
    assert!(provider.datasource("one").is_some());

    resources.replace("conf/datasources.xml", &static_datasource("two"));
    assert!(provider.datasource("two").is_some());
    assert!(provider.datasource("one").is_none());
}

#[test]
fn production_mode_serves_loaded_config_until_reload() {
    let one = static_datasource("one");
    let resources = Arc::new(EditableResources::new(&[
        ("conf/root.xml", ROOT_CONFIG),
        ("conf/datasources.xml", one.as_str()),
    ]));
    let provider = ApplicationConfigProvider::load(
        "demo",
        resources.clone(),
        registry(),
        LoadOptions::default(),
    )
    .expect("load config");

    resources.replace("conf/datasources.xml", &static_datasource("two"));
    assert!(provider.datasource("one").is_some());
    assert!(provider.datasource("two").is_none());
}

#[test]
fn inherited_datasource_survives_xml_roundtrip() {
    let provider = load(&standard(), LoadOptions::default());
    let middle = provider.datasource("middle").expect("middle");

    let service = MarshallService::new();
    let xml = service.marshal("datasource", &middle).expect("marshal");
    let parsed: appng_schema::Datasource = service.unmarshal_as(&xml).expect("unmarshal");
    assert_eq!(parsed, middle);
}
