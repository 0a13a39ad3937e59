mod common;

use appng_engine::{ApplicationRequest, ElementOutput, PageProcessor};
use common::{SERVLET_PATH, context, fixture, full_access, subject};

#[tokio::test]
async fn page_runs_datasources_and_includes_actions() {
    let fx = fixture();
    let ctx = full_access();
    let request = ApplicationRequest::get()
        .with_url_parameters(&["create"])
        .with_parameter("filter", "active");
    let output = PageProcessor::new(fx.runtime.clone())
        .process(&ctx, Some("persons"), &request)
        .await
        .expect("process page");

    assert!(output.permitted);
    assert!(output.redirect.is_none());
    assert_eq!(output.parameters.get("action").map(String::as_str), Some("create"));
    assert_eq!(output.parameters.get("filter").map(String::as_str), Some("active"));
    assert_eq!(output.title.as_ref().map(|title| title.value.as_str()), Some("persons.page"));

    let section = output.section("main").expect("main section");
    assert_eq!(section.elements.len(), 2);
    assert!(matches!(section.elements[0], ElementOutput::Datasource(_)));
    assert!(matches!(section.elements[1], ElementOutput::Action(_)));
    assert!(output.datasource("persons").is_some());
    assert!(output.action("create").is_some());
    assert!(output.errors().is_empty());
    assert!(fx.saved.saved().is_empty());
}

#[tokio::test]
async fn action_reference_condition_hides_the_action() {
    let fx = fixture();
    let output = PageProcessor::new(fx.runtime.clone())
        .process(&full_access(), Some("persons"), &ApplicationRequest::get())
        .await
        .expect("process page");
    assert!(output.action("create").is_none());
    assert!(output.datasource("persons").is_some());
}

#[tokio::test]
async fn default_page_is_used_without_page_id() {
    let fx = fixture();
    let output = PageProcessor::new(fx.runtime.clone())
        .process(&full_access(), None, &ApplicationRequest::get())
        .await
        .expect("process page");
    assert_eq!(output.page_id, "persons");
}

#[tokio::test]
async fn page_permissions_gate_the_whole_page() {
    let fx = fixture();
    let ctx = context(Some(subject(&["persons.list"])));
    let output = PageProcessor::new(fx.runtime.clone())
        .process(&ctx, Some("admin"), &ApplicationRequest::get())
        .await
        .expect("process page");
    assert!(!output.permitted);
    assert!(output.sections.is_empty());
}

#[tokio::test]
async fn submitted_action_forwards_before_datasources_run() {
    let fx = fixture();
    let ctx = full_access();
    let request = ApplicationRequest::post()
        .with_url_parameters(&["create"])
        .with_parameter("name", "Jane");
    let output = PageProcessor::new(fx.runtime.clone())
        .process(&ctx, Some("persons"), &request)
        .await
        .expect("process page");

    let redirect = output.redirect.as_ref().expect("redirect");
    assert_eq!(redirect.target, "/manager/localhost/demo/persons");
    assert!(output.sections.is_empty());
    assert_eq!(fx.saved.saved().len(), 1);
    assert!(ctx.session.attribute("sortPersons").is_none());
    assert!(!ctx.session.messages().is_empty());
}

#[tokio::test]
async fn out_of_range_page_redirects_the_page() {
    let fx = fixture();
    let request = ApplicationRequest::get().with_parameter("sortPersons", "page:9;pageSize:2");
    let output = PageProcessor::new(fx.runtime.clone())
        .process(&full_access(), Some("persons"), &request)
        .await
        .expect("process page");
    let redirect = output.redirect.as_ref().expect("redirect");
    assert_eq!(
        redirect.target,
        format!("{}?sortPersons=page:0;pageSize:2", SERVLET_PATH)
    );
}

#[tokio::test]
async fn session_parameters_are_remembered() {
    let fx = fixture();
    let ctx = full_access();
    let processor = PageProcessor::new(fx.runtime.clone());
    processor
        .process(&ctx, Some("persons"), &ApplicationRequest::get().with_parameter("lang", "de"))
        .await
        .expect("process page");
    assert_eq!(ctx.session.attribute("lang").as_deref(), Some("de"));

    let output = processor
        .process(&ctx, Some("persons"), &ApplicationRequest::get())
        .await
        .expect("process page");
    assert_eq!(output.parameters.get("lang").map(String::as_str), Some("de"));
}
