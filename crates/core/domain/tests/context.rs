use domain::{
    ApplicationContext, Group, InMemorySessionStore, Messages, PropertyHolder, RequestContext,
    Role, SessionStore, Site, Subject,
};
use std::sync::Arc;

fn context(subject: Option<Subject>) -> RequestContext {
    RequestContext::new(
        Site::new("site-1", "localhost", "http://localhost:8080"),
        ApplicationContext::new("demo", PropertyHolder::new("application.demo.", Vec::new())),
        subject,
        Arc::new(InMemorySessionStore::new()),
    )
    .with_servlet_path("/manager/site-1/demo/page")
}

#[test]
fn request_context_builds() {
    let subject = Subject::new(
        "admin",
        vec![Group {
            name: "admins".to_string(),
            roles: vec![
                Role::new("admin", "demo", &["page.read", "page.write"]),
                Role::new("other", "foreign", &["foreign.read"]),
            ],
        }],
    );
    let ctx = context(Some(subject));

    assert_eq!(ctx.site.name, "site-1");
    assert_eq!(ctx.application.name, "demo");
    let subject = ctx.subject.as_ref().expect("subject");
    assert!(subject.has_permission("demo", "page.read"));
    assert!(!subject.has_permission("demo", "foreign.read"));
    assert_eq!(subject.permissions_for("demo"), vec!["page.read", "page.write"]);
}

#[test]
fn redirects_are_shared_between_clones() {
    let ctx = context(None);
    let clone = ctx.clone();
    clone.send_redirect("/manager/site-1/demo/other", 302);

    assert!(ctx.is_redirected());
    assert_eq!(ctx.redirects()[0].target, "/manager/site-1/demo/other");
}

#[test]
fn session_messages_have_flash_semantics() {
    let ctx = context(None);
    let mut messages = Messages::new();
    messages.ok("saved");
    ctx.session.add_messages(&messages).expect("add messages");

    let taken = ctx.session.take_messages().expect("take messages");
    assert_eq!(taken.len(), 1);
    assert!(ctx.session.messages().is_empty());
}

#[test]
fn session_attributes_roundtrip() {
    let session = InMemorySessionStore::new();
    session
        .set_attribute("sortpersons", "page:1".to_string())
        .expect("set attribute");
    assert_eq!(session.attribute("sortpersons").as_deref(), Some("page:1"));
    session.remove_attribute("sortpersons").expect("remove attribute");
    assert!(session.attribute("sortpersons").is_none());
}
