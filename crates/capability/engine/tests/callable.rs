mod common;

use appng_engine::{ApplicationRequest, CallableAction, CallableDataSource, ProcessingCause};
use appng_expression::ParameterSupport;
use appng_schema::{ActionRef, DatasourceRef, Messages as SchemaMessages, Param, Params};
use common::{SERVLET_PATH, context, fixture, full_access, subject};
use domain::Value;
use std::collections::BTreeMap;

fn caller(parameters: &[(&str, &str)]) -> ParameterSupport {
    let parameters: BTreeMap<String, String> = parameters
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    ParameterSupport::dollar(parameters).expect("parameter support")
}

fn texts(messages: Option<&SchemaMessages>) -> Vec<String> {
    messages
        .map(|messages| messages.messages.iter().map(|m| m.text.clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn datasource_is_gated_by_set_permission() {
    let fx = fixture();
    let cases = [
        (context(None), false),
        (context(Some(subject(&[]))), false),
        (full_access(), true),
    ];
    for (ctx, expected) in cases {
        let mut datasource = CallableDataSource::new(
            &fx.runtime,
            &ctx,
            &ApplicationRequest::get(),
            DatasourceRef::new("persons"),
            &caller(&[]),
        )
        .expect("resolve datasource");
        assert_eq!(datasource.do_include(), expected);
        assert_eq!(datasource.perform().await.expect("perform"), expected);
        assert_eq!(datasource.datasource().is_some(), expected);
    }

    let trusted = fx.runtime.clone().trusted();
    let datasource = CallableDataSource::new(
        &trusted,
        &context(None),
        &ApplicationRequest::get(),
        DatasourceRef::new("persons"),
        &caller(&[]),
    )
    .expect("resolve datasource");
    assert!(datasource.do_include());
}

#[tokio::test]
async fn datasource_builds_paged_result_and_stores_sort_state() {
    let fx = fixture();
    let ctx = full_access();
    let mut datasource = CallableDataSource::new(
        &fx.runtime,
        &ctx,
        &ApplicationRequest::get(),
        DatasourceRef::new("persons"),
        &caller(&[]),
    )
    .expect("resolve datasource");
    assert!(datasource.perform().await.expect("perform"));
    assert_eq!(datasource.parameters().get("filter").map(String::as_str), Some("all"));

    let output = datasource.datasource().cloned().expect("output");
    let resultset = output
        .data
        .as_ref()
        .and_then(|data| data.resultset.as_ref())
        .expect("resultset");
    assert_eq!(resultset.hits, 3);
    assert_eq!(resultset.results.len(), 3);
    assert_eq!(resultset.chunk_size, 25);
    assert_eq!(
        resultset.results[0].field("name").map(|field| field.value.as_str()),
        Some("Jane")
    );
    assert_eq!(
        ctx.session.attribute("sortPersons").as_deref(),
        Some("page:0;pageSize:25")
    );

    assert!(datasource.perform().await.expect("perform again"));
    assert_eq!(datasource.datasource(), Some(&output));
}

#[tokio::test]
async fn title_arguments_resolve_element_parameters() {
    let fx = fixture();
    let mut datasource = CallableDataSource::new(
        &fx.runtime,
        &full_access(),
        &ApplicationRequest::get(),
        DatasourceRef::new("persons"),
        &caller(&[]),
    )
    .expect("resolve datasource");
    assert!(datasource.perform().await.expect("perform"));

    let output = datasource.datasource().expect("output");
    let title = output.config.title.as_ref().expect("title");
    assert_eq!(title.value, "Persons: all [a, b]");
}

#[tokio::test]
async fn out_of_range_page_redirects_to_first_page() {
    let fx = fixture();
    let ctx = full_access();
    let request = ApplicationRequest::get().with_parameter("sortPersons", "page:5;pageSize:10");
    let mut datasource = CallableDataSource::new(
        &fx.runtime,
        &ctx,
        &request,
        DatasourceRef::new("persons"),
        &caller(&[]),
    )
    .expect("resolve datasource");

    assert!(!datasource.perform().await.expect("perform"));
    assert!(datasource.datasource().is_none());
    let redirects = ctx.redirects();
    assert_eq!(redirects.len(), 1);
    assert_eq!(redirects[0].status, 302);
    assert_eq!(
        redirects[0].target,
        format!("{}?sortPersons=page:0;pageSize:10", SERVLET_PATH)
    );
}

#[tokio::test]
async fn mismatching_bind_class_is_an_illegal_argument() {
    let fx = fixture();
    let mut datasource = CallableDataSource::new(
        &fx.runtime,
        &full_access(),
        &ApplicationRequest::get(),
        DatasourceRef::new("tags"),
        &caller(&[]),
    )
    .expect("resolve datasource");

    let err = datasource.perform().await.expect_err("type mismatch");
    assert!(err.is_illegal_argument());
    match &err.cause {
        ProcessingCause::IllegalArgument(message) => assert_eq!(
            message,
            "the object of type 'ArrayList' returned by 'tagProvider' is not of the desired type 'Set' as defined in the meta-data!"
        ),
        other => panic!("unexpected cause {other:?}"),
    }
}

#[tokio::test]
async fn provider_without_data_fails() {
    let fx = fixture();
    let mut datasource = CallableDataSource::new(
        &fx.runtime,
        &full_access(),
        &ApplicationRequest::get(),
        DatasourceRef::new("empty"),
        &caller(&[]),
    )
    .expect("resolve datasource");
    let err = datasource.perform().await.expect_err("no data");
    assert!(matches!(err.cause, ProcessingCause::NoData(_)));
}

#[test]
fn unknown_datasource_is_rejected() {
    let fx = fixture();
    let result = CallableDataSource::new(
        &fx.runtime,
        &full_access(),
        &ApplicationRequest::get(),
        DatasourceRef::new("nowhere"),
        &caller(&[]),
    );
    assert!(matches!(
        result.map(|_| ()).map_err(|err| err.cause),
        Err(ProcessingCause::UnknownReference(_))
    ));
}

#[test]
fn parameter_precedence_over_every_combination() {
    let fx = fixture();
    let ctx = full_access();
    for execution in [None, Some("E")] {
        for reference in [None, Some("V")] {
            for has_default in [false, true] {
                let id = if has_default { "withDefault" } else { "noDefault" };
                let mut datasource_ref = DatasourceRef::new(id);
                if let Some(value) = reference {
                    datasource_ref.params = Some(Params::of(vec![Param::new("p").with_value(value)]));
                }
                let mut request = ApplicationRequest::get();
                if let Some(value) = execution {
                    request.add_parameter("p", value);
                }
                let datasource =
                    CallableDataSource::new(&fx.runtime, &ctx, &request, datasource_ref, &caller(&[]))
                        .expect("resolve datasource");
                let expected = execution
                    .or(reference)
                    .or(has_default.then_some("D"));
                assert_eq!(
                    datasource.parameters().get("p").map(String::as_str),
                    expected,
                    "execution={execution:?} reference={reference:?} default={has_default}"
                );
            }
        }
    }
}

#[test]
fn reference_values_are_substituted_from_the_caller() {
    let fx = fixture();
    let ctx = full_access();
    let resolve = |value: &str| {
        let mut datasource_ref = DatasourceRef::new("withDefault");
        datasource_ref.params = Some(Params::of(vec![Param::new("p").with_value(value)]));
        CallableDataSource::new(
            &fx.runtime,
            &ctx,
            &ApplicationRequest::get(),
            datasource_ref,
            &caller(&[("id", "7")]),
        )
        .expect("resolve datasource")
        .parameters()
        .get("p")
        .cloned()
    };
    assert_eq!(resolve("${id}").as_deref(), Some("7"));
    assert_eq!(resolve("${missing}").as_deref(), Some("D"));
}

#[tokio::test]
async fn unexpected_action_failure_carries_correlation_id() {
    let fx = fixture();
    let request = ApplicationRequest::post().with_parameter("name", "Jane");
    let mut action = CallableAction::new(
        &fx.runtime,
        &full_access(),
        &request,
        ActionRef::new("personEvent", "fail"),
        &caller(&[]),
    )
    .expect("resolve action");
    assert!(action.do_execute());

    let err = action.perform().await.expect_err("provider failure");
    let correlation_id = err.correlation_id.expect("correlation id");
    assert!(matches!(err.cause, ProcessingCause::Provider(_)));
    let field_processor = err.field_processor.as_ref().expect("field processor");
    let expected = format!("An internal error occurred, error ID: {}", correlation_id);
    assert!(field_processor.messages().iter().any(|m| m.text == expected));
}

#[tokio::test]
async fn provider_message_is_shown_with_user_data() {
    let fx = fixture();
    let request = ApplicationRequest::post()
        .with_parameter("name", "Jane")
        .with_parameter("password", "secret");
    let mut action = CallableAction::new(
        &fx.runtime,
        &full_access(),
        &request,
        ActionRef::new("personEvent", "reject"),
        &caller(&[]),
    )
    .expect("resolve action");

    assert!(!action.perform().await.expect("perform"));
    let output = action.action().expect("output");
    assert!(texts(output.messages.as_ref()).contains(&"Person Jane already exists".to_string()));
    let user_data = output.user_data.as_ref().expect("user data");
    assert_eq!(user_data.get("name"), Some("Jane"));
    assert_eq!(user_data.get("password"), None);
}

#[tokio::test]
async fn error_added_by_provider_stays_on_the_action() {
    let fx = fixture();
    let ctx = full_access();
    let mut action = CallableAction::new(
        &fx.runtime,
        &ctx,
        &ApplicationRequest::post(),
        ActionRef::new("personEvent", "flag"),
        &caller(&[]),
    )
    .expect("resolve action");

    assert!(!action.perform().await.expect("perform"));
    assert!(action.has_errors());
    assert_eq!(action.forward(), None);
    assert!(ctx.redirects().is_empty());
    let output = action.action().expect("output");
    assert!(texts(output.messages.as_ref()).contains(&"X".to_string()));
    assert!(!ctx.session.messages().iter().any(|m| m.text == "X"));
}

#[tokio::test]
async fn successful_action_forwards_and_flashes_messages() {
    let fx = fixture();
    let ctx = full_access();
    let request = ApplicationRequest::post().with_parameter("name", "Jane");
    let mut action = CallableAction::new(
        &fx.runtime,
        &ctx,
        &request,
        ActionRef::new("personEvent", "create"),
        &caller(&[]),
    )
    .expect("resolve action");

    assert!(action.perform().await.expect("perform"));
    assert_eq!(action.forward(), Some("/manager/localhost/demo/persons"));
    assert_eq!(ctx.redirects()[0].target, "/manager/localhost/demo/persons");
    assert!(ctx.session.messages().iter().any(|m| m.text == "saved"));

    let saved = fx.saved.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].get("name"), Some(&Value::from("Jane")));
}

#[tokio::test]
async fn get_request_only_includes_the_action() {
    let fx = fixture();
    let mut action = CallableAction::new(
        &fx.runtime,
        &full_access(),
        &ApplicationRequest::get().with_parameter("name", "Jane"),
        ActionRef::new("personEvent", "create"),
        &caller(&[]),
    )
    .expect("resolve action");
    assert!(action.do_include());
    assert!(!action.do_execute());
    assert!(!action.perform().await.expect("perform"));
    assert!(action.action().is_some());
    assert!(fx.saved.saved().is_empty());
}

#[tokio::test]
async fn data_retrieval_errors_move_from_session_to_action() {
    let fx = fixture();
    let ctx = full_access();
    let mut action = CallableAction::new(
        &fx.runtime,
        &ctx,
        &ApplicationRequest::post().with_parameter("name", "Jane"),
        ActionRef::new("personEvent", "edit"),
        &caller(&[]),
    )
    .expect("resolve action");

    assert!(!action.perform().await.expect("perform"));
    assert!(fx.saved.saved().is_empty());
    assert!(ctx.session.messages().is_empty());
    let output = action.action().expect("output");
    assert!(texts(output.messages.as_ref()).contains(&"Person 42 not found".to_string()));
}

#[tokio::test]
async fn failing_async_action_reports_error_id_in_session() {
    let fx = fixture();
    let ctx = full_access();
    let mut action = CallableAction::new(
        &fx.runtime,
        &ctx,
        &ApplicationRequest::post(),
        ActionRef::new("personEvent", "import"),
        &caller(&[]),
    )
    .expect("resolve action");

    assert!(action.perform().await.expect("perform"));
    let output = action.action().expect("output");
    assert!(
        texts(output.messages.as_ref())
            .contains(&"The task has been started in the background.".to_string())
    );

    action.take_task().expect("background task").await;
    let messages = ctx.session.messages();
    let error = messages
        .iter()
        .find(|m| m.is_error())
        .expect("background error message");
    let id = error
        .text
        .strip_prefix("The background task failed, error ID: ")
        .expect("error text");
    assert!(id.parse::<u64>().is_ok());
}

#[tokio::test]
async fn panicking_async_action_reports_error_id_in_session() {
    let fx = fixture();
    let ctx = full_access();
    let mut action = CallableAction::new(
        &fx.runtime,
        &ctx,
        &ApplicationRequest::post(),
        ActionRef::new("personEvent", "crash"),
        &caller(&[]),
    )
    .expect("resolve action");

    assert!(action.perform().await.expect("perform"));
    action.take_task().expect("background task").await;

    let messages = ctx.session.messages();
    let error = messages
        .iter()
        .find(|m| m.is_error())
        .expect("background error message");
    let id = error
        .text
        .strip_prefix("The background task failed, error ID: ")
        .expect("error text");
    assert!(id.parse::<u64>().is_ok());
}

#[tokio::test]
async fn async_action_reports_completion_in_session() {
    let fx = fixture();
    let ctx = full_access();
    let mut action = CallableAction::new(
        &fx.runtime,
        &ctx,
        &ApplicationRequest::post(),
        ActionRef::new("personEvent", "export"),
        &caller(&[]),
    )
    .expect("resolve action");

    assert!(action.perform().await.expect("perform"));
    action.take_task().expect("background task").await;
    let texts: Vec<String> = ctx.session.messages().iter().map(|m| m.text.clone()).collect();
    assert!(texts.contains(&"saved".to_string()));
    assert!(texts.contains(&"The background task has finished.".to_string()));
}
