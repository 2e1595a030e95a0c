mod common;

use chrono::{NaiveDate, Timelike};
use http::Method;
use routebind::binder::{
    resolve_keys, Bindable, CasterTable, FieldKind, MemorySessionStore, RecordSchema, ScalarKind,
    SessionStore, Source, Sources, Timestamp,
};
use routebind::dispatcher::{RequestContext, RequestData};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

fn bind<R: Bindable + Default>(ctx: &RequestContext) -> R {
    common::init_tracing();
    let schema = RecordSchema::<R>::of(&CasterTable::builtin());
    let mut record = R::default();
    schema.bind(&mut record, &Sources::new(ctx));
    record
}

fn context(data: RequestData, params: &[(&str, &str)]) -> RequestContext {
    let params = params
        .iter()
        .map(|(k, v)| (Arc::from(*k), (*v).to_string()))
        .collect();
    RequestContext::new(Arc::new(data)).with_route(Arc::from("test"), params)
}

#[derive(Debug, Default, Bindable)]
struct Signup {
    user_id: u64,
    display_name: String,
    age: u8,
    subscribed: bool,
    score: f64,
    tags: Vec<String>,
    lucky: Vec<i32>,
}

#[test]
fn test_field_keys_follow_convention() {
    assert_eq!(resolve_keys("UserId", None), vec!["userId", "UserId", "user_id"]);
    let schema = RecordSchema::<Signup>::of(&CasterTable::builtin());
    let user_id = &schema.fields()[0];
    assert_eq!(user_id.name, "UserId");
    assert_eq!(user_id.keys, vec!["userId", "UserId", "user_id"]);
    assert_eq!(user_id.source, Source::Form);
    assert_eq!(user_id.kind, FieldKind::Scalar(ScalarKind::U64));
    assert_eq!(schema.fields()[5].kind, FieldKind::Sequence(ScalarKind::String));
}

#[test]
fn test_form_values_bind_by_any_conventional_key() {
    let data = RequestData::new(Method::POST, "/signup?userId=17&tags=a&tags=b")
        .with_form_body("display_name=Jack+Smith&Age=300&subscribed=on&score=2.5&lucky=3&lucky=x");
    let signup: Signup = bind(&context(data, &[]));
    assert_eq!(signup.user_id, 17);
    assert_eq!(signup.display_name, "Jack Smith");
    // 300 does not fit a u8
    assert_eq!(signup.age, 0);
    assert!(signup.subscribed);
    assert!((signup.score - 2.5).abs() < f64::EPSILON);
    assert_eq!(signup.tags, vec!["a", "b"]);
    assert_eq!(signup.lucky, vec![3, 0]);
}

#[test]
fn test_path_values_override_form_values() {
    let data = RequestData::new(Method::GET, "/users/9?userId=1");
    let signup: Signup = bind(&context(data, &[("userId", "9")]));
    assert_eq!(signup.user_id, 9);
}

#[test]
fn test_unparsable_values_become_zero() {
    let data = RequestData::new(Method::GET, "/?userId=abc&score=nan-ish&subscribed=maybe");
    let signup: Signup = bind(&context(data, &[]));
    assert_eq!(signup.user_id, 0);
    assert_eq!(signup.score, 0.0);
    assert!(!signup.subscribed);
}

#[derive(Debug, Default, Bindable)]
struct Tagged {
    #[bind(cookie = "sid")]
    session_cookie: String,
    #[bind(cookie)]
    theme: String,
    #[bind(header = "x-tenant")]
    tenant: String,
    #[bind(header = "~")]
    accept_language: String,
    #[bind(name = "q")]
    query: String,
    #[bind(skip)]
    ignored: String,
}

#[test]
fn test_tagged_sources() {
    let data = RequestData::new(Method::GET, "/search?q=rust&ignored=set&theme=light")
        .with_cookie_header("sid=abc123; theme=dark")
        .with_header("X-Tenant", "acme")
        .with_header("accept_language", "de");
    let tagged: Tagged = bind(&context(data, &[]));
    assert_eq!(tagged.session_cookie, "abc123");
    assert_eq!(tagged.theme, "dark");
    assert_eq!(tagged.tenant, "acme");
    assert_eq!(tagged.accept_language, "de");
    assert_eq!(tagged.query, "rust");
    assert_eq!(tagged.ignored, "");
}

#[derive(Debug, Default, Bindable)]
struct Paging {
    page: u32,
    per_page: u32,
}

#[derive(Debug, Default, Bindable)]
struct Listing {
    category: String,
    paging: Paging,
    since: Timestamp,
    until: Timestamp,
    broken: Timestamp,
    ctx: Option<RequestContext>,
}

#[test]
fn test_nested_records_and_timestamps() {
    let data = RequestData::new(
        Method::GET,
        "/list?category=books&page=2&per_page=50&since=2020-02-01&until=2020-02-01%2015:04:05&broken=2020-2-1",
    );
    let listing: Listing = bind(&context(data, &[]));
    assert_eq!(listing.category, "books");
    assert_eq!(listing.paging.page, 2);
    assert_eq!(listing.paging.per_page, 50);
    assert_eq!(
        listing.since,
        Timestamp::Date(NaiveDate::from_ymd_opt(2020, 2, 1).unwrap())
    );
    match listing.until {
        Timestamp::DateTime(at) => assert_eq!((at.hour(), at.minute(), at.second()), (15, 4, 5)),
        other => panic!("expected a date-time, got {other:?}"),
    }
    assert!(listing.broken.is_zero());
    assert_eq!(listing.since.to_datetime().map(|at| at.hour()), Some(0));
    assert!(listing.broken.to_datetime().is_none());
    let ctx = listing.ctx.expect("context injected");
    assert_eq!(ctx.path(), "/list");
}

fn stamp_origin(record: &mut Audited, ctx: &RequestContext) {
    record.origin = format!("{} {}", ctx.method(), ctx.path());
}

#[derive(Debug, Default, Bindable)]
#[bind(construct = stamp_origin)]
struct Audited {
    id: u32,
    #[bind(skip)]
    origin: String,
}

#[test]
fn test_construct_runs_after_binding() {
    let audited: Audited = bind(&context(RequestData::new(Method::DELETE, "/items/5"), &[("id", "5")]));
    assert_eq!(audited.id, 5);
    assert_eq!(audited.origin, "DELETE /items/5");
}

#[derive(Debug, Default, Bindable)]
struct Cart {
    #[bind(session = "userName")]
    user: String,
    #[bind(session)]
    items: Vec<u32>,
    #[bind(session)]
    admin: bool,
    #[bind(session)]
    missing: i64,
}

#[test]
fn test_session_values() {
    let store = MemorySessionStore::new();
    let session_id = store.create();
    store.put(&session_id, "userName", json!("jack"));
    store.put(&session_id, "items", json!([3, "4", "x"]));
    store.put(&session_id, "admin", json!(true));
    store.put(&session_id, "missing", serde_json::Value::Null);

    let ctx = context(RequestData::new(Method::GET, "/cart"), &[]);
    let schema = RecordSchema::<Cart>::of(&CasterTable::builtin());
    let mut cart = Cart::default();
    schema.bind(
        &mut cart,
        &Sources::new(&ctx).with_session(&store, Some(session_id.as_str())),
    );
    assert_eq!(cart.user, "jack");
    assert_eq!(cart.items, vec![3, 4, 0]);
    assert!(cart.admin);
    assert_eq!(cart.missing, 0);

    let mut anonymous = Cart::default();
    schema.bind(&mut anonymous, &Sources::new(&ctx).with_session(&store, None));
    assert_eq!(anonymous.user, "");
}

#[test]
fn test_custom_caster_applies_to_new_schemas() {
    fn yes_no(raw: &str) -> routebind::binder::Scalar {
        routebind::binder::Scalar::Bool(raw.eq_ignore_ascii_case("yes"))
    }
    let mut casters = CasterTable::builtin();
    casters.set(ScalarKind::Bool, yes_no);

    let ctx = context(RequestData::new(Method::GET, "/?subscribed=YES"), &[]);
    let schema = RecordSchema::<Signup>::of(&casters);
    let mut signup = Signup::default();
    schema.bind(&mut signup, &Sources::new(&ctx));
    assert!(signup.subscribed);
}

#[test]
fn test_tuple_records_bind_in_order() {
    let data = RequestData::new(Method::GET, "/?page=4&category=games");
    let (paging, listing): (Paging, Listing) = bind(&context(data, &[]));
    assert_eq!(paging.page, 4);
    assert_eq!(listing.category, "games");
    assert_eq!(listing.paging.page, 4);
}

#[derive(Debug, Default, Bindable, Serialize, Deserialize)]
#[bind(json)]
#[serde(rename_all = "camelCase")]
struct Order {
    order_id: u64,
    note: String,
    quantity: u32,
    items: Vec<String>,
}

fn order_request(content_type: &str, body: &str) -> RequestContext {
    let data = RequestData::new(Method::POST, "/orders/9?note=form&quantity=2")
        .with_body(content_type, body);
    context(data, &[("orderId", "9")])
}

#[test]
fn test_json_body_merges_over_bound_values() {
    assert!(RecordSchema::<Order>::of(&CasterTable::builtin()).reads_json());
    assert!(!RecordSchema::<Signup>::of(&CasterTable::builtin()).reads_json());

    let order: Order = bind(&order_request(
        "application/json; charset=utf-8",
        r#"{"quantity": 5, "items": ["a", "b"], "unknown": true}"#,
    ));
    assert_eq!(order.order_id, 9);
    assert_eq!(order.note, "form");
    assert_eq!(order.quantity, 5);
    assert_eq!(order.items, vec!["a", "b"]);
}

#[test]
fn test_bad_json_body_keeps_bound_values() {
    for body in [r#"{"quantity": "#, r#"{"quantity": "lots"}"#, "true"] {
        let order: Order = bind(&order_request("application/json", body));
        assert_eq!(order.order_id, 9, "{body}");
        assert_eq!(order.note, "form", "{body}");
        assert_eq!(order.quantity, 2, "{body}");
        assert!(order.items.is_empty(), "{body}");
    }

    let order: Order = bind(&order_request("text/plain", r#"{"quantity": 5}"#));
    assert_eq!(order.quantity, 2);
}
