use super::*;
use http::Method;
use std::sync::Arc;

fn get() -> MethodSet {
    MethodSet::single(Method::GET)
}

fn router_with(templates: &[&str]) -> Router<str> {
    let mut router = Router::new();
    for template in templates {
        router
            .register(template, &get(), Arc::from(*template))
            .unwrap();
    }
    router
}

#[test]
fn test_normalize_path() {
    assert_eq!(normalize_path(""), "/");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path("/a/b"), "/a/b");
    assert_eq!(normalize_path("//a///b/"), "/a/b");
    assert_eq!(normalize_path("/a/./b/../c"), "/a/c");
    assert_eq!(normalize_path("/../../a"), "/a");
    assert_eq!(normalize_path("a/b/.."), "a");
}

#[test]
fn test_tokenize_splits_on_dots() {
    assert_eq!(tokenize("/").as_slice(), &[ROOT_TOKEN]);
    assert_eq!(tokenize("/feed.json").as_slice(), &["feed", "json"]);
    assert_eq!(
        tokenize("/login/a/b.html").as_slice(),
        &["login", "a", "b", "html"]
    );
}

#[test]
fn test_compile_classifies_segments() {
    let pattern = RoutePattern::compile("/blog/{blogName}/article/{articleId}-{pageId}").unwrap();
    assert_eq!(pattern.token_count(), 4);
    assert_eq!(pattern.var_positions(), &[1, 3]);
    assert_eq!(pattern.literal_count(), 2);
    assert_eq!(pattern.variable_count(), 3);
    assert!(matches!(pattern.segments()[3], Segment::Composite(_)));
    assert!(pattern.is_dynamic());
    assert!(!pattern.is_wildcard());
}

#[test]
fn test_compile_wildcard_bounds() {
    let pattern = RoutePattern::compile("/login/*.html").unwrap();
    let bounds = pattern.wildcard().unwrap();
    assert_eq!(bounds.prefix, "/login/");
    assert_eq!(bounds.suffix, ".html");
    assert!(bounds.admits("/login/a/b/c.html"));
    assert!(!bounds.admits("/logout/a.html"));
    assert!(!bounds.admits("/login/a.htm"));
}

#[test]
fn test_compile_errors() {
    for bad in [
        "/a/*/b/*",
        "/a/{id}/*",
        "/a/{}",
        "/a/{id",
        "/a/id}",
        "/a/{x}{y}",
        "/a/{id}/b/{id}",
    ] {
        let err = RoutePattern::compile(bad).unwrap_err();
        assert!(
            matches!(err, RouteError::InvalidPattern { .. }),
            "{bad} should not compile"
        );
        assert_eq!(err.status(), 500);
    }
}

#[test]
fn test_static_template_is_not_dynamic() {
    let pattern = RoutePattern::compile("/about/team").unwrap();
    assert!(!pattern.is_dynamic());
    assert_eq!(pattern.literal_count(), 2);
}

#[test]
fn test_exact_index_method_mismatch_is_not_found() {
    let mut index: ExactIndex<str> = ExactIndex::new();
    index.insert(&Arc::from("/users"), get(), Arc::from("list"));
    assert!(index.find(&Method::GET, "/users").is_ok());
    let err = index.find(&Method::POST, "/users").unwrap_err();
    assert!(matches!(err, RouteError::NotFound { .. }));
    assert!(index.allowed_methods("/users").contains(&Method::GET));
    assert!(index.allowed_methods("/nope").is_empty());
}

#[test]
fn test_exact_index_distinct_targets_per_method() {
    let mut index: ExactIndex<str> = ExactIndex::new();
    let path: Arc<str> = Arc::from("/users");
    index.insert(&path, get(), Arc::from("list"));
    index.insert(&path, MethodSet::single(Method::POST), Arc::from("create"));
    assert_eq!(&*index.find(&Method::GET, "/users").unwrap().target, "list");
    assert_eq!(&*index.find(&Method::POST, "/users").unwrap().target, "create");
}

#[test]
fn test_literal_route_has_no_params() {
    let router = router_with(&["/", "/about/team"]);
    let found = router.route(&Method::GET, "/about/team").unwrap();
    assert_eq!(&*found.target, "/about/team");
    assert!(found.path_params.is_empty());
    let root = router.route(&Method::GET, "/").unwrap();
    assert_eq!(&*root.target, "/");
}

#[test]
fn test_variables_are_bound() {
    let router = router_with(&["/weather/{day}/how-heavy/{heavy}"]);
    let found = router
        .route(&Method::GET, "/weather/2020-02-01/how-heavy/very")
        .unwrap();
    assert_eq!(found.get_path_param("day"), Some("2020-02-01"));
    assert_eq!(found.get_path_param("heavy"), Some("very"));
}

#[test]
fn test_variables_are_percent_decoded() {
    let router = router_with(&["/users/{name}"]);
    let found = router.route(&Method::GET, "/users/jane%20doe").unwrap();
    assert_eq!(found.get_path_param("name"), Some("jane doe"));
}

#[test]
fn test_token_count_mismatch_never_matches() {
    let router = router_with(&["/weather/{day}/how-heavy/{heavy}"]);
    for path in [
        "/weather/2020-02-01/how-heavy",
        "/weather/2020-02-01/how-heavy/very/much",
        "/weather",
    ] {
        let err = router.route(&Method::GET, path).unwrap_err();
        assert!(matches!(err, RouteError::NotFound { .. }), "{path}");
    }
}

#[test]
fn test_wildcard_ignores_interior_token_count() {
    let router = router_with(&["/login/*.html"]);
    for path in ["/login/a.html", "/login/a/b/c.html", "/login/x.y.html"] {
        let found = router.route(&Method::GET, path).unwrap();
        assert_eq!(&*found.target, "/login/*.html", "{path}");
        assert!(found.path_params.is_empty());
    }
    assert!(router.route(&Method::GET, "/login/a.json").is_err());
    assert!(router.route(&Method::GET, "/signin/a.html").is_err());
}

#[test]
fn test_composite_segment() {
    let router = router_with(&["/blog/{blogName}/article/{articleId}-{pageId}"]);
    let found = router
        .route(&Method::GET, "/blog/jack/article/501-3")
        .unwrap();
    assert_eq!(found.get_path_param("blogName"), Some("jack"));
    assert_eq!(found.get_path_param("articleId"), Some("501"));
    assert_eq!(found.get_path_param("pageId"), Some("3"));
    assert!(router.route(&Method::GET, "/blog/jack/article/501").is_err());
}

#[test]
fn test_extension_is_its_own_token() {
    let router = router_with(&["/feed/{id}.json"]);
    let found = router.route(&Method::GET, "/feed/42.json").unwrap();
    assert_eq!(found.get_path_param("id"), Some("42"));
    assert!(router.route(&Method::GET, "/feed/42.xml").is_err());
}

#[test]
fn test_exact_wins_over_pattern() {
    let router = router_with(&["/users/{id}", "/users/me"]);
    let found = router.route(&Method::GET, "/users/me").unwrap();
    assert_eq!(&*found.target, "/users/me");
    let found = router.route(&Method::GET, "/users/7").unwrap();
    assert_eq!(&*found.target, "/users/{id}");
}

#[test]
fn test_normalization_retry() {
    let router = router_with(&["/about/team", "/users/{id}"]);
    assert!(router.route(&Method::GET, "//about//team/").is_ok());
    assert!(router.route(&Method::GET, "/about/x/../team").is_ok());
    let found = router.route(&Method::GET, "/users//7/").unwrap();
    assert_eq!(found.get_path_param("id"), Some("7"));
}

#[test]
fn test_method_not_allowed() {
    let mut router: Router<str> = Router::new();
    router
        .register("/items", &MethodSet::from([Method::GET, Method::HEAD]), Arc::from("items"))
        .unwrap();
    router
        .register("/items/{id}", &MethodSet::single(Method::DELETE), Arc::from("item"))
        .unwrap();

    let err = router.route(&Method::POST, "/items").unwrap_err();
    assert_eq!(err.status(), 405);
    match err {
        RouteError::MethodNotAllowed { allowed, .. } => {
            assert!(allowed.contains(&Method::GET));
            assert!(allowed.contains(&Method::HEAD));
        }
        other => panic!("unexpected {other:?}"),
    }

    let err = router.route(&Method::GET, "/items/9").unwrap_err();
    assert!(matches!(err, RouteError::MethodNotAllowed { .. }));
    assert_eq!(err.to_string(), "/items/9 does not accept this method (allowed: DELETE)");
}

#[test]
fn test_empty_method_set_defaults_to_get() {
    let mut router: Router<str> = Router::new();
    router
        .register("/health", &MethodSet::new(), Arc::from("health"))
        .unwrap();
    assert!(router.route(&Method::GET, "/health").is_ok());
    assert_eq!(router.route(&Method::POST, "/health").unwrap_err().status(), 405);
}

#[test]
fn test_ambiguity_most_specific() {
    let router = router_with(&["/files/{a}/{b}", "/files/{a}/raw", "/files/*"]);
    let found = router.route(&Method::GET, "/files/x/raw").unwrap();
    assert_eq!(&*found.target, "/files/{a}/raw");
    let found = router.route(&Method::GET, "/files/x/y").unwrap();
    assert_eq!(&*found.target, "/files/{a}/{b}");
    let found = router.route(&Method::GET, "/files/x/y/z").unwrap();
    assert_eq!(&*found.target, "/files/*");
}

#[test]
fn test_ambiguity_prefers_earliest_registration() {
    let router = router_with(&["/p/{a}", "/p/{b}"]);
    let found = router.route(&Method::GET, "/p/1").unwrap();
    assert_eq!(&*found.target, "/p/{a}");
    assert_eq!(found.get_path_param("a"), Some("1"));
}

#[test]
fn test_ambiguity_reject() {
    let mut router: Router<str> = Router::with_policy(AmbiguityPolicy::Reject);
    for template in ["/p/{a}", "/p/{b}"] {
        router.register(template, &get(), Arc::from(template)).unwrap();
    }
    let err = router.route(&Method::GET, "/p/1").unwrap_err();
    assert_eq!(err.status(), 409);
    match err {
        RouteError::AmbiguousMatch { candidates, .. } => {
            assert_eq!(candidates.len(), 2);
            assert_eq!(&*candidates[0], "/p/{a}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_policy_parse() {
    assert_eq!(AmbiguityPolicy::parse("Reject"), Some(AmbiguityPolicy::Reject));
    assert_eq!(
        AmbiguityPolicy::parse("specific"),
        Some(AmbiguityPolicy::MostSpecific)
    );
    assert_eq!(AmbiguityPolicy::parse("random"), None);
}

#[test]
fn test_method_set_display_and_dedupe() {
    let set: MethodSet = [Method::GET, Method::POST, Method::GET].into_iter().collect();
    assert_eq!(set.len(), 2);
    assert_eq!(set.to_string(), "GET, POST");
    assert_eq!(serde_json::to_string(&set).unwrap(), r#"["GET","POST"]"#);
}
