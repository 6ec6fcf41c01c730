//! Tests for route registration and matching.

mod common;

use std::sync::Arc;

use common::*;
use oxide_dispatch::{
    Action, HandlerSpec, Method, MiddlewareEntry, Register, Request, Result, Route, RouteFactory,
    RouterError,
};

fn middleware_names(entries: &[MiddlewareEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| match entry {
            MiddlewareEntry::Named(name) => name.clone(),
            MiddlewareEntry::Inline(_) => "inline".to_string(),
        })
        .collect()
}

#[test]
fn nested_groups_prefix_paths() {
    let mut router = router();
    router
        .group("/a", |a| {
            a.group("/b", |b| {
                b.get("/c", echo_path(), Some("abc"))?;
                Ok(())
            })?;
            a.get("/d", echo_path(), Some("ad"))?;
            Ok(())
        })
        .unwrap();
    router.get("/e", echo_path(), Some("e")).unwrap();

    assert_eq!(router.route("abc").unwrap().path(), "a/b/c");
    assert_eq!(router.route("ad").unwrap().path(), "a/d");
    assert_eq!(router.route("e").unwrap().path(), "e");
    assert!(router.resolve(&Request::get("/a/b/c"), true).unwrap().is_some());
}

#[test]
fn middleware_scoping() {
    let mut router = router();
    router
        .middleware(PASS, |group| {
            group.get("/single", echo_path(), Some("single"))?;
            group.middlewares([PASS, PASS2], |inner| {
                inner.get("/multiples", echo_path(), Some("multiples"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
    router.get("/outside", echo_path(), Some("outside")).unwrap();
    router
        .get("/route-level", echo_path(), Some("route-level"))
        .unwrap()
        .middlewares([PASS2, PASS2])
        .unwrap();

    let names = |name: &str| middleware_names(router.route(name).unwrap().middlewares());
    assert_eq!(names("single"), [PASS]);
    assert_eq!(names("multiples"), [PASS, PASS2]);
    assert!(names("outside").is_empty());
    assert_eq!(names("route-level"), [PASS2]);
}

#[test]
fn unregistered_middleware_is_rejected() {
    let mut router = router();
    let err = router
        .middleware("Tests::Unknown", |group| {
            group.get("/", echo_path(), None)?;
            Ok(())
        })
        .err()
        .unwrap();
    assert!(matches!(err, RouterError::Configuration(_)));
    assert!(router.routes().is_empty());

    let err = router
        .get("/", echo_path(), None)
        .unwrap()
        .middlewares(["Tests::Unknown"])
        .err()
        .unwrap();
    assert_eq!(
        err.to_string(),
        "invalid configuration: middleware \"Tests::Unknown\" is not registered"
    );
}

#[test]
fn unregistered_policy_class_is_rejected() {
    let mut router = router();
    let err = router
        .get("/", echo_path(), None)
        .unwrap()
        .policy(("Tests::Unknown", "check"))
        .err()
        .unwrap();
    assert!(matches!(err, RouterError::Configuration(_)));

    let err = router
        .get("/fake", echo_path(), None)
        .unwrap()
        .policy("Tests::FakePolicy")
        .err()
        .unwrap();
    assert!(matches!(err, RouterError::Configuration(_)));
}

#[test]
fn empty_callback_is_rejected() {
    let mut router = router();
    assert!(matches!(router.get("/", "", None), Err(RouterError::Configuration(_))));
    assert!(matches!(
        router.get("/", ("", "show"), None),
        Err(RouterError::Configuration(_))
    ));
}

#[test]
fn first_registered_route_wins() {
    let mut router = router();
    router.get("/:slug", echo_path(), Some("slug")).unwrap();
    router.get("/about", echo_path(), Some("about")).unwrap();

    let matched = router.resolve(&Request::get("/about"), true).unwrap().unwrap();
    assert_eq!(matched.route().name(), "slug");
    assert_eq!(matched.attribute("slug"), Some("about"));
}

#[test]
fn methods_are_matched_separately() {
    let mut router = router();
    router.get("/items", echo_path(), Some("items.index")).unwrap();
    router.post("/items", echo_path(), Some("items.store")).unwrap();
    router.put("/items/:id", echo_path(), Some("items.update")).unwrap();
    router.patch("/items/:id", echo_path(), None).unwrap();
    router.delete("/items/:id", echo_path(), None).unwrap();
    router.any(Method::Options, "/items", echo_path(), None).unwrap();

    let matched = router.resolve(&Request::post("/items"), true).unwrap().unwrap();
    assert_eq!(matched.route().name(), "items.store");
    let matched = router
        .resolve(&Request::new(Method::Put, "/items/4"), true)
        .unwrap()
        .unwrap();
    assert_eq!(matched.route().name(), "items.update");

    let routes = router.routes();
    assert_eq!(routes.len(), 6);
    assert_eq!(routes[&Method::Get].len(), 1);
    assert_eq!(router.routes_for(Method::Options).count(), 1);
    assert!(router
        .resolve(&Request::new(Method::Head, "/items"), false)
        .unwrap()
        .is_none());
}

#[test]
fn no_match_is_soft_on_resolve() {
    let router = router();
    let request = Request::get("/nowhere");
    assert!(router.resolve(&request, false).unwrap().is_none());
    let err = router.resolve(&request, true).unwrap_err();
    assert_eq!(err.to_string(), "no matching route: GET /nowhere");
}

#[test]
fn default_route_names() {
    let mut router = router();
    router
        .group("/blog", |group| {
            group.get("/:id", echo_path(), None)?;
            group.get("/", format!("{PARAMS_INVOKE}@invoke"), None)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(router.route("/:id").unwrap().path(), "blog/:id");
    assert!(router.route(&format!("{PARAMS_INVOKE}@invoke")).is_some());
}

#[test]
fn duplicate_names_keep_last() {
    let mut router = router();
    router.get("/first", echo_path(), Some("dup")).unwrap();
    router.get("/second", echo_path(), Some("dup")).unwrap();

    assert_eq!(router.route("dup").unwrap().path(), "second");
    assert!(router.resolve(&Request::get("/first"), true).unwrap().is_some());
}

#[test]
fn static_paths_match_case_insensitively() {
    let mut router = router();
    router.get("/About/Team", echo_path(), Some("team")).unwrap();

    let matched = router.resolve(&Request::get("/about/team/"), true).unwrap().unwrap();
    assert_eq!(matched.route().name(), "team");
}

#[test]
fn regex_metacharacters_in_literals() {
    let mut router = router();
    router.get("/files/report.pdf", echo_path(), None).unwrap();

    assert!(router.resolve(&Request::get("/files/report.pdf"), false).unwrap().is_some());
    assert!(router.resolve(&Request::get("/files/reportxpdf"), false).unwrap().is_none());
}

#[test]
fn invalid_patterns() {
    let mut router = router();
    assert!(matches!(
        router.get("/:id/:id", echo_path(), None),
        Err(RouterError::InvalidPattern(_))
    ));
    assert!(matches!(
        router.get("/{id:[0-9}", echo_path(), None),
        Err(RouterError::InvalidPattern(_))
    ));
}

struct TaggedFactory;

impl RouteFactory for TaggedFactory {
    fn create(&self, path: &str, handler: HandlerSpec, name: &str) -> Result<Route> {
        Ok(Route::new(path, handler, Some(&format!("tagged.{name}")))?.through([PASS]))
    }
}

#[tokio::test]
async fn custom_route_factory() {
    let mut router = router();
    router.set_route_factory(Arc::new(TaggedFactory));
    router
        .group("/test", |group| {
            group.get("/uri", Action::sync(vec![], |_| "factory"), Some("uri"))?;
            Ok(())
        })
        .unwrap();

    let route = router.route("uri").unwrap();
    assert_eq!(route.name(), "tagged.uri");
    assert_eq!(route.path(), "test/uri");
    assert_eq!(middleware_names(route.middlewares()), [PASS]);

    let res = router.run(Request::get("/test/uri")).await.unwrap();
    assert_eq!(text(&res), "factory");
}

#[test]
fn policies_on_resolve() {
    let mut router = router();
    router
        .get("/open", echo_path(), None)
        .unwrap()
        .policy(true)
        .unwrap();
    router
        .get("/closed", echo_path(), None)
        .unwrap()
        .policy(false)
        .unwrap();
    router
        .get("/queried", echo_path(), None)
        .unwrap()
        .policy(INVOKE_POLICY)
        .unwrap();

    assert!(router.resolve(&Request::get("/open"), true).unwrap().is_some());
    assert!(router.resolve(&Request::get("/closed"), false).unwrap().is_none());
    assert!(matches!(
        router.resolve(&Request::get("/closed"), true),
        Err(RouterError::Unauthorized { .. })
    ));
    assert!(router.resolve(&Request::get("/queried?param=1"), false).unwrap().is_some());
    assert!(router.resolve(&Request::get("/queried"), false).unwrap().is_none());
}
