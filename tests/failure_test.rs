use openapi_from_rules::{
    collaborators::{Collaborators, SampleFactory, TypeIdentity},
    error::{Error, Result},
    manifest::Manifest,
    openapi_builder::assemble,
    source::{parser::ParsedFile, Conventions, SourceIndex},
};
use serde_json::Value;
use std::cell::RefCell;

const SOURCES: &str = r#"
    pub struct ArticleController;

    impl ArticleController {
        pub fn index(&self) -> ArticleCollection { todo!() }
        pub fn show(&self) -> ArticleResource { todo!() }
        pub fn update(&self, request: Valid<UpdateArticle>) -> ArticleResource { todo!() }
        pub fn orphan(&self) -> OrphanResource { todo!() }
        pub fn odd(&self) -> UpdateArticle { todo!() }
        pub fn plain(&self) -> String { todo!() }
    }

    pub struct ArticleResource;
    impl JsonResource for ArticleResource {
        type Entity = Article;
    }

    pub struct ArticleCollection;
    impl ResourceCollection for ArticleCollection {
        type Collects = ArticleResource;
    }

    pub struct OrphanResource;
    impl JsonResource for OrphanResource {}

    pub struct UpdateArticle;
    impl FormRequest for UpdateArticle {}
"#;

fn index() -> SourceIndex {
    let file = ParsedFile::from_source("articles.rs", SOURCES).expect("Fixture should parse");
    SourceIndex::from_files(&[file], &Conventions::default())
}

fn manifest(routes: &str, extra: &str) -> Manifest {
    let yaml = format!(
        "routes:\n{}\nentities:\n  Article: [{{id: 7, title: Hello}}]\n{}",
        routes, extra
    );
    Manifest::from_yaml_str(&yaml).expect("Manifest should load")
}

fn route(uri: &str, action: &str) -> String {
    format!("  - {{uri: '{}', controller: ArticleController, action: {}}}", uri, action)
}

/// Counts every request for samples before delegating
struct CountingFactory<'a> {
    inner: &'a Manifest,
    calls: RefCell<Vec<(String, usize)>>,
}

impl SampleFactory for CountingFactory<'_> {
    fn make(&self, entity: &TypeIdentity, count: usize) -> Result<Vec<Value>> {
        self.calls.borrow_mut().push((entity.to_string(), count));
        self.inner.make(entity, count)
    }
}

#[test]
fn test_resource_shape_is_computed_once() {
    let routes = [
        route("articles", "index"),
        route("articles/{article}", "show"),
        route("articles/{article}/copy", "show"),
    ]
    .join("\n");
    let manifest = manifest(&routes, "");
    let index = index();
    let factory = CountingFactory {
        inner: &manifest,
        calls: RefCell::new(Vec::new()),
    };

    let collaborators = Collaborators::new(&manifest, &index).with_factory(&factory);
    let doc = assemble(&collaborators).unwrap();

    assert_eq!(doc.paths.len(), 3);
    assert_eq!(*factory.calls.borrow(), vec![("Article".to_string(), 2)]);
}

#[test]
fn test_unknown_rule_aborts_with_route() {
    let manifest = manifest(
        &route("articles/{article}", "update"),
        "requests:\n  UpdateArticle:\n    body:\n      title: required|shiny",
    );
    let index = index();

    let err = assemble(&Collaborators::new(&manifest, &index)).unwrap_err();
    match err {
        Error::Route { uri, source } => {
            assert_eq!(uri, "articles/{article}");
            assert!(matches!(*source, Error::UnknownRule { ref rule, ref field } if rule == "shiny" && field == "title"));
        }
        other => panic!("expected a route error, got {}", other),
    }
}

#[test]
fn test_rule_arity_is_checked() {
    let manifest = manifest(
        &route("articles/{article}", "update"),
        "requests:\n  UpdateArticle:\n    body:\n      title: [{rule: between, params: [1]}]",
    );
    let index = index();

    let err = assemble(&Collaborators::new(&manifest, &index)).unwrap_err();
    assert!(err.to_string().contains("requires at least 2 parameters"));
}

#[test]
fn test_missing_factory() {
    let manifest = Manifest::from_yaml_str(&format!("routes:\n{}", route("articles", "show"))).unwrap();
    let index = index();

    let err = assemble(&Collaborators::new(&manifest, &index)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Route /articles: The entity Article needs a sample factory to be documented"
    );
}

#[test]
fn test_resource_without_entity() {
    let manifest = manifest(&route("orphans", "orphan"), "");
    let index = index();

    let err = assemble(&Collaborators::new(&manifest, &index)).unwrap_err();
    match err {
        Error::Route { source, .. } => assert!(matches!(
            *source,
            Error::MissingTypeAnnotation { ref type_name } if type_name == "OrphanResource"
        )),
        other => panic!("expected a route error, got {}", other),
    }
}

#[test]
fn test_unsupported_and_unknown_response_types() {
    let index = index();

    let odd = manifest(&route("odd", "odd"), "");
    let err = assemble(&Collaborators::new(&odd, &index)).unwrap_err();
    assert!(err.to_string().contains("UpdateArticle is not supported"));

    // a type the application does not define simply has no documented body
    let plain = manifest(&route("plain", "plain"), "");
    let doc = assemble(&Collaborators::new(&plain, &index)).unwrap();
    let operation = doc.paths["/plain"].get.as_ref().unwrap();
    assert_eq!(operation.responses.len(), 1);
    assert!(operation.responses["200"].content.is_none());
}

#[test]
fn test_same_resource_name_in_two_modules() {
    let sources = r#"
        pub struct AccountController;

        impl AccountController {
            pub fn admin(&self) -> UserResource { todo!() }
            pub fn public(&self) -> Profile { todo!() }
        }

        pub struct Profile;
        impl JsonResource for Profile {
            type Entity = User;
        }

        pub mod admin {
            pub struct UserResource;
            impl JsonResource for UserResource {
                type Entity = User;
            }
        }

        pub mod api {
            pub struct UserResource;
            impl JsonResource for UserResource {
                type Entity = User;
            }
        }
    "#;
    let file = ParsedFile::from_source("accounts.rs", sources).expect("Fixture should parse");
    let index = SourceIndex::from_files(&[file], &Conventions::default());
    let manifest = |action: &str| {
        Manifest::from_yaml_str(&format!(
            "routes:\n  - {{uri: accounts, controller: AccountController, action: {}}}\nentities:\n  User: {{id: 1}}",
            action
        ))
        .expect("Manifest should load")
    };

    let err = assemble(&Collaborators::new(&manifest("admin"), &index)).unwrap_err();
    match err {
        Error::Route { uri, source } => {
            assert_eq!(uri, "accounts");
            match *source {
                Error::AmbiguousType { type_name, sites } => {
                    assert_eq!(type_name, "UserResource");
                    assert_eq!(sites, vec!["accounts.rs::admin", "accounts.rs::api"]);
                }
                other => panic!("expected an ambiguous type, got {}", other),
            }
        }
        other => panic!("expected a route error, got {}", other),
    }

    // types with a single definition are unaffected
    let doc = assemble(&Collaborators::new(&manifest("public"), &index)).unwrap();
    assert!(doc.paths["/accounts"].get.is_some());
}
