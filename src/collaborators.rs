//! Contracts between the generator and the application it documents.
//!
//! The generator never inspects an application directly. Everything it knows
//! about routes, handler signatures, validation rules, sample data and error
//! rendering comes through the traits in this module. The crate ships two
//! implementations: [`crate::source::SourceIndex`] (type metadata read from
//! Rust sources) and [`crate::manifest::Manifest`] (everything else, read from
//! an application manifest).
//!
//! # Example
//!
//! ```no_run
//! use openapi_from_rules::collaborators::Collaborators;
//! use openapi_from_rules::manifest::Manifest;
//! use openapi_from_rules::openapi_builder::assemble;
//! use openapi_from_rules::source::SourceIndex;
//! use std::path::Path;
//!
//! let manifest = Manifest::from_path(Path::new("openapi-app.yaml")).unwrap();
//! let index = SourceIndex::scan(Path::new("src"), manifest.conventions()).unwrap();
//! let document = assemble(&Collaborators::new(&manifest, &index)).unwrap();
//! println!("{} paths", document.paths.len());
//! ```

use crate::error::Result;
use crate::rules::{CustomMessages, Rule};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Identity of a type in the documented application.
///
/// Types are identified by their short name (`UserResource`), the way they
/// appear in handler signatures and documentation. Two types sharing a short
/// name are told apart through [`TypeMetadata::definition_sites`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIdentity(String);

impl TypeIdentity {
    /// Create an identity from a type name; a path keeps only its last segment
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim().trim_start_matches("::");
        let short = name.rsplit("::").next().unwrap_or(name);
        Self(short.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeIdentity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// HTTP methods a route can answer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP POST method
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP DELETE method
    Delete,
    /// HTTP PATCH method
    Patch,
    /// HTTP OPTIONS method
    Options,
    /// HTTP HEAD method
    Head,
}

impl HttpMethod {
    /// Parse a method name, case-insensitively
    pub fn parse(method: &str) -> Option<Self> {
        match method.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "PATCH" => Some(HttpMethod::Patch),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Whether responses to this method carry a body
    pub fn has_body(&self) -> bool {
        !matches!(self, HttpMethod::Head)
    }
}

/// What handles a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteHandler {
    /// A named action on a controller type
    Controller {
        controller: TypeIdentity,
        action: String,
    },
    /// An anonymous handler with no reachable signature or documentation
    Closure,
}

/// One entry of the application's route table.
#[derive(Debug, Clone)]
pub struct Route {
    /// The URI pattern, e.g. `users/{user}`
    pub uri: String,
    /// Every HTTP method the route answers to
    pub methods: Vec<HttpMethod>,
    /// The handler behind the route
    pub handler: RouteHandler,
    /// The route name, e.g. `users.show`
    pub name: Option<String>,
}

impl Route {
    /// Create a controller route
    pub fn new(uri: &str, methods: Vec<HttpMethod>, controller: &str, action: &str) -> Self {
        Self {
            uri: uri.to_string(),
            methods,
            handler: RouteHandler::Controller {
                controller: TypeIdentity::new(controller),
                action: action.to_string(),
            },
            name: None,
        }
    }

    /// Create a route handled by a closure
    pub fn closure(uri: &str, methods: Vec<HttpMethod>) -> Self {
        Self {
            uri: uri.to_string(),
            methods,
            handler: RouteHandler::Closure,
            name: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Controller and action, unless the route is handled by a closure
    pub fn controller_action(&self) -> Option<(&TypeIdentity, &str)> {
        match &self.handler {
            RouteHandler::Controller { controller, action } => Some((controller, action.as_str())),
            RouteHandler::Closure => None,
        }
    }
}

/// Kind of a type, as far as request and response resolution cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Carries validation rules for the incoming request
    Request,
    /// Wraps a single domain entity
    Resource,
    /// Wraps a collection of resources
    ResourceCollection,
    /// A structured response built directly from an entity
    RawResponse,
    /// A redirect response
    Redirect,
}

/// A parameter of a handler signature.
///
/// `candidates` holds the outer type name followed by its generic arguments,
/// so `Valid<CreateUser>` yields `["Valid", "CreateUser"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamType {
    pub candidates: Vec<TypeIdentity>,
}

/// Signature and documentation of a handler.
#[derive(Debug, Clone, Default)]
pub struct HandlerSignature {
    /// Typed parameters, receiver excluded
    pub params: Vec<ParamType>,
    /// Return type with `Result`/`Option` wrappers removed
    pub returns: Option<TypeIdentity>,
    /// Raw documentation text
    pub docs: Option<String>,
    /// Import table of the defining file: lowercased alias -> full path
    pub imports: HashMap<String, String>,
}

/// Type and documentation metadata about the application.
pub trait TypeMetadata {
    /// Signature of `controller::action`
    fn handler(&self, controller: &TypeIdentity, action: &str) -> Option<HandlerSignature>;

    /// Whether the type is defined in the application
    fn type_exists(&self, ty: &TypeIdentity) -> bool;

    /// The kind of the type, if it is one the generator understands
    fn type_kind(&self, ty: &TypeIdentity) -> Option<TypeKind>;

    /// Documentation attached to the type
    fn type_docs(&self, ty: &TypeIdentity) -> Option<String>;

    /// The entity a resource wraps
    fn wrapped_entity(&self, resource: &TypeIdentity) -> Option<TypeIdentity>;

    /// The resource a resource collection collects
    fn collected_resource(&self, collection: &TypeIdentity) -> Option<TypeIdentity>;

    /// Typed parameters of the type's constructor, in order
    fn constructor_params(&self, ty: &TypeIdentity) -> Vec<TypeIdentity>;

    /// Modules defining a type with this name; more than one makes the name
    /// ambiguous
    fn definition_sites(&self, _ty: &TypeIdentity) -> Vec<String> {
        Vec::new()
    }
}

/// Fields of a request mapped to their rules, in declaration order.
pub type RuleSet = IndexMap<String, Vec<Rule>>;

/// Validation rules declared by request types.
pub trait RuleSource {
    /// Rules for the request body
    fn body_rules(&self, request: &TypeIdentity) -> Option<RuleSet>;

    /// Rules for query-string fields
    fn query_rules(&self, request: &TypeIdentity) -> Option<RuleSet>;

    /// Message overrides keyed by field and rule
    fn custom_messages(&self, request: &TypeIdentity) -> CustomMessages;
}

/// Produces representative instances of domain entities.
pub trait SampleFactory {
    /// Make `count` instances of `entity`; fails with
    /// [`crate::error::Error::MissingFactory`] when the entity has no factory
    fn make(&self, entity: &TypeIdentity, count: usize) -> Result<Vec<Value>>;
}

/// Renders a resource around an entity instance to its public form.
pub trait ResourceTransform {
    fn render(&self, resource: &TypeIdentity, entity: &Value) -> Result<Value>;
}

/// An instance of a declared error type.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInstance {
    pub error: TypeIdentity,
    pub message: String,
}

/// What the application answers when an error reaches its handler.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedError {
    pub status: u16,
    pub body: Value,
}

/// The application's error-handling layer.
pub trait ErrorRenderer {
    fn render(&self, error: &ErrorInstance) -> Result<RenderedError>;
}

/// The enumerable part of the application: its routes.
pub trait Router {
    fn routes(&self) -> Vec<Route>;
}

/// Every collaborator a generation run needs.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub router: &'a dyn Router,
    pub metadata: &'a dyn TypeMetadata,
    pub rules: &'a dyn RuleSource,
    pub factory: &'a dyn SampleFactory,
    pub transform: &'a dyn ResourceTransform,
    pub errors: &'a dyn ErrorRenderer,
}

impl<'a> Collaborators<'a> {
    /// Use one application object for everything but type metadata
    pub fn new<A>(app: &'a A, metadata: &'a dyn TypeMetadata) -> Self
    where
        A: Router + RuleSource + SampleFactory + ResourceTransform + ErrorRenderer,
    {
        Self {
            router: app,
            metadata,
            rules: app,
            factory: app,
            transform: app,
            errors: app,
        }
    }

    /// Replace the sample factory
    pub fn with_factory(mut self, factory: &'a dyn SampleFactory) -> Self {
        self.factory = factory;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_identity_keeps_last_segment() {
        assert_eq!(TypeIdentity::new("crate::errors::NotFound").as_str(), "NotFound");
        assert_eq!(TypeIdentity::new("::User").as_str(), "User");
        assert_eq!(TypeIdentity::new(" User ").as_str(), "User");
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("HEAD"), Some(HttpMethod::Head));
        assert_eq!(HttpMethod::parse("TRACE"), None);
        assert!(!HttpMethod::Head.has_body());
        assert!(HttpMethod::Post.has_body());
    }

    #[test]
    fn test_route_controller_action() {
        let route = Route::new("users", vec![HttpMethod::Get], "UserController", "index");
        let (controller, action) = route.controller_action().unwrap();
        assert_eq!(controller.as_str(), "UserController");
        assert_eq!(action, "index");

        let closure = Route::closure("health", vec![HttpMethod::Get]);
        assert!(closure.controller_action().is_none());
    }
}
