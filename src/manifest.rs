//! The application manifest: routes, request rules, sample data, resource
//! projections and error rendering, read from one YAML or JSON file.
//!
//! ```yaml
//! info:
//!   title: Shop API
//!   version: "2.1"
//! routes:
//!   - uri: users/{user}
//!     methods: [GET, HEAD]
//!     controller: UserController
//!     action: show
//!     name: users.show
//! requests:
//!   StoreUser:
//!     body:
//!       email: required|email
//!       age: [integer, {rule: between, params: [18, 99]}]
//!       code: [{custom: Voucher}]
//!     query:
//!       page[size]: integer
//!     messages:
//!       email.required: We need your email
//! entities:
//!   User:
//!     - {id: 1, name: Ada, email: ada@example.com}
//! resources:
//!   UserResource: [id, name]
//! rules:
//!   Voucher: {type: string, characters: ABCDEF0123456789, required_characters: "-"}
//! errors:
//!   NotFound: {status: 404}
//! error_handler:
//!   status: 500
//!   body: {message: ":message"}
//! ```

use crate::collaborators::{
    ErrorInstance, ErrorRenderer, HttpMethod, RenderedError, ResourceTransform, Route, Router,
    RuleSet, RuleSource, SampleFactory, TypeIdentity,
};
use crate::error::{Error, Result};
use crate::openapi_builder::Info;
use crate::rules::{CustomMessages, FieldDescriptor, FieldType, ParsableRule, Rule, RuleObject};
use crate::source::Conventions;
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Placeholder replaced by the error message in rendered error bodies
pub const MESSAGE_PLACEHOLDER: &str = ":message";

/// File name looked up in the project directory when none is given
pub const DEFAULT_MANIFEST_NAME: &str = "openapi-app.yaml";

const DEFAULT_ERROR_STATUS: u16 = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ManifestFile {
    info: Info,
    conventions: Conventions,
    routes: Vec<RouteSpec>,
    requests: HashMap<String, RequestSpec>,
    entities: HashMap<String, Samples>,
    resources: HashMap<String, Projection>,
    rules: HashMap<String, DeclaredRule>,
    errors: HashMap<String, ErrorSpec>,
    error_handler: Option<ErrorSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteSpec {
    uri: String,
    #[serde(default = "default_methods")]
    methods: Vec<String>,
    controller: Option<String>,
    action: Option<String>,
    name: Option<String>,
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RequestSpec {
    body: IndexMap<String, RuleSpec>,
    query: Option<IndexMap<String, RuleSpec>>,
    messages: IndexMap<String, String>,
}

/// Rules of one field: `required|email` or a list of entries
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RuleSpec {
    Piped(String),
    List(Vec<RuleEntry>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RuleEntry {
    Token(String),
    Structured {
        rule: String,
        #[serde(default)]
        params: Vec<Value>,
    },
    Custom {
        custom: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Samples {
    Many(Vec<Value>),
    One(Value),
}

/// Which entity fields a resource exposes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Projection {
    /// Entity paths, each kept under its own name
    Fields(Vec<String>),
    Mapped(IndexMap<String, FieldSource>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldSource {
    /// A dotted entity path
    Path(String),
    Nested(IndexMap<String, FieldSource>),
    Literal(Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ErrorSpec {
    #[serde(default = "default_error_status")]
    status: u16,
    /// `None` when absent, `Some(Value::Null)` for an explicit empty body
    #[serde(default, deserialize_with = "present")]
    body: Option<Value>,
}

fn default_error_status() -> u16 {
    DEFAULT_ERROR_STATUS
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A rule object declared in the manifest by what it constrains
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DeclaredRule {
    #[serde(skip)]
    name: String,
    #[serde(rename = "type")]
    field_type: Option<FieldType>,
    pattern: Option<String>,
    format: Option<String>,
    /// Characters a value may be made of
    characters: Option<String>,
    /// Characters a value must contain
    required_characters: Option<String>,
    example: Option<Value>,
}

impl RuleObject for DeclaredRule {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn as_parsable(&self) -> Option<&dyn ParsableRule> {
        Some(self)
    }
}

impl ParsableRule for DeclaredRule {
    fn parse(&self, descriptor: &mut FieldDescriptor) {
        if let Some(field_type) = self.field_type {
            descriptor.set_type(field_type);
        }
        if let Some(pattern) = &self.pattern {
            descriptor.pattern = Some(pattern.clone());
        }
        if let Some(format) = &self.format {
            descriptor.format = Some(format.clone());
        }
        if let Some(characters) = &self.characters {
            descriptor.add_valid_characters(characters.chars());
        }
        for character in self.required_characters.iter().flat_map(|chars| chars.chars()) {
            descriptor.add_required_character(character);
        }
        if let Some(example) = &self.example {
            descriptor.set_example(example.clone());
        }
    }
}

/// A rule object named in the manifest but never registered
#[derive(Debug)]
struct UnregisteredRule {
    name: String,
}

impl RuleObject for UnregisteredRule {
    fn name(&self) -> String {
        self.name.clone()
    }
}

/// An application described by a manifest file.
pub struct Manifest {
    info: Info,
    conventions: Conventions,
    routes: Vec<Route>,
    requests: HashMap<String, RequestSpec>,
    entities: HashMap<String, Vec<Value>>,
    resources: HashMap<String, Projection>,
    errors: HashMap<String, ErrorSpec>,
    error_handler: ErrorSpec,
    custom_rules: HashMap<String, Arc<dyn RuleObject>>,
}

impl Manifest {
    /// Load a manifest; `.json` files are read as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not match the
    /// manifest format, or declares an invalid route.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Loading manifest {}", path.display());
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let file: ManifestFile = if is_json {
            serde_json::from_str(&content).map_err(|e| parse_error(path, e))?
        } else {
            serde_yaml::from_str(&content).map_err(|e| parse_error(path, e))?
        };
        let manifest = Self::from_file(file)?;

        info!(
            "Manifest {} declares {} routes and {} request types",
            path.display(),
            manifest.routes.len(),
            manifest.requests.len()
        );
        Ok(manifest)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Self::from_file(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::from_file(serde_json::from_str(content)?)
    }

    fn from_file(file: ManifestFile) -> Result<Self> {
        let routes = file
            .routes
            .iter()
            .map(route_from_spec)
            .collect::<Result<Vec<_>>>()?;

        let entities = file
            .entities
            .into_iter()
            .map(|(entity, samples)| {
                let samples = match samples {
                    Samples::Many(samples) => samples,
                    Samples::One(sample) => vec![sample],
                };
                (entity, samples)
            })
            .collect();

        let custom_rules = file
            .rules
            .into_iter()
            .map(|(name, mut rule)| {
                rule.name = name.clone();
                let rule: Arc<dyn RuleObject> = Arc::new(rule);
                (name, rule)
            })
            .collect();

        Ok(Self {
            info: file.info,
            conventions: file.conventions,
            routes,
            requests: file.requests,
            entities,
            resources: file.resources,
            errors: file.errors,
            error_handler: file.error_handler.unwrap_or(ErrorSpec {
                status: DEFAULT_ERROR_STATUS,
                body: None,
            }),
            custom_rules,
        })
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    /// Make a rule object available to `{custom: Name}` entries, replacing a
    /// rule of the same name declared in the manifest
    pub fn register_rule(&mut self, rule: Arc<dyn RuleObject>) {
        self.custom_rules.insert(rule.name(), rule);
    }

    fn rules_of(&self, specs: &IndexMap<String, RuleSpec>) -> RuleSet {
        specs
            .iter()
            .map(|(field, spec)| (field.clone(), self.to_rules(spec)))
            .collect()
    }

    fn to_rules(&self, spec: &RuleSpec) -> Vec<Rule> {
        match spec {
            RuleSpec::Piped(token) => vec![Rule::Token(token.clone())],
            RuleSpec::List(entries) => entries.iter().map(|entry| self.to_rule(entry)).collect(),
        }
    }

    fn to_rule(&self, entry: &RuleEntry) -> Rule {
        match entry {
            RuleEntry::Token(token) => Rule::Token(token.clone()),
            RuleEntry::Structured { rule, params } => Rule::Structured {
                name: rule.clone(),
                params: params.iter().map(param_text).collect(),
            },
            RuleEntry::Custom { custom } => match self.custom_rules.get(custom) {
                Some(object) => Rule::Object(Arc::clone(object)),
                None => Rule::Object(Arc::new(UnregisteredRule {
                    name: custom.clone(),
                })),
            },
        }
    }
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::ParseError {
        file: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn route_from_spec(spec: &RouteSpec) -> Result<Route> {
    let methods = spec
        .methods
        .iter()
        .map(|method| {
            HttpMethod::parse(method).ok_or_else(|| {
                Error::InvalidArgument(format!("Route {} has unknown method {}", spec.uri, method))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let route = match (&spec.controller, &spec.action) {
        (Some(controller), Some(action)) => Route::new(&spec.uri, methods, controller, action),
        (None, None) => Route::closure(&spec.uri, methods),
        _ => {
            return Err(Error::InvalidArgument(format!(
                "Route {} needs both a controller and an action, or neither",
                spec.uri
            )))
        }
    };

    Ok(match &spec.name {
        Some(name) => route.with_name(name),
        None => route,
    })
}

/// Rule parameters are text; YAML numbers and booleans keep their literal form
fn param_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Follow a dotted path into an entity
fn lookup<'v>(entity: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(entity, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn project(resource: &TypeIdentity, entity: &Value, fields: &IndexMap<String, FieldSource>) -> Result<Value> {
    let mut output = Map::new();
    for (key, source) in fields {
        let value = match source {
            FieldSource::Path(path) => lookup(entity, path).cloned().ok_or_else(|| {
                Error::Collaborator(format!("{} reads {} but the entity has no such field", resource, path))
            })?,
            FieldSource::Nested(fields) => project(resource, entity, fields)?,
            FieldSource::Literal(value) => value.clone(),
        };
        output.insert(key.clone(), value);
    }
    Ok(Value::Object(output))
}

fn substitute_message(template: &Value, message: &str) -> Value {
    match template {
        Value::String(text) => Value::String(text.replace(MESSAGE_PLACEHOLDER, message)),
        Value::Array(items) => Value::Array(items.iter().map(|item| substitute_message(item, message)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), substitute_message(value, message)))
                .collect(),
        ),
        other => other.clone(),
    }
}

impl Router for Manifest {
    fn routes(&self) -> Vec<Route> {
        self.routes.clone()
    }
}

impl RuleSource for Manifest {
    fn body_rules(&self, request: &TypeIdentity) -> Option<RuleSet> {
        let spec = self.requests.get(request.as_str())?;
        Some(self.rules_of(&spec.body))
    }

    fn query_rules(&self, request: &TypeIdentity) -> Option<RuleSet> {
        let query = self.requests.get(request.as_str())?.query.as_ref()?;
        Some(self.rules_of(query))
    }

    fn custom_messages(&self, request: &TypeIdentity) -> CustomMessages {
        let mut messages = CustomMessages::new();
        if let Some(spec) = self.requests.get(request.as_str()) {
            for (key, message) in &spec.messages {
                if !messages.insert_dotted(key, message) {
                    warn!("Ignoring message {} on {}: keys have the form field.rule", key, request);
                }
            }
        }
        messages
    }
}

impl SampleFactory for Manifest {
    /// Samples are handed out in declaration order, wrapping around
    fn make(&self, entity: &TypeIdentity, count: usize) -> Result<Vec<Value>> {
        let samples = self
            .entities
            .get(entity.as_str())
            .ok_or_else(|| Error::MissingFactory {
                entity: entity.to_string(),
            })?;

        Ok(samples.iter().cycle().take(count).cloned().collect())
    }
}

impl ResourceTransform for Manifest {
    fn render(&self, resource: &TypeIdentity, entity: &Value) -> Result<Value> {
        match self.resources.get(resource.as_str()) {
            None => Ok(entity.clone()),
            Some(Projection::Fields(paths)) => {
                let fields = paths
                    .iter()
                    .map(|path| (path.clone(), FieldSource::Path(path.clone())))
                    .collect();
                project(resource, entity, &fields)
            }
            Some(Projection::Mapped(fields)) => project(resource, entity, fields),
        }
    }
}

impl ErrorRenderer for Manifest {
    fn render(&self, error: &ErrorInstance) -> Result<RenderedError> {
        let spec = self.errors.get(error.error.as_str());
        let status = spec.map_or(self.error_handler.status, |spec| spec.status);
        let template = spec
            .and_then(|spec| spec.body.clone())
            .or_else(|| self.error_handler.body.clone())
            .unwrap_or_else(|| serde_json::json!({ "message": MESSAGE_PLACEHOLDER }));

        Ok(RenderedError {
            status,
            body: substitute_message(&template, &error.message),
        })
    }
}
