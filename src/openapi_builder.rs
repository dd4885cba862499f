use crate::cache::ShapeCache;
use crate::collaborators::{Collaborators, HttpMethod, Route, RuleSet, TypeIdentity};
use crate::enricher::enrich;
use crate::error::Result;
use crate::introspector::RouteIntrospector;
use crate::response::{ResolvedResponse, ResponseResolver, STATUS_OK};
use crate::rules::{FieldDescriptor, RuleParser};
use crate::schema_generator::{Schema, SchemaBuilder};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// OpenAPI version of generated documents
pub const OPENAPI_VERSION: &str = "3.0.2";

const JSON_CONTENT_TYPE: &str = "application/json";
const DEFAULT_RESPONSE_DESCRIPTION: &str = "Successful response";

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            title: "API Specification".to_string(),
            version: "v1".to_string(),
            description: None,
        }
    }
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// POST operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// PUT operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// DELETE operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// PATCH operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// OPTIONS operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    /// The operation slot for a method
    pub fn operation_mut(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }

    /// Every operation present, in document order
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        [
            &self.get,
            &self.post,
            &self.put,
            &self.delete,
            &self.patch,
            &self.options,
            &self.head,
        ]
        .into_iter()
        .filter_map(Option::as_ref)
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operation ID
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Parameters (path, query)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location (path, query)
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter is required
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the request body is required
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
    /// Response content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI Tag object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// API paths, in the order they were first seen
    pub paths: IndexMap<String, PathItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Document assembler - merges every route into one OpenAPI document
pub struct DocumentAssembler<'a> {
    collaborators: Collaborators<'a>,
    /// OpenAPI info section
    info: Info,
    /// Paths collection (URL path -> PathItem)
    paths: IndexMap<String, PathItem>,
    /// Tags by lowercased controller name, first seen wins
    tags: IndexMap<String, Tag>,
    cache: ShapeCache,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(collaborators: Collaborators<'a>) -> Self {
        debug!("Initializing DocumentAssembler");
        Self {
            collaborators,
            info: Info::default(),
            paths: IndexMap::new(),
            tags: IndexMap::new(),
            cache: ShapeCache::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }

    /// Add a route to the document.
    ///
    /// Closure routes are skipped. Any failure is reported against the
    /// route's URI.
    pub fn add_route(&mut self, route: &Route) -> Result<()> {
        let Some((controller, action)) = route.controller_action() else {
            debug!("Skipping closure route /{}", route.uri.trim_start_matches('/'));
            return Ok(());
        };
        debug!("Adding route /{} -> {}::{}", route.uri.trim_start_matches('/'), controller, action);

        self.add_controller_route(route, controller, action)
            .map_err(|e| e.in_route(&route.uri))
    }

    fn add_controller_route(&mut self, route: &Route, controller: &TypeIdentity, action: &str) -> Result<()> {
        let introspector = RouteIntrospector::new(self.collaborators.metadata);
        introspector.unambiguous(controller)?;
        let summary = introspector.controller_summary(route);
        let description = introspector.controller_description(route);

        let (body, query) = match introspector.request_type(route) {
            Some(request) => {
                introspector.unambiguous(&request)?;
                self.request_descriptors(&request)?
            }
            None => (Vec::new(), Vec::new()),
        };
        let request_body = request_body(&body);

        let mut parameters: Vec<Parameter> = path_parameters(&route.uri)
            .into_iter()
            .map(path_parameter)
            .collect();
        parameters.extend(query.iter().map(query_parameter));

        let (default, errors) = {
            let mut resolver = ResponseResolver::new(self.collaborators, &mut self.cache);
            (resolver.resolve_default(route)?, resolver.resolve_errors(route)?)
        };

        let tag = self.tag_for(controller);
        let path = normalize_uri(&route.uri);

        for method in &route.methods {
            let responses = responses_for(*method, default.as_ref(), &errors);
            let operation = Operation {
                tags: vec![tag.clone()],
                summary: summary.clone(),
                description: description.clone(),
                operation_id: Some(operation_id(route, controller, action, *method)),
                parameters: (!parameters.is_empty()).then(|| parameters.clone()),
                request_body: request_body.clone(),
                responses,
            };

            let slot = self.paths.entry(path.clone()).or_default().operation_mut(*method);
            if slot.is_some() {
                warn!(
                    "{} {} is already documented, keeping the first operation",
                    method.as_str(),
                    path
                );
                continue;
            }
            *slot = Some(operation);
        }

        Ok(())
    }

    /// Body and query descriptors of a request type
    fn request_descriptors(&self, request: &TypeIdentity) -> Result<(Vec<FieldDescriptor>, Vec<FieldDescriptor>)> {
        let rules = self.collaborators.rules;
        let parser = RuleParser::new().with_messages(rules.custom_messages(request));

        let body = describe(&parser, rules.body_rules(request))?;
        let query = describe(&parser, rules.query_rules(request))?;
        Ok((body, query))
    }

    /// Register the controller's tag and return its display name
    fn tag_for(&mut self, controller: &TypeIdentity) -> String {
        let name = controller_base_name(controller);
        let key = name.to_lowercase();

        self.tags
            .entry(key.clone())
            .or_insert_with(|| Tag {
                name: capitalize(&name),
                description: Some(format!("All {} related endpoints", key)),
            })
            .name
            .clone()
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> OpenApiDocument {
        debug!("Building final OpenAPI document");
        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.info,
            paths: self.paths,
            tags: self.tags.into_values().collect(),
        }
    }
}

/// Document every route the router knows.
///
/// The first failing route aborts the run.
pub fn assemble(collaborators: &Collaborators<'_>) -> Result<OpenApiDocument> {
    assemble_with_info(collaborators, Info::default())
}

pub fn assemble_with_info(collaborators: &Collaborators<'_>, info: Info) -> Result<OpenApiDocument> {
    let routes = collaborators.router.routes();
    info!("Documenting {} routes", routes.len());

    let mut assembler = DocumentAssembler::new(*collaborators).with_info(info);
    for route in &routes {
        assembler.add_route(route)?;
    }

    Ok(assembler.build())
}

fn describe(parser: &RuleParser, rules: Option<RuleSet>) -> Result<Vec<FieldDescriptor>> {
    rules
        .unwrap_or_default()
        .iter()
        .map(|(field, rules)| parser.parse(field, rules).map(enrich))
        .collect()
}

fn json_content(schema: Schema) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(JSON_CONTENT_TYPE.to_string(), MediaType { schema });
    content
}

fn request_body(descriptors: &[FieldDescriptor]) -> Option<RequestBody> {
    if descriptors.is_empty() {
        return None;
    }

    let schema = SchemaBuilder::from_descriptors("body", descriptors).to_schema();
    Some(RequestBody {
        description: None,
        required: true,
        content: json_content(schema),
    })
}

fn path_parameter(name: String) -> Parameter {
    Parameter {
        name,
        location: "path".to_string(),
        required: true,
        schema: Schema {
            schema_type: Some("string".to_string()),
            ..Default::default()
        },
        description: None,
        example: None,
    }
}

fn query_parameter(descriptor: &FieldDescriptor) -> Parameter {
    let mut schema = SchemaBuilder::from_descriptor(descriptor).to_schema();
    let description = schema.description.take();
    let example = schema.example.take();

    Parameter {
        name: clean_query_name(&descriptor.name),
        location: "query".to_string(),
        required: descriptor.required,
        schema,
        description,
        example,
    }
}

fn responses_for(
    method: HttpMethod,
    default: Option<&ResolvedResponse>,
    errors: &[ResolvedResponse],
) -> IndexMap<String, Response> {
    let mut responses = IndexMap::new();

    if default.is_none() {
        responses.insert(
            STATUS_OK.to_string(),
            Response {
                description: DEFAULT_RESPONSE_DESCRIPTION.to_string(),
                content: None,
            },
        );
    }

    for resolved in default.into_iter().chain(errors) {
        let status = resolved.status.to_string();
        if responses.contains_key(&status) {
            debug!("Response {} already documented, skipping {}", status, resolved.ty);
            continue;
        }

        let resolved = if method.has_body() {
            resolved.clone()
        } else {
            resolved.clone().without_body()
        };
        let content = resolved
            .schema
            .as_ref()
            .map(|schema| json_content(schema.to_schema()));
        responses.insert(
            status,
            Response {
                description: resolved.description,
                content,
            },
        );
    }

    responses
}

fn operation_id(route: &Route, controller: &TypeIdentity, action: &str, method: HttpMethod) -> String {
    match &route.name {
        Some(name) => format!("{}.{}", name, method.as_str()),
        None => format!("{}.{}.{}", controller, action, method.as_str()),
    }
}

/// `UserController` -> `User`
fn controller_base_name(controller: &TypeIdentity) -> String {
    let name = controller.as_str();
    match name.rfind("Controller") {
        Some(index) if index > 0 => format!("{}{}", &name[..index], &name[index + "Controller".len()..]),
        _ => name.to_string(),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Leading slash and no optional markers: `users/{user?}` -> `/users/{user}`
pub fn normalize_uri(uri: &str) -> String {
    format!("/{}", uri.trim_start_matches('/').replace("?}", "}"))
}

/// Names of the `{name}` and `{name?}` segments of a URI
pub fn path_parameters(uri: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = uri;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = rest[start + 1..start + len].trim_end_matches('?').trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &rest[start + len + 1..];
    }

    names
}

/// Query-string name of a field path: `tags.*` -> `tags[]`,
/// `address.city` -> `address[city]`
pub fn clean_query_name(name: &str) -> String {
    let mut parts = name.split('.');
    let mut cleaned = parts.next().unwrap_or_default().to_string();

    for part in parts {
        if part == "*" {
            cleaned.push_str("[]");
        } else {
            cleaned.push('[');
            cleaned.push_str(part);
            cleaned.push(']');
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_query_name() {
        assert_eq!(clean_query_name("tags.*"), "tags[]");
        assert_eq!(clean_query_name("address.city"), "address[city]");
        assert_eq!(clean_query_name("items.*.sku"), "items[][sku]");
        assert_eq!(clean_query_name("page"), "page");
    }

    #[test]
    fn test_path_parameters() {
        assert_eq!(path_parameters("users/{user}/posts/{post?}"), vec!["user", "post"]);
        assert!(path_parameters("users").is_empty());
        assert_eq!(path_parameters("broken/{id"), Vec::<String>::new());
    }

    #[test]
    fn test_normalize_uri() {
        assert_eq!(normalize_uri("users/{user?}"), "/users/{user}");
        assert_eq!(normalize_uri("/users"), "/users");
        assert_eq!(normalize_uri(""), "/");
    }

    #[test]
    fn test_controller_base_name() {
        assert_eq!(controller_base_name(&TypeIdentity::new("UserController")), "User");
        assert_eq!(controller_base_name(&TypeIdentity::new("Controller")), "Controller");
        assert_eq!(controller_base_name(&TypeIdentity::new("Health")), "Health");
        assert_eq!(capitalize("adminUser"), "AdminUser");
    }

    #[test]
    fn test_default_info() {
        let info = Info::default();
        assert_eq!(info.title, "API Specification");
        assert_eq!(info.version, "v1");
    }

    #[test]
    fn test_path_item_slots() {
        let mut item = PathItem::default();
        assert!(item.operation(HttpMethod::Get).is_none());

        *item.operation_mut(HttpMethod::Get) = Some(Operation {
            tags: Vec::new(),
            summary: None,
            description: None,
            operation_id: Some("users.index.GET".to_string()),
            parameters: None,
            request_body: None,
            responses: IndexMap::new(),
        });
        assert!(item.operation(HttpMethod::Get).is_some());
        assert!(item.operation(HttpMethod::Post).is_none());
    }

    #[test]
    fn test_head_responses_have_no_content() {
        use crate::rules::FieldType;
        use crate::schema_generator::SchemaNode;
        use crate::response::ResponseKind;

        let resolved = ResolvedResponse {
            kind: ResponseKind::SingleResource,
            ty: TypeIdentity::new("UserResource"),
            status: 200,
            description: "A user.".to_string(),
            schema: Some(SchemaNode::new("user", FieldType::Object)),
        };
        let error = ResolvedResponse {
            kind: ResponseKind::DeclaredError,
            ty: TypeIdentity::new("Conflict"),
            status: 200,
            description: "Conflict".to_string(),
            schema: None,
        };

        let get = responses_for(HttpMethod::Get, Some(&resolved), &[error.clone()]);
        assert_eq!(get.len(), 1);
        assert_eq!(get["200"].description, "A user.");
        assert!(get["200"].content.is_some());

        let head = responses_for(HttpMethod::Head, Some(&resolved), &[error]);
        assert!(head["200"].content.is_none());

        let bare = responses_for(HttpMethod::Get, None, &[]);
        assert_eq!(bare["200"].description, "Successful response");
        assert!(bare["200"].content.is_none());
    }
}
