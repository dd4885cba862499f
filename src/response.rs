//! Resolution of the responses a route can produce.
//!
//! The kind of the handler's return type selects how a sample body is
//! obtained: resources are rendered around factory samples, raw responses
//! walk a sample entity directly, redirects have no body, and documented
//! error types go through the application's error renderer.

use crate::cache::ShapeCache;
use crate::collaborators::{Collaborators, ErrorInstance, Route, TypeIdentity, TypeKind};
use crate::error::{Error, Result};
use crate::introspector::RouteIntrospector;
use crate::schema_generator::{SchemaBuilder, SchemaNode};
use log::debug;
use serde_json::Value;

pub const STATUS_OK: u16 = 200;
pub const STATUS_FOUND: u16 = 302;

const SUCCESS_DESCRIPTION: &str = "Successful response";
const REDIRECT_DESCRIPTION: &str = "Redirect";

/// How a response was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    SingleResource,
    ResourceCollection,
    RawResponse,
    Redirect,
    DeclaredError,
}

/// One response a route can produce.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResponse {
    pub kind: ResponseKind,
    /// The response (or error) type it was resolved from
    pub ty: TypeIdentity,
    pub status: u16,
    pub description: String,
    /// Body schema; `None` when the response carries no content
    pub schema: Option<SchemaNode>,
}

impl ResolvedResponse {
    /// The same response with its body dropped, for methods such as HEAD
    pub fn without_body(mut self) -> Self {
        self.schema = None;
        self
    }
}

/// Response resolver - turns response and error types into schemas
pub struct ResponseResolver<'a, 'c> {
    collaborators: Collaborators<'a>,
    introspector: RouteIntrospector<'a>,
    cache: &'c mut ShapeCache,
}

impl<'a, 'c> ResponseResolver<'a, 'c> {
    pub fn new(collaborators: Collaborators<'a>, cache: &'c mut ShapeCache) -> Self {
        Self {
            collaborators,
            introspector: RouteIntrospector::new(collaborators.metadata),
            cache,
        }
    }

    /// The success response of a route.
    ///
    /// Routes without a return type, or returning a type the application
    /// does not define, have no resolvable default response.
    pub fn resolve_default(&mut self, route: &Route) -> Result<Option<ResolvedResponse>> {
        let Some(ty) = self.introspector.response_type(route) else {
            return Ok(None);
        };

        let metadata = self.collaborators.metadata;
        if !metadata.type_exists(&ty) {
            debug!("Response type {} is not defined by the application", ty);
            return Ok(None);
        }
        self.introspector.unambiguous(&ty)?;

        let (kind, status, schema) = match metadata.type_kind(&ty) {
            Some(TypeKind::Resource) => (
                ResponseKind::SingleResource,
                STATUS_OK,
                Some(self.resource_schema(&ty)?),
            ),
            Some(TypeKind::ResourceCollection) => (
                ResponseKind::ResourceCollection,
                STATUS_OK,
                Some(self.collection_schema(&ty)?),
            ),
            Some(TypeKind::RawResponse) => {
                (ResponseKind::RawResponse, STATUS_OK, self.raw_schema(&ty)?)
            }
            Some(TypeKind::Redirect) => (ResponseKind::Redirect, STATUS_FOUND, None),
            Some(TypeKind::Request) | None => {
                return Err(Error::UnsupportedResponseType {
                    type_name: ty.to_string(),
                })
            }
        };

        let fallback = match kind {
            ResponseKind::Redirect => REDIRECT_DESCRIPTION,
            _ => SUCCESS_DESCRIPTION,
        };
        let description = self
            .introspector
            .type_summary(&ty)
            .unwrap_or_else(|| fallback.to_string());

        Ok(Some(ResolvedResponse {
            kind,
            ty,
            status,
            description,
            schema,
        }))
    }

    /// One response per error type the route documents
    pub fn resolve_errors(&mut self, route: &Route) -> Result<Vec<ResolvedResponse>> {
        let mut responses = Vec::new();

        for error in self.introspector.declared_error_types(route) {
            self.introspector.unambiguous(&error)?;
            let summary = self.introspector.type_summary(&error);
            let instance = ErrorInstance {
                error: error.clone(),
                message: summary.clone().unwrap_or_else(|| error.to_string()),
            };

            let rendered = self.collaborators.errors.render(&instance)?;
            debug!("Error {} renders with status {}", error, rendered.status);

            let schema = match &rendered.body {
                Value::Null => None,
                body => Some(SchemaBuilder::from_value(error.as_str(), body)?),
            };

            responses.push(ResolvedResponse {
                kind: ResponseKind::DeclaredError,
                description: summary.unwrap_or_else(|| error.to_string()),
                ty: error,
                status: rendered.status,
                schema,
            });
        }

        Ok(responses)
    }

    fn entity_of(&self, resource: &TypeIdentity) -> Result<TypeIdentity> {
        self.collaborators
            .metadata
            .wrapped_entity(resource)
            .ok_or_else(|| Error::MissingTypeAnnotation {
                type_name: resource.to_string(),
            })
    }

    fn resource_schema(&mut self, resource: &TypeIdentity) -> Result<SchemaNode> {
        let entity = self.entity_of(resource)?;
        let collaborators = self.collaborators;

        self.cache.get_or_try_insert_with(resource, || {
            let samples = sample(&collaborators, &entity, 1)?;
            render_first(&collaborators, resource, &samples)
        })
    }

    fn collection_schema(&mut self, collection: &TypeIdentity) -> Result<SchemaNode> {
        let resource = self
            .collaborators
            .metadata
            .collected_resource(collection)
            .ok_or_else(|| Error::MissingTypeAnnotation {
                type_name: collection.to_string(),
            })?;
        self.introspector.unambiguous(&resource)?;
        let entity = self.entity_of(&resource)?;
        let collaborators = self.collaborators;

        let item = self.cache.get_or_try_insert_with(&resource, || {
            let samples = sample(&collaborators, &entity, 2)?;
            render_first(&collaborators, &resource, &samples)
        })?;

        Ok(SchemaNode::array_of(collection.as_str(), item))
    }

    fn raw_schema(&mut self, response: &TypeIdentity) -> Result<Option<SchemaNode>> {
        let params = self.collaborators.metadata.constructor_params(response);
        let Some(entity) = params.first() else {
            debug!("{} wraps no entity, documenting it without a body", response);
            return Ok(None);
        };

        let samples = sample(&self.collaborators, entity, 1)?;
        let node = SchemaBuilder::from_value(response.as_str(), &samples[0])?;
        Ok(Some(node))
    }
}

/// Ask the factory for `count` samples, at least one of which must exist
fn sample(collaborators: &Collaborators<'_>, entity: &TypeIdentity, count: usize) -> Result<Vec<Value>> {
    debug!("Making {} sample(s) of {}", count, entity);
    let samples = collaborators.factory.make(entity, count)?;
    if samples.is_empty() {
        return Err(Error::Collaborator(format!(
            "The factory for {} produced no samples",
            entity
        )));
    }
    Ok(samples)
}

/// Render every sample through the resource and walk the first
fn render_first(
    collaborators: &Collaborators<'_>,
    resource: &TypeIdentity,
    samples: &[Value],
) -> Result<SchemaNode> {
    let rendered = samples
        .iter()
        .map(|sample| collaborators.transform.render(resource, sample))
        .collect::<Result<Vec<_>>>()?;

    SchemaBuilder::from_value(resource.as_str(), &rendered[0])
}
