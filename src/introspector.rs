//! What a route's handler declares: request and response types, human text,
//! and the errors its documentation says it may produce.

use crate::collaborators::{HandlerSignature, Route, TypeIdentity, TypeKind, TypeMetadata};
use crate::error::{Error, Result};
use log::{debug, warn};

/// Tag introducing a declared error type in a doc block
pub const THROWS_TAG: &str = "throws";

/// A parsed documentation block.
///
/// ```text
/// Show one user.
///
/// Longer description, possibly over
/// several paragraphs.
///
/// # Errors
///
/// - `NotFound` when the user does not exist
///
/// @throws Forbidden
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    pub summary: Option<String>,
    pub description: Option<String>,
    /// `@name body` lines, in order
    pub tags: Vec<(String, String)>,
    /// First back-ticked name of each bullet under `# Errors`
    pub error_items: Vec<String>,
}

impl DocBlock {
    pub fn parse(text: &str) -> Self {
        let mut block = DocBlock::default();
        let mut summary: Vec<&str> = Vec::new();
        let mut description: Vec<&str> = Vec::new();
        let mut in_summary = true;
        let mut in_prose = true;
        let mut section: Option<String> = None;

        for line in text.lines().map(str::trim) {
            if let Some(tag) = line.strip_prefix('@') {
                in_prose = false;
                let (name, body) = tag.split_once(char::is_whitespace).unwrap_or((tag, ""));
                block.tags.push((name.to_string(), body.trim().to_string()));
                continue;
            }

            if line.starts_with('#') {
                in_prose = false;
                section = Some(line.trim_start_matches('#').trim().to_ascii_lowercase());
                continue;
            }

            if !in_prose {
                if section.as_deref() == Some("errors") {
                    if let Some(name) = bullet_type_name(line) {
                        block.error_items.push(name);
                    }
                }
                continue;
            }

            if in_summary {
                if line.is_empty() {
                    if !summary.is_empty() {
                        in_summary = false;
                    }
                } else {
                    summary.push(line);
                }
            } else {
                description.push(line);
            }
        }

        block.summary = non_empty(summary.join(" "));
        block.description = non_empty(collapse_paragraphs(&description));
        block
    }

    /// Bodies of every tag with this name
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |(tag, _)| tag == name)
            .map(|(_, body)| body.as_str())
    }
}

fn non_empty(text: String) -> Option<String> {
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Lines of one paragraph join with spaces, paragraphs with a blank line
fn collapse_paragraphs(lines: &[&str]) -> String {
    lines
        .split(|line| line.is_empty())
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| paragraph.join(" "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn bullet_type_name(line: &str) -> Option<String> {
    let item = line.strip_prefix('-').or_else(|| line.strip_prefix('*'))?;
    let start = item.find('`')? + 1;
    let len = item[start..].find('`')?;
    let name = item[start..start + len].trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Route introspector - reads types and documentation of route handlers
pub struct RouteIntrospector<'a> {
    metadata: &'a dyn TypeMetadata,
}

impl<'a> RouteIntrospector<'a> {
    pub fn new(metadata: &'a dyn TypeMetadata) -> Self {
        Self { metadata }
    }

    fn signature(&self, route: &Route) -> Option<HandlerSignature> {
        let (controller, action) = route.controller_action()?;
        let signature = self.metadata.handler(controller, action);
        if signature.is_none() {
            debug!("No signature found for {}::{}", controller, action);
        }
        signature
    }

    fn doc_block(&self, route: &Route) -> DocBlock {
        self.signature(route)
            .and_then(|signature| signature.docs)
            .map(|docs| DocBlock::parse(&docs))
            .unwrap_or_default()
    }

    /// The first handler parameter (or generic argument of one) that is a
    /// request type
    pub fn request_type(&self, route: &Route) -> Option<TypeIdentity> {
        self.signature(route)?
            .params
            .into_iter()
            .flat_map(|param| param.candidates)
            .find(|candidate| self.metadata.type_kind(candidate) == Some(TypeKind::Request))
    }

    pub fn response_type(&self, route: &Route) -> Option<TypeIdentity> {
        self.signature(route)?.returns
    }

    pub fn controller_summary(&self, route: &Route) -> Option<String> {
        self.doc_block(route).summary
    }

    pub fn controller_description(&self, route: &Route) -> Option<String> {
        self.doc_block(route).description
    }

    /// Fails when several modules define a type named `ty`
    pub fn unambiguous(&self, ty: &TypeIdentity) -> Result<()> {
        let sites = self.metadata.definition_sites(ty);
        if sites.len() > 1 {
            return Err(Error::AmbiguousType {
                type_name: ty.to_string(),
                sites,
            });
        }
        Ok(())
    }

    /// Summary of a type's own documentation
    pub fn type_summary(&self, ty: &TypeIdentity) -> Option<String> {
        DocBlock::parse(&self.metadata.type_docs(ty)?).summary
    }

    /// Error types the handler documents, resolved to known types.
    ///
    /// Names that resolve to nothing are dropped with a warning.
    pub fn declared_error_types(&self, route: &Route) -> Vec<TypeIdentity> {
        let Some(signature) = self.signature(route) else {
            return Vec::new();
        };
        let Some(docs) = signature.docs.as_deref() else {
            return Vec::new();
        };
        let block = DocBlock::parse(docs);

        let declared = block
            .tag_values(THROWS_TAG)
            .filter_map(|body| body.split_whitespace().next())
            .chain(block.error_items.iter().map(String::as_str));

        let mut resolved: Vec<TypeIdentity> = Vec::new();
        for name in declared {
            match self.resolve_error_type(name, &signature) {
                Some(ty) if !resolved.contains(&ty) => resolved.push(ty),
                Some(_) => {}
                None => warn!(
                    "Declared error type {} on route /{} cannot be resolved, skipping",
                    name,
                    route.uri.trim_start_matches('/')
                ),
            }
        }
        resolved
    }

    fn resolve_error_type(&self, name: &str, signature: &HandlerSignature) -> Option<TypeIdentity> {
        let short = TypeIdentity::new(name.trim_matches('`'));
        if self.metadata.type_exists(&short) {
            return Some(short);
        }

        let path = signature.imports.get(&short.as_str().to_ascii_lowercase())?;
        let imported = TypeIdentity::new(path);
        self.metadata.type_exists(&imported).then_some(imported)
    }
}
