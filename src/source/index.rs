//! Type metadata read from the application's Rust sources.
//!
//! Handlers are inherent methods (`impl UserController { pub fn show(..) }`),
//! request/resource/response kinds come from trait implementations matched
//! through [`Conventions`], and a resource's entity is taken from, in order:
//! an `@entity Type` line in the docs of the type or of its `new`
//! constructor, an `Entity` associated type, or the first parameter of `new`.

use super::conventions::Conventions;
use super::parser::{ParsedFile, SourceParser};
use super::scanner::SourceScanner;
use crate::collaborators::{HandlerSignature, ParamType, TypeIdentity, TypeKind, TypeMetadata};
use crate::introspector::DocBlock;
use anyhow::Result;
use log::{debug, info};
use std::collections::HashMap;
use std::path::Path;
use syn::{Attribute, Expr, ExprLit, FnArg, GenericArgument, ImplItem, Item, ItemImpl, Lit, Meta, PathArguments, ReturnType, Type, UseTree};

/// Doc tag naming the entity a resource wraps
pub const ENTITY_TAG: &str = "entity";

/// Single-argument wrappers looked through when naming a returned or
/// constructed type
const TRANSPARENT_WRAPPERS: &[&str] = &["Result", "Option", "Box", "Arc", "Rc"];

/// lowercased alias -> full path
type ImportTable = HashMap<String, String>;

#[derive(Debug, Default)]
struct TypeEntry {
    docs: Option<String>,
    kind: Option<TypeKind>,
    entity: Option<TypeIdentity>,
    collects: Option<TypeIdentity>,
    entity_override: Option<TypeIdentity>,
    constructor: Vec<TypeIdentity>,
    /// Modules holding a definition, as `file` or `file::module`
    sites: Vec<String>,
}

/// Index of the types and handlers defined by an application.
#[derive(Debug, Default)]
pub struct SourceIndex {
    types: HashMap<String, TypeEntry>,
    handlers: HashMap<(String, String), HandlerSignature>,
    redirect_types: Vec<String>,
}

impl SourceIndex {
    /// Scan and index every Rust file under `root`.
    ///
    /// Files that fail to parse are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be read.
    pub fn scan(root: &Path, conventions: &Conventions) -> Result<Self> {
        let scan = SourceScanner::new(root).scan()?;
        let files = SourceParser::parse_all(&scan.files);
        Ok(Self::from_files(&files, conventions))
    }

    pub fn from_files(files: &[ParsedFile], conventions: &Conventions) -> Self {
        let mut index = SourceIndex {
            redirect_types: conventions.redirect_types.clone(),
            ..Default::default()
        };

        for file in files {
            debug!("Indexing {}", file.path.display());
            let imports = collect_imports(&file.syntax_tree.items, ImportTable::new());
            let module = file.path.display().to_string();
            index.index_items(&file.syntax_tree.items, &module, &imports, conventions);
        }

        info!(
            "Indexed {} types and {} handlers from {} files",
            index.types.len(),
            index.handlers.len(),
            files.len()
        );
        index
    }

    fn index_items(&mut self, items: &[Item], module: &str, imports: &ImportTable, conventions: &Conventions) {
        for item in items {
            match item {
                Item::Struct(item) => self.define(item.ident.to_string(), module, &item.attrs),
                Item::Enum(item) => self.define(item.ident.to_string(), module, &item.attrs),
                Item::Type(item) => self.define(item.ident.to_string(), module, &item.attrs),
                Item::Impl(item) => self.index_impl(item, imports, conventions),
                Item::Mod(item) => {
                    if let Some((_, content)) = &item.content {
                        let nested = collect_imports(content, imports.clone());
                        let nested_module = format!("{}::{}", module, item.ident);
                        self.index_items(content, &nested_module, &nested, conventions);
                    }
                }
                _ => {}
            }
        }
    }

    fn define(&mut self, name: String, module: &str, attrs: &[Attribute]) {
        let entry = self.types.entry(name).or_default();
        if !entry.sites.iter().any(|site| site == module) {
            entry.sites.push(module.to_string());
        }
        if let Some(docs) = doc_text(attrs) {
            if let Some(entity) = entity_tag(&docs) {
                entry.entity_override = Some(entity);
            }
            entry.docs = Some(docs);
        }
    }

    fn index_impl(&mut self, item: &ItemImpl, imports: &ImportTable, conventions: &Conventions) {
        let Some(self_name) = type_name(&item.self_ty) else {
            return;
        };

        if let Some((_, trait_path, _)) = &item.trait_ {
            let entry = self.types.entry(self_name.clone()).or_default();
            let trait_name = trait_path.segments.last().map(|s| s.ident.to_string());
            if let Some(kind) = trait_name.as_deref().and_then(|name| conventions.kind_for_trait(name)) {
                debug!("{} is a {:?}", self_name, kind);
                entry.kind = Some(kind);
            }

            for impl_item in &item.items {
                if let ImplItem::Type(assoc) = impl_item {
                    let target = core_type_name(&assoc.ty).map(TypeIdentity::new);
                    match assoc.ident.to_string().as_str() {
                        "Entity" => entry.entity = target,
                        "Collects" => entry.collects = target,
                        _ => {}
                    }
                }
            }
            return;
        }

        for impl_item in &item.items {
            let ImplItem::Fn(method) = impl_item else {
                continue;
            };
            let action = method.sig.ident.to_string();
            let signature = handler_signature(&method.sig, &method.attrs, &self_name, imports);

            if action == "new" {
                let entry = self.types.entry(self_name.clone()).or_default();
                entry.constructor = method
                    .sig
                    .inputs
                    .iter()
                    .filter_map(|input| match input {
                        FnArg::Typed(arg) => core_type_name(&arg.ty).map(TypeIdentity::new),
                        FnArg::Receiver(_) => None,
                    })
                    .collect();
                if let Some(entity) = signature.docs.as_deref().and_then(entity_tag) {
                    entry.entity_override = Some(entity);
                }
            } else {
                self.types.entry(self_name.clone()).or_default();
            }

            self.handlers.insert((self_name.clone(), action), signature);
        }
    }

    fn entry(&self, ty: &TypeIdentity) -> Option<&TypeEntry> {
        self.types.get(ty.as_str())
    }

    fn is_redirect_type(&self, ty: &TypeIdentity) -> bool {
        self.redirect_types.iter().any(|name| name == ty.as_str())
    }
}

impl TypeMetadata for SourceIndex {
    fn handler(&self, controller: &TypeIdentity, action: &str) -> Option<HandlerSignature> {
        self.handlers
            .get(&(controller.to_string(), action.to_string()))
            .cloned()
    }

    fn type_exists(&self, ty: &TypeIdentity) -> bool {
        self.types.contains_key(ty.as_str()) || self.is_redirect_type(ty)
    }

    fn type_kind(&self, ty: &TypeIdentity) -> Option<TypeKind> {
        self.entry(ty)
            .and_then(|entry| entry.kind)
            .or_else(|| self.is_redirect_type(ty).then_some(TypeKind::Redirect))
    }

    fn type_docs(&self, ty: &TypeIdentity) -> Option<String> {
        self.entry(ty)?.docs.clone()
    }

    fn wrapped_entity(&self, resource: &TypeIdentity) -> Option<TypeIdentity> {
        let entry = self.entry(resource)?;
        entry
            .entity_override
            .clone()
            .or_else(|| entry.entity.clone())
            .or_else(|| entry.constructor.first().cloned())
    }

    /// The `Collects` associated type, else `UserCollection` collects
    /// `UserResource` or `User`, whichever is a resource
    fn collected_resource(&self, collection: &TypeIdentity) -> Option<TypeIdentity> {
        if let Some(collects) = self.entry(collection).and_then(|entry| entry.collects.clone()) {
            return Some(collects);
        }

        let base = collection.as_str().strip_suffix("Collection")?;
        [format!("{}Resource", base), base.to_string()]
            .into_iter()
            .map(TypeIdentity::new)
            .find(|candidate| self.type_kind(candidate) == Some(TypeKind::Resource))
    }

    fn constructor_params(&self, ty: &TypeIdentity) -> Vec<TypeIdentity> {
        self.entry(ty)
            .map(|entry| entry.constructor.clone())
            .unwrap_or_default()
    }

    fn definition_sites(&self, ty: &TypeIdentity) -> Vec<String> {
        self.entry(ty)
            .map(|entry| entry.sites.clone())
            .unwrap_or_default()
    }
}

fn handler_signature(
    sig: &syn::Signature,
    attrs: &[Attribute],
    self_name: &str,
    imports: &ImportTable,
) -> HandlerSignature {
    let params = sig
        .inputs
        .iter()
        .filter_map(|input| match input {
            FnArg::Typed(arg) => Some(ParamType {
                candidates: type_candidates(&arg.ty),
            }),
            FnArg::Receiver(_) => None,
        })
        .filter(|param| !param.candidates.is_empty())
        .collect();

    let returns = match &sig.output {
        ReturnType::Type(_, ty) => core_type_name(ty).map(|name| {
            if name == "Self" {
                TypeIdentity::new(self_name)
            } else {
                TypeIdentity::new(name)
            }
        }),
        ReturnType::Default => None,
    };

    HandlerSignature {
        params,
        returns,
        docs: doc_text(attrs),
        imports: imports.clone(),
    }
}

/// Outer type name followed by the names of its generic arguments
fn type_candidates(ty: &Type) -> Vec<TypeIdentity> {
    match ty {
        Type::Reference(reference) => type_candidates(&reference.elem),
        Type::Paren(paren) => type_candidates(&paren.elem),
        Type::Group(group) => type_candidates(&group.elem),
        Type::Path(path) => {
            let Some(segment) = path.path.segments.last() else {
                return Vec::new();
            };
            let mut candidates = vec![TypeIdentity::new(segment.ident.to_string())];
            if let PathArguments::AngleBracketed(args) = &segment.arguments {
                for arg in &args.args {
                    if let GenericArgument::Type(inner) = arg {
                        candidates.extend(type_candidates(inner));
                    }
                }
            }
            candidates
        }
        _ => Vec::new(),
    }
}

/// Name of the type, looking through references and transparent wrappers
fn core_type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Reference(reference) => core_type_name(&reference.elem),
        Type::Paren(paren) => core_type_name(&paren.elem),
        Type::Group(group) => core_type_name(&group.elem),
        Type::Path(path) => {
            let segment = path.path.segments.last()?;
            let name = segment.ident.to_string();
            if TRANSPARENT_WRAPPERS.contains(&name.as_str()) {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    return args.args.iter().find_map(|arg| match arg {
                        GenericArgument::Type(inner) => core_type_name(inner),
                        _ => None,
                    });
                }
            }
            Some(name)
        }
        _ => None,
    }
}

fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Reference(reference) => type_name(&reference.elem),
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// Joined `///` lines, one leading space stripped from each
fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(meta) => match &meta.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(text), ..
                }) => Some(text.value()),
                _ => None,
            },
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        return None;
    }
    let text = lines
        .iter()
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n");
    Some(text)
}

fn entity_tag(docs: &str) -> Option<TypeIdentity> {
    let block = DocBlock::parse(docs);
    let body = block.tag_values(ENTITY_TAG).next()?;
    body.split_whitespace().next().map(TypeIdentity::new)
}

fn collect_imports(items: &[Item], mut table: ImportTable) -> ImportTable {
    for item in items {
        if let Item::Use(item) = item {
            walk_use_tree(&item.tree, &mut Vec::new(), &mut table);
        }
    }
    table
}

fn walk_use_tree(tree: &UseTree, prefix: &mut Vec<String>, table: &mut ImportTable) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            walk_use_tree(&path.tree, prefix, table);
            prefix.pop();
        }
        UseTree::Name(name) => {
            let ident = name.ident.to_string();
            if ident == "self" {
                if let Some(last) = prefix.last() {
                    table.insert(last.to_ascii_lowercase(), prefix.join("::"));
                }
            } else {
                let full = prefix.iter().chain(std::iter::once(&ident)).cloned().collect::<Vec<_>>();
                table.insert(ident.to_ascii_lowercase(), full.join("::"));
            }
        }
        UseTree::Rename(rename) => {
            let mut full = prefix.clone();
            full.push(rename.ident.to_string());
            table.insert(rename.rename.to_string().to_ascii_lowercase(), full.join("::"));
        }
        UseTree::Group(group) => {
            for tree in &group.items {
                walk_use_tree(tree, prefix, table);
            }
        }
        UseTree::Glob(_) => {}
    }
}
