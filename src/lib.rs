//! OpenAPI from rules - OpenAPI 3.0 documents from an application's own
//! validation rules, resources and handler documentation.
//!
//! Nothing is hand-annotated: request bodies come from the validation rules
//! of each handler's request type, response bodies from rendering resources
//! around sample entities, and error responses from running declared error
//! types through the application's error renderer.
//!
//! # Architecture
//!
//! 1. [`collaborators`] - The traits through which the application is seen
//! 2. [`rules`] - Rule registry, rule parser and validation messages
//! 3. [`enricher`] - Example values for described fields
//! 4. [`schema_generator`] - Schema trees from descriptors and sample values
//! 5. [`introspector`] - Request/response types and documentation of handlers
//! 6. [`response`] and [`cache`] - Default and error responses, computed once per resource
//! 7. [`openapi_builder`] - Assembles the document route by route
//! 8. [`source`] - Type metadata read from Rust sources
//! 9. [`manifest`] - Routes, rules, samples and error rendering read from a manifest file
//! 10. [`serializer`] - YAML or JSON output
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_rules::{
//!     collaborators::Collaborators,
//!     manifest::Manifest,
//!     openapi_builder::assemble_with_info,
//!     serializer::serialize_yaml,
//!     source::SourceIndex,
//! };
//! use std::path::Path;
//!
//! let manifest = Manifest::from_path(Path::new("shop/openapi-app.yaml")).unwrap();
//! let index = SourceIndex::scan(Path::new("shop/src"), manifest.conventions()).unwrap();
//!
//! let collaborators = Collaborators::new(&manifest, &index);
//! let document = assemble_with_info(&collaborators, manifest.info().clone()).unwrap();
//!
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cache;
pub mod cli;
pub mod collaborators;
pub mod enricher;
pub mod error;
pub mod introspector;
pub mod manifest;
pub mod openapi_builder;
pub mod response;
pub mod rules;
pub mod schema_generator;
pub mod serializer;
pub mod source;
