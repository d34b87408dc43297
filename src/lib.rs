//! Swagger 2.0 documents from declared routes.
//!
//! Services are declared as a tree of routes, each with its parameters,
//! request payload and possible responses. Payload types are described
//! structurally by [`types::TypeDescriptor`] values whose named structs live
//! in a [`types::TypeRegistry`]. [`build_swagger`] turns the declarations into
//! one document: path items with their operations, a definition for every
//! model reachable from a payload, and the parameters and responses shared by
//! reference name.
//!
//! # Architecture
//!
//! 1. [`path`] - Normalizes path templates and extracts segment patterns
//! 2. [`definition_builder`] - Derives model definitions from type descriptors
//! 3. [`parameter_builder`] and [`response_builder`] - Build parameter and
//!    response objects and keep the shared indices
//! 4. [`path_builder`] - Maps routes to operations grouped by sanitized path
//! 5. [`spec_builder`] - Assembles the document and runs the post-build hook
//!
//! Around the engine, [`type_resolver`] and [`source`] read model structs from
//! Rust source, [`manifest`] reads declared services, and [`serializer`]
//! renders the result.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use swagger_from_routes::{
//!     build_swagger, serializer::serialize_yaml, Config, ParameterDescriptor, RouteBuilder,
//!     TypeDescriptor, TypeResolver, WebService,
//! };
//!
//! let types = TypeResolver::from_source(
//!     "pub struct User { pub id: Option<i64>, pub name: String }",
//! )
//! .unwrap();
//!
//! let user_id = Arc::new(ParameterDescriptor::path("user-id", "identifier").ref_name("userID"));
//! let service = WebService::new("/users")
//!     .unwrap()
//!     .produces(&["application/json"])
//!     .route(
//!         RouteBuilder::get("/{user-id}")
//!             .param(Arc::clone(&user_id))
//!             .returns(200, "OK", Some(TypeDescriptor::named("User"))),
//!     )
//!     .unwrap()
//!     .route(RouteBuilder::delete("/{user-id}").param(user_id))
//!     .unwrap();
//!
//! let config = Config::new(types.into_registry()).service(service);
//! let document = build_swagger(&config).unwrap();
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod definition_builder;
pub mod error;
pub mod manifest;
pub mod parameter_builder;
pub mod path;
pub mod path_builder;
pub mod property;
pub mod response_builder;
pub mod route;
pub mod serializer;
pub mod source;
pub mod spec_builder;
pub mod swagger;
pub mod type_resolver;
pub mod types;

pub use error::{BuildError, Result};
pub use route::{
    CollectionFormat, Container, HttpMethod, ParameterDescriptor, ParameterKind,
    ResponseDescriptor, RouteBuilder, WebService,
};
pub use spec_builder::{build_swagger, Config};
pub use swagger::Swagger;
pub use type_resolver::TypeResolver;
pub use types::{FieldDef, FieldMeta, PrimitiveKind, StructDef, TypeDescriptor, TypeRegistry};
