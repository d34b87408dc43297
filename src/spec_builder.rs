//! Document assembly.
//!
//! [`build_swagger`] folds every route of every configured service into one
//! Swagger 2.0 document. The build is a pure function of its [`Config`]: the
//! definitions and shared indices live only for the duration of the call.

use crate::definition_builder::DefinitionBuilder;
use crate::error::Result;
use crate::parameter_builder::ParameterBuilder;
use crate::path_builder::build_paths;
use crate::response_builder::ResponseBuilder;
use crate::route::{Container, WebService};
use crate::swagger::{PathItem, Swagger};
use crate::types::{TypeDescriptor, TypeRegistry};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Maps a type to its definition key; `None` falls back to the type's own name
pub type ModelTypeNameHandler = Arc<dyn Fn(&TypeDescriptor) -> Option<String> + Send + Sync>;

/// Maps a type key to a schema format ahead of the built-in table
pub type SchemaFormatHandler = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Customizes the finished document (info, security definitions, tags)
pub type PostBuildHandler = Arc<dyn Fn(&mut Swagger) + Send + Sync>;

/// Everything a build reads.
#[derive(Clone, Default)]
pub struct Config {
    pub services: Vec<Arc<WebService>>,
    pub types: TypeRegistry,
    /// Consumes and produces of operations whose routes and services declare none
    pub default_content_types: Vec<String>,
    pub model_type_name_handler: Option<ModelTypeNameHandler>,
    pub schema_format_handler: Option<SchemaFormatHandler>,
    pub post_build_handler: Option<PostBuildHandler>,
}

impl Config {
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            types,
            ..Default::default()
        }
    }

    pub fn service(mut self, service: WebService) -> Self {
        self.services.push(Arc::new(service));
        self
    }

    pub fn with_services(mut self, services: Vec<Arc<WebService>>) -> Self {
        self.services = services;
        self
    }

    /// Use the services registered in a container at this moment
    pub fn with_container(self, container: &Container) -> Self {
        self.with_services(container.snapshot())
    }

    pub fn with_default_content_types(mut self, mime_types: &[&str]) -> Self {
        self.default_content_types = mime_types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_model_type_name_handler(mut self, handler: ModelTypeNameHandler) -> Self {
        self.model_type_name_handler = Some(handler);
        self
    }

    pub fn with_schema_format_handler(mut self, handler: SchemaFormatHandler) -> Self {
        self.schema_format_handler = Some(handler);
        self
    }

    pub fn with_post_build_handler(mut self, handler: PostBuildHandler) -> Self {
        self.post_build_handler = Some(handler);
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("services", &self.services.len())
            .field("types", &self.types.len())
            .field("default_content_types", &self.default_content_types)
            .field("model_type_name_handler", &self.model_type_name_handler.is_some())
            .field("schema_format_handler", &self.schema_format_handler.is_some())
            .field("post_build_handler", &self.post_build_handler.is_some())
            .finish()
    }
}

/// State of one build: the definition registry and the shared indices.
pub struct SwaggerBuilder<'a> {
    pub(crate) config: &'a Config,
    pub(crate) definitions: DefinitionBuilder<'a>,
    pub(crate) parameters: ParameterBuilder,
    pub(crate) responses: ResponseBuilder,
}

impl<'a> SwaggerBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            definitions: DefinitionBuilder::new(config),
            parameters: ParameterBuilder::new(),
            responses: ResponseBuilder::new(),
        }
    }

    /// Turn the collected state into a document around `paths`
    pub fn finish(mut self, paths: BTreeMap<String, PathItem>) -> Result<Swagger> {
        let parameters = self.parameters.shared_parameters(&mut self.definitions)?;
        let responses = self.responses.shared_responses(&mut self.definitions)?;
        Ok(Swagger {
            paths,
            definitions: self.definitions.into_definitions(),
            parameters,
            responses,
            ..Default::default()
        })
    }
}

/// Build the document for every service in the configuration.
///
/// Path items of different services at the same sanitized path are merged
/// slot by slot. The post-build hook runs last, on the complete document.
pub fn build_swagger(config: &Config) -> Result<Swagger> {
    let mut sb = SwaggerBuilder::new(config);
    let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();

    for service in &config.services {
        debug!(
            "Building service {} ({} routes)",
            service.root_path(),
            service.routes().len()
        );
        for (path, item) in build_paths(service, &mut sb)? {
            paths.entry(path).or_default().merge(item);
        }
    }

    let mut swagger = sb.finish(paths)?;
    if let Some(handler) = &config.post_build_handler {
        handler(&mut swagger);
    }
    info!(
        "Built document with {} paths and {} definitions",
        swagger.paths.len(),
        swagger.definitions.len()
    );
    Ok(swagger)
}
