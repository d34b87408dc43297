//! Service and route declarations.
//!
//! A [`WebService`] groups routes under a root path template and carries the
//! path parameters shared by all of them. Routes are assembled with a
//! [`RouteBuilder`] and validated when they are added to the service.
//!
//! Parameter and response descriptors are shared through `Arc`. Two uses of a
//! reference name must point at the same `Arc`; the document builders compare
//! them by pointer identity.

use crate::error::{BuildError, Result};
use crate::path::{concat_path, format_template, sanitize_path, validate_template};
use crate::swagger::Schema;
use crate::types::TypeDescriptor;
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Metadata key holding the tag list of a route
pub const KEY_OPENAPI_TAGS: &str = "openapi.tags";

/// HTTP methods that have an operation slot in a path item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HttpMethod::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported HTTP method '{}'", s))
    }
}

/// Where a parameter is carried in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Path,
    Query,
    Body,
    Header,
    #[serde(rename = "formData", alias = "form")]
    Form,
}

impl ParameterKind {
    /// Value of the parameter's `in` keyword
    pub fn location(self) -> &'static str {
        match self {
            ParameterKind::Path => "path",
            ParameterKind::Query => "query",
            ParameterKind::Body => "body",
            ParameterKind::Header => "header",
            ParameterKind::Form => "formData",
        }
    }
}

/// How the values of a multi-valued parameter are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionFormat {
    /// `foo,bar`
    Csv,
    /// `foo bar`
    Ssv,
    /// tab separated
    Tsv,
    /// `foo|bar`
    Pipes,
    /// repeated parameter instances, query and form parameters only
    Multi,
}

impl CollectionFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionFormat::Csv => "csv",
            CollectionFormat::Ssv => "ssv",
            CollectionFormat::Tsv => "tsv",
            CollectionFormat::Pipes => "pipes",
            CollectionFormat::Multi => "multi",
        }
    }
}

/// A documented request parameter.
///
/// `sample` drives type inference; `data_type` names a type explicitly when the
/// sample has no primitive kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub kind: ParameterKind,
    pub description: String,
    pub required: bool,
    pub ref_name: Option<String>,
    pub sample: TypeDescriptor,
    pub data_type: Option<String>,
    pub data_format: Option<String>,
    pub default: Option<Value>,
    pub allow_multiple: bool,
    pub collection_format: Option<CollectionFormat>,
    pub minimum: Option<Value>,
    pub maximum: Option<Value>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub enum_values: Option<Vec<Value>>,
    /// Body schema used as given instead of being derived from the sample
    pub schema: Option<Schema>,
}

impl ParameterDescriptor {
    fn with_kind(kind: ParameterKind, name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: false,
            ref_name: None,
            sample: TypeDescriptor::string(),
            data_type: None,
            data_format: None,
            default: None,
            allow_multiple: false,
            collection_format: None,
            minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            pattern: None,
            enum_values: None,
            schema: None,
        }
    }

    /// Path parameters are always required
    pub fn path(name: &str, description: &str) -> Self {
        Self::with_kind(ParameterKind::Path, name, description).required(true)
    }

    pub fn query(name: &str, description: &str) -> Self {
        Self::with_kind(ParameterKind::Query, name, description)
    }

    pub fn body(name: &str, description: &str) -> Self {
        Self::with_kind(ParameterKind::Body, name, description)
    }

    pub fn header(name: &str, description: &str) -> Self {
        Self::with_kind(ParameterKind::Header, name, description)
    }

    pub fn form(name: &str, description: &str) -> Self {
        Self::with_kind(ParameterKind::Form, name, description)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn ref_name(mut self, ref_name: &str) -> Self {
        self.ref_name = Some(ref_name.to_string());
        self
    }

    pub fn sample(mut self, sample: TypeDescriptor) -> Self {
        self.sample = sample;
        self
    }

    pub fn data_type(mut self, data_type: &str) -> Self {
        self.data_type = Some(data_type.to_string());
        self
    }

    pub fn data_format(mut self, data_format: &str) -> Self {
        self.data_format = Some(data_format.to_string());
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn allow_multiple(mut self, allow_multiple: bool) -> Self {
        self.allow_multiple = allow_multiple;
        self
    }

    pub fn collection_format(mut self, format: CollectionFormat) -> Self {
        self.collection_format = Some(format);
        self
    }

    pub fn minimum(mut self, minimum: Value) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn maximum(mut self, maximum: Value) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn min_length(mut self, min_length: u64) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: u64) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn allowable_values(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The segment written into a path template: `name` or `name:pattern`
    pub fn path_token(&self) -> String {
        match &self.pattern {
            Some(pattern) if !pattern.is_empty() => format!("{}:{}", self.name, pattern),
            _ => self.name.clone(),
        }
    }
}

/// A documented response header
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHeader {
    pub name: String,
    pub description: String,
    pub sample: TypeDescriptor,
    pub example: Option<Value>,
}

/// A documented response, regular or error.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    pub code: u16,
    pub message: String,
    pub sample: Option<TypeDescriptor>,
    pub is_default: bool,
    pub ref_name: Option<String>,
    pub headers: Vec<ResponseHeader>,
}

impl ResponseDescriptor {
    pub fn new(code: u16, message: &str, sample: Option<TypeDescriptor>) -> Self {
        Self {
            code,
            message: message.to_string(),
            sample,
            is_default: false,
            ref_name: None,
            headers: Vec::new(),
        }
    }

    /// The response used for every status code that is not listed
    pub fn default_response(message: &str, sample: Option<TypeDescriptor>) -> Self {
        let mut response = Self::new(0, message, sample);
        response.is_default = true;
        response
    }

    pub fn with_ref_name(mut self, ref_name: &str) -> Self {
        self.ref_name = Some(ref_name.to_string());
        self
    }

    pub fn header(
        mut self,
        name: &str,
        description: &str,
        sample: TypeDescriptor,
        example: Option<Value>,
    ) -> Self {
        self.headers.push(ResponseHeader {
            name: name.to_string(),
            description: description.to_string(),
            sample,
            example,
        });
        self
    }
}

/// A route as registered on its service.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: HttpMethod,
    /// Full path template, service root included
    pub path: String,
    pub operation: String,
    pub doc: String,
    pub notes: String,
    pub parameters: Vec<Arc<ParameterDescriptor>>,
    pub responses: Vec<Arc<ResponseDescriptor>>,
    pub read_sample: Option<TypeDescriptor>,
    pub write_sample: Option<TypeDescriptor>,
    pub metadata: HashMap<String, Value>,
    pub deprecated: bool,
    pub security: Vec<(String, Vec<String>)>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
}

impl Route {
    /// Tags listed under the `openapi.tags` metadata key
    pub fn tags(&self) -> Vec<String> {
        match self.metadata.get(KEY_OPENAPI_TAGS) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Collects the documentation of one route.
///
/// Template errors are remembered and reported when the builder is handed to
/// [`WebService::route`].
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    method: HttpMethod,
    sub_path: String,
    operation: Option<String>,
    doc: String,
    notes: String,
    parameters: Vec<Arc<ParameterDescriptor>>,
    responses: Vec<Arc<ResponseDescriptor>>,
    read_sample: Option<TypeDescriptor>,
    write_sample: Option<TypeDescriptor>,
    metadata: HashMap<String, Value>,
    deprecated: bool,
    security: Vec<(String, Vec<String>)>,
    consumes: Vec<String>,
    produces: Vec<String>,
    error: Option<BuildError>,
}

impl RouteBuilder {
    pub fn new(method: HttpMethod, sub_path: &str) -> Self {
        Self {
            method,
            sub_path: sub_path.to_string(),
            operation: None,
            doc: String::new(),
            notes: String::new(),
            parameters: Vec::new(),
            responses: Vec::new(),
            read_sample: None,
            write_sample: None,
            metadata: HashMap::new(),
            deprecated: false,
            security: Vec::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
            error: None,
        }
    }

    pub fn get(sub_path: &str) -> Self {
        Self::new(HttpMethod::Get, sub_path)
    }

    pub fn post(sub_path: &str) -> Self {
        Self::new(HttpMethod::Post, sub_path)
    }

    pub fn put(sub_path: &str) -> Self {
        Self::new(HttpMethod::Put, sub_path)
    }

    pub fn delete(sub_path: &str) -> Self {
        Self::new(HttpMethod::Delete, sub_path)
    }

    pub fn patch(sub_path: &str) -> Self {
        Self::new(HttpMethod::Patch, sub_path)
    }

    pub fn head(sub_path: &str) -> Self {
        Self::new(HttpMethod::Head, sub_path)
    }

    pub fn options(sub_path: &str) -> Self {
        Self::new(HttpMethod::Options, sub_path)
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn path(mut self, sub_path: &str) -> Self {
        self.sub_path = sub_path.to_string();
        self
    }

    /// Set the sub-path from a `%s` template, one placeholder per parameter,
    /// and document those parameters on the route
    pub fn param_path(mut self, template: &str, params: Vec<Arc<ParameterDescriptor>>) -> Self {
        let tokens: Vec<String> = params.iter().map(|p| p.path_token()).collect();
        match format_template(template, &tokens) {
            Ok(sub_path) => self.sub_path = sub_path,
            Err(err) => self.error = Some(err),
        }
        self.parameters.extend(params);
        self
    }

    pub fn operation(mut self, name: &str) -> Self {
        self.operation = Some(name.to_string());
        self
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = doc.to_string();
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    pub fn param(mut self, param: Arc<ParameterDescriptor>) -> Self {
        self.parameters.push(param);
        self
    }

    /// Document the request payload as a required body parameter named `body`
    pub fn read(mut self, sample: TypeDescriptor, description: &str) -> Self {
        let body = ParameterDescriptor::body("body", description)
            .sample(sample.clone())
            .required(true);
        self.read_sample = Some(sample);
        self.parameters.push(Arc::new(body));
        self
    }

    /// Document the type written back; its models are added to the definitions
    pub fn write(mut self, sample: TypeDescriptor) -> Self {
        self.write_sample = Some(sample);
        self
    }

    pub fn returns(self, code: u16, message: &str, sample: Option<TypeDescriptor>) -> Self {
        self.return_response(Arc::new(ResponseDescriptor::new(code, message, sample)))
    }

    pub fn default_returns(self, message: &str, sample: Option<TypeDescriptor>) -> Self {
        self.return_response(Arc::new(ResponseDescriptor::default_response(message, sample)))
    }

    pub fn return_responses(mut self, responses: &[Arc<ResponseDescriptor>]) -> Self {
        for response in responses {
            self = self.return_response(Arc::clone(response));
        }
        self
    }

    /// A later response for the same code replaces the earlier one
    fn return_response(mut self, response: Arc<ResponseDescriptor>) -> Self {
        match self
            .responses
            .iter_mut()
            .find(|r| r.code == response.code && r.is_default == response.is_default)
        {
            Some(existing) => *existing = response,
            None => self.responses.push(response),
        }
        self
    }

    pub fn metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn tags(self, tags: &[&str]) -> Self {
        self.metadata(KEY_OPENAPI_TAGS, Value::from(tags.to_vec()))
    }

    pub fn deprecate(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn security(mut self, name: &str, scopes: &[&str]) -> Self {
        self.security.push((
            name.to_string(),
            scopes.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn consumes(mut self, mime_types: &[&str]) -> Self {
        self.consumes = mime_types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn produces(mut self, mime_types: &[&str]) -> Self {
        self.produces = mime_types.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Finish the route under a service root.
    ///
    /// Content types that were not set on the route are taken from the service.
    pub fn build(self, root: &str, consumes: &[String], produces: &[String]) -> Result<Route> {
        if let Some(err) = self.error {
            return Err(err);
        }
        validate_template(&self.sub_path)?;

        let path = concat_path(root, &self.sub_path);
        let operation = match self.operation {
            Some(name) if !name.is_empty() => name,
            _ => fallback_operation_name(self.method, &path),
        };

        Ok(Route {
            method: self.method,
            path,
            operation,
            doc: self.doc,
            notes: self.notes,
            parameters: self.parameters,
            responses: self.responses,
            read_sample: self.read_sample,
            write_sample: self.write_sample,
            metadata: self.metadata,
            deprecated: self.deprecated,
            security: self.security,
            consumes: if self.consumes.is_empty() {
                consumes.to_vec()
            } else {
                self.consumes
            },
            produces: if self.produces.is_empty() {
                produces.to_vec()
            } else {
                self.produces
            },
        })
    }
}

/// `get /users/{id}` is named `get_users_id`
fn fallback_operation_name(method: HttpMethod, path: &str) -> String {
    let (sanitized, _) = sanitize_path(path);
    let mut name = method.as_str().to_lowercase();
    for word in sanitized
        .split('/')
        .map(|s| s.trim_matches(|c| c == '{' || c == '}'))
        .filter(|s| !s.is_empty())
    {
        name.push('_');
        name.push_str(word);
    }
    name
}

/// A group of routes sharing a root path.
#[derive(Debug, Clone)]
pub struct WebService {
    root_path: String,
    path_parameters: Vec<Arc<ParameterDescriptor>>,
    consumes: Vec<String>,
    produces: Vec<String>,
    routes: Vec<Route>,
    doc: String,
    api_version: String,
}

impl WebService {
    /// A service rooted at `root`; an empty root means `/`
    pub fn new(root: &str) -> Result<Self> {
        validate_template(root)?;
        Ok(Self {
            root_path: if root.is_empty() { "/".to_string() } else { root.to_string() },
            path_parameters: Vec::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
            routes: Vec::new(),
            doc: String::new(),
            api_version: String::new(),
        })
    }

    /// A service whose root is a `%s` template filled with path parameters.
    ///
    /// The parameters become shared path parameters of every route.
    pub fn param_path(template: &str, params: Vec<Arc<ParameterDescriptor>>) -> Result<Self> {
        if let Some(param) = params.iter().find(|p| p.kind != ParameterKind::Path) {
            return Err(BuildError::MalformedPath {
                path: template.to_string(),
                reason: format!("'{}' is not a path parameter", param.name),
            });
        }
        let tokens: Vec<String> = params.iter().map(|p| p.path_token()).collect();
        let root = format_template(template, &tokens)?;
        let mut service = Self::new(&root)?;
        service.path_parameters = params;
        Ok(service)
    }

    /// Document a parameter of the root path
    pub fn param(mut self, param: Arc<ParameterDescriptor>) -> Self {
        self.path_parameters.push(param);
        self
    }

    pub fn consumes(mut self, mime_types: &[&str]) -> Self {
        self.consumes = mime_types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn produces(mut self, mime_types: &[&str]) -> Self {
        self.produces = mime_types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = doc.to_string();
        self
    }

    pub fn api_version(mut self, version: &str) -> Self {
        self.api_version = version.to_string();
        self
    }

    /// Build a route under this service and append it
    pub fn route(mut self, builder: RouteBuilder) -> Result<Self> {
        let route = builder.build(&self.root_path, &self.consumes, &self.produces)?;
        debug!("Registered route: {} {}", route.method, route.path);
        self.routes.push(route);
        Ok(self)
    }

    /// Drop every route matching the full path and method
    pub fn remove_route(&mut self, path: &str, method: HttpMethod) -> usize {
        let before = self.routes.len();
        self.routes
            .retain(|r| !(r.method == method && r.path == path));
        before - self.routes.len()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn path_parameters(&self) -> &[Arc<ParameterDescriptor>] {
        &self.path_parameters
    }

    pub fn documentation(&self) -> &str {
        &self.doc
    }

    pub fn version(&self) -> &str {
        &self.api_version
    }
}

/// Registered services, safe to extend while documents are being built.
#[derive(Debug, Default)]
pub struct Container {
    services: RwLock<Vec<Arc<WebService>>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, service: WebService) -> Arc<WebService> {
        let service = Arc::new(service);
        self.services.write().push(Arc::clone(&service));
        service
    }

    /// Remove the services registered under `root`, returning how many were dropped
    pub fn remove(&self, root: &str) -> usize {
        let mut services = self.services.write();
        let before = services.len();
        services.retain(|s| s.root_path() != root);
        before - services.len()
    }

    /// The services registered right now
    pub fn snapshot(&self) -> Vec<Arc<WebService>> {
        self.services.read().clone()
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}
