//! Declarative services.
//!
//! A manifest lists services and their routes in YAML or JSON. Parameters and
//! responses declared at the top level are shared: every route that refers to
//! one by name receives the same descriptor, so it is emitted once under
//! `parameters` or `responses` and referenced from each operation.
//!
//! ```yaml
//! parameters:
//!   userID: { name: user-id, in: path, type: u64 }
//! responses:
//!   NotFound: { code: 404, message: no such user }
//! services:
//!   - root: /users
//!     produces: [application/json]
//!     routes:
//!       - method: GET
//!         path: /{user-id}
//!         params: [{ ref: userID }]
//!         responses:
//!           - { code: 200, message: OK, type: User }
//!           - { ref: NotFound }
//! ```

use crate::route::{
    CollectionFormat, HttpMethod, ParameterDescriptor, ParameterKind, ResponseDescriptor,
    RouteBuilder, WebService,
};
use crate::type_resolver::TypeResolver;
use crate::types::TypeDescriptor;
use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
    #[serde(default)]
    pub responses: BTreeMap<String, ResponseSpec>,
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "in")]
    pub kind: ParameterKind,
    #[serde(default)]
    pub description: String,
    /// Defaults to true for path parameters
    pub required: Option<bool>,
    /// Type expression of the sample, e.g. `u32` or `Vec<String>`
    #[serde(rename = "type")]
    pub sample: Option<String>,
    pub data_type: Option<String>,
    pub format: Option<String>,
    pub default: Option<Value>,
    #[serde(default)]
    pub multiple: bool,
    pub collection_format: Option<CollectionFormat>,
    pub minimum: Option<Value>,
    pub maximum: Option<Value>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
}

/// A parameter written inline or named from the shared table
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParameterEntry {
    Shared {
        #[serde(rename = "ref")]
        name: String,
    },
    Inline(ParameterSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseSpec {
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type")]
    pub sample: Option<String>,
    /// Documents every status code that is not listed
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub headers: Vec<HeaderSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "string_type")]
    pub sample: String,
    pub example: Option<Value>,
}

fn string_type() -> String {
    "String".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponseEntry {
    Shared {
        #[serde(rename = "ref")]
        name: String,
    },
    Inline(ResponseSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSpec {
    /// Root path; `%s` placeholders are filled from `params` in order
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    /// Path parameters of the root, shared by every route
    #[serde(default)]
    pub params: Vec<ParameterEntry>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    pub method: String,
    #[serde(default)]
    pub path: String,
    pub operation: Option<String>,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub security: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default)]
    pub params: Vec<ParameterEntry>,
    pub read: Option<BodySpec>,
    /// Type expression of the value the route writes
    pub write: Option<String>,
    #[serde(default)]
    pub responses: Vec<ResponseEntry>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BodySpec {
    #[serde(rename = "type")]
    pub sample: String,
    #[serde(default)]
    pub description: String,
}

impl Manifest {
    /// Read a manifest, choosing JSON for `.json` files and YAML otherwise
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Reading manifest: {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        let manifest = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        };
        manifest.with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML manifest")
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse JSON manifest")
    }

    /// Turn the manifest into services, resolving type expressions with `types`.
    ///
    /// # Errors
    ///
    /// Fails on a reference to an undeclared shared entry, an unknown method,
    /// an invalid type expression or a malformed path.
    pub fn into_services(self, types: &TypeResolver) -> Result<Vec<WebService>> {
        let mut parameters = BTreeMap::new();
        for (ref_name, spec) in &self.parameters {
            let param = parameter(spec, types)
                .with_context(|| format!("Invalid shared parameter '{}'", ref_name))?
                .ref_name(ref_name);
            parameters.insert(ref_name.clone(), Arc::new(param));
        }
        let mut responses = BTreeMap::new();
        for (ref_name, spec) in &self.responses {
            let response = response(spec, types)
                .with_context(|| format!("Invalid shared response '{}'", ref_name))?
                .with_ref_name(ref_name);
            responses.insert(ref_name.clone(), Arc::new(response));
        }
        let shared = Shared {
            parameters,
            responses,
            types,
        };

        let services = self
            .services
            .iter()
            .map(|spec| {
                shared
                    .service(spec)
                    .with_context(|| format!("Invalid service '{}'", spec.root))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Manifest declares {} services", services.len());
        Ok(services)
    }
}

/// Shared descriptors of one manifest
struct Shared<'a> {
    parameters: BTreeMap<String, Arc<ParameterDescriptor>>,
    responses: BTreeMap<String, Arc<ResponseDescriptor>>,
    types: &'a TypeResolver,
}

impl Shared<'_> {
    fn parameter(&self, entry: &ParameterEntry) -> Result<Arc<ParameterDescriptor>> {
        match entry {
            ParameterEntry::Shared { name } => self
                .parameters
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown shared parameter '{}'", name)),
            ParameterEntry::Inline(spec) => Ok(Arc::new(parameter(spec, self.types)?)),
        }
    }

    fn response(&self, entry: &ResponseEntry) -> Result<Arc<ResponseDescriptor>> {
        match entry {
            ResponseEntry::Shared { name } => self
                .responses
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown shared response '{}'", name)),
            ResponseEntry::Inline(spec) => Ok(Arc::new(response(spec, self.types)?)),
        }
    }

    fn service(&self, spec: &ServiceSpec) -> Result<WebService> {
        let params = spec
            .params
            .iter()
            .map(|entry| self.parameter(entry))
            .collect::<Result<Vec<_>>>()?;

        let mut service = if spec.root.contains("%s") {
            WebService::param_path(&spec.root, params)?
        } else {
            params
                .into_iter()
                .fold(WebService::new(&spec.root)?, |service, param| service.param(param))
        };
        service = service
            .doc(&spec.doc)
            .api_version(&spec.version)
            .consumes(&as_strs(&spec.consumes))
            .produces(&as_strs(&spec.produces));

        for route in &spec.routes {
            let builder = self
                .route(route)
                .with_context(|| format!("Invalid route {} {}", route.method, route.path))?;
            service = service.route(builder)?;
        }
        Ok(service)
    }

    fn route(&self, spec: &RouteSpec) -> Result<RouteBuilder> {
        let method: HttpMethod = spec.method.parse().map_err(|e: String| anyhow!(e))?;
        let mut builder = RouteBuilder::new(method, &spec.path)
            .doc(&spec.doc)
            .notes(&spec.notes)
            .consumes(&as_strs(&spec.consumes))
            .produces(&as_strs(&spec.produces));

        if let Some(operation) = &spec.operation {
            builder = builder.operation(operation);
        }
        for (key, value) in &spec.metadata {
            builder = builder.metadata(key, value.clone());
        }
        if !spec.tags.is_empty() {
            builder = builder.tags(&as_strs(&spec.tags));
        }
        if spec.deprecated {
            builder = builder.deprecate();
        }
        for (name, scopes) in &spec.security {
            builder = builder.security(name, &as_strs(scopes));
        }
        for entry in &spec.params {
            builder = builder.param(self.parameter(entry)?);
        }
        if let Some(body) = &spec.read {
            builder = builder.read(self.types.parse_type_expr(&body.sample)?, &body.description);
        }
        if let Some(sample) = &spec.write {
            builder = builder.write(self.types.parse_type_expr(sample)?);
        }
        let responses = spec
            .responses
            .iter()
            .map(|entry| self.response(entry))
            .collect::<Result<Vec<_>>>()?;
        Ok(builder.return_responses(&responses))
    }
}

fn parameter(spec: &ParameterSpec, types: &TypeResolver) -> Result<ParameterDescriptor> {
    let mut param = match spec.kind {
        ParameterKind::Path => ParameterDescriptor::path(&spec.name, &spec.description),
        ParameterKind::Query => ParameterDescriptor::query(&spec.name, &spec.description),
        ParameterKind::Body => ParameterDescriptor::body(&spec.name, &spec.description),
        ParameterKind::Header => ParameterDescriptor::header(&spec.name, &spec.description),
        ParameterKind::Form => ParameterDescriptor::form(&spec.name, &spec.description),
    };

    if let Some(required) = spec.required {
        param = param.required(required);
    }
    if let Some(sample) = &spec.sample {
        param = param.sample(types.parse_type_expr(sample)?);
    }
    if let Some(data_type) = &spec.data_type {
        param = param.data_type(data_type);
    }
    if let Some(format) = &spec.format {
        param = param.data_format(format);
    }
    if let Some(default) = &spec.default {
        param = param.default_value(default.clone());
    }
    if spec.multiple {
        param = param.allow_multiple(true);
    }
    if let Some(format) = spec.collection_format {
        param = param.collection_format(format);
    }
    if let Some(minimum) = &spec.minimum {
        param = param.minimum(minimum.clone());
    }
    if let Some(maximum) = &spec.maximum {
        param = param.maximum(maximum.clone());
    }
    if let Some(min_length) = spec.min_length {
        param = param.min_length(min_length);
    }
    if let Some(max_length) = spec.max_length {
        param = param.max_length(max_length);
    }
    if let Some(pattern) = &spec.pattern {
        param = param.pattern(pattern);
    }
    if let Some(values) = &spec.enum_values {
        param = param.allowable_values(values.clone());
    }
    Ok(param)
}

fn response(spec: &ResponseSpec, types: &TypeResolver) -> Result<ResponseDescriptor> {
    let sample = spec
        .sample
        .as_deref()
        .map(|expr| types.parse_type_expr(expr))
        .transpose()?;

    let mut response = match (spec.default, spec.code) {
        (true, _) => ResponseDescriptor::default_response(&spec.message, sample),
        (false, Some(code)) => ResponseDescriptor::new(code, &spec.message, sample),
        (false, None) => bail!("Response '{}' needs a code or `default: true`", spec.message),
    };
    for header in &spec.headers {
        let header_type: TypeDescriptor = types.parse_type_expr(&header.sample)?;
        response = response.header(
            &header.name,
            &header.description,
            header_type,
            header.example.clone(),
        );
    }
    Ok(response)
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}
