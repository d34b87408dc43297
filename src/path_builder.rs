//! Routes to path items.
//!
//! Each route becomes one operation in the method slot of the path item at
//! its sanitized path. Routes that share a sanitized path fill sibling slots.

use crate::error::Result;
use crate::path::{sanitize_path, strip_tags};
use crate::route::{Route, WebService};
use crate::spec_builder::SwaggerBuilder;
use crate::swagger::{Operation, PathItem, Response};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Description of the response synthesized for routes that declare none
const DEFAULT_RESPONSE_DESCRIPTION: &str = "OK";

/// Build the path items of every route of a service
pub fn build_paths(
    service: &WebService,
    sb: &mut SwaggerBuilder<'_>,
) -> Result<BTreeMap<String, PathItem>> {
    let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();
    for route in service.routes() {
        let (path, patterns) = sanitize_path(&route.path);
        let operation = build_operation(service, route, &patterns, sb)?;
        debug!("Mapped {} {} to {}", route.method, route.path, path);
        paths
            .entry(path)
            .or_default()
            .set_operation(route.method, operation);
    }
    Ok(paths)
}

/// Build the operation of one route.
///
/// `patterns` holds the segment patterns extracted from the route's path,
/// which path parameters without a pattern of their own pick up.
pub fn build_operation(
    service: &WebService,
    route: &Route,
    patterns: &HashMap<String, String>,
    sb: &mut SwaggerBuilder<'_>,
) -> Result<Operation> {
    let config = sb.config;
    let defaults = &config.default_content_types;
    let mut op = Operation {
        tags: route.tags(),
        summary: non_empty(strip_tags(&route.doc)),
        description: non_empty(route.notes.clone()),
        operation_id: non_empty(route.operation.clone()),
        consumes: content_types(&route.consumes, defaults),
        produces: content_types(&route.produces, defaults),
        deprecated: route.deprecated,
        security: route
            .security
            .iter()
            .map(|(name, scopes)| BTreeMap::from([(name.clone(), scopes.clone())]))
            .collect(),
        ..Default::default()
    };

    // shared path parameters of the service come first
    for param in service.path_parameters().iter().chain(&route.parameters) {
        let pattern = patterns.get(&param.name).map(String::as_str);
        let built = sb.parameters.build(param, pattern, &mut sb.definitions)?;
        op.parameters.push(built);
    }

    if let Some(sample) = &route.write_sample {
        sb.definitions.add_model_from(sample)?;
    }

    for descriptor in &route.responses {
        let response = sb.responses.build(descriptor, &mut sb.definitions)?;
        if descriptor.is_default {
            op.responses.default = Some(response);
        } else {
            op.responses.insert(descriptor.code, response);
        }
    }
    if route.responses.is_empty() {
        op.responses.insert(
            200,
            Response {
                description: DEFAULT_RESPONSE_DESCRIPTION.to_string(),
                ..Default::default()
            },
        );
    }
    Ok(op)
}

fn content_types(declared: &[String], defaults: &[String]) -> Vec<String> {
    if declared.is_empty() {
        defaults.to_vec()
    } else {
        declared.to_vec()
    }
}

fn non_empty(text: String) -> Option<String> {
    Some(text).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{HttpMethod, ParameterDescriptor, RouteBuilder};
    use crate::spec_builder::Config;
    use crate::swagger::Schema;
    use crate::types::{FieldDef, StructDef, TypeDescriptor, TypeRegistry};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn user_types() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types.register(
            "user.User",
            StructDef::new().field(FieldDef::new("Name", TypeDescriptor::string())),
        );
        types
    }

    #[test]
    fn test_operation_fields() {
        let service = WebService::new("/users")
            .unwrap()
            .produces(&["application/json"])
            .route(
                RouteBuilder::get("/{id:[0-9]+}")
                    .operation("findUser")
                    .doc("get a <b>user</b>")
                    .notes("Looks a user up by id")
                    .param(Arc::new(ParameterDescriptor::path("id", "identifier")))
                    .tags(&["users"])
                    .security("oauth", &["read"])
                    .deprecate()
                    .returns(200, "OK", Some(TypeDescriptor::named("user.User"))),
            )
            .unwrap();
        let config = Config::new(user_types());
        let mut sb = SwaggerBuilder::new(&config);

        let paths = build_paths(&service, &mut sb).unwrap();
        let op = paths["/users/{id}"].get.as_ref().unwrap();
        assert_eq!(
            serde_json::to_value(op).unwrap(),
            json!({
                "tags": ["users"],
                "summary": "get a user",
                "description": "Looks a user up by id",
                "operationId": "findUser",
                "produces": ["application/json"],
                "parameters": [{
                    "name": "id",
                    "in": "path",
                    "description": "identifier",
                    "required": true,
                    "type": "string",
                    "pattern": "[0-9]+"
                }],
                "responses": {
                    "200": {"description": "OK", "schema": {"$ref": "#/definitions/user.User"}}
                },
                "deprecated": true,
                "security": [{"oauth": ["read"]}]
            })
        );
        assert!(sb.definitions.definitions().contains_key("user.User"));
    }

    #[test]
    fn test_sibling_methods_share_a_path_item() {
        let service = WebService::new("/users")
            .unwrap()
            .route(RouteBuilder::get("/{id}").operation("find"))
            .unwrap()
            .route(RouteBuilder::put("/{id:[0-9]+}").operation("update"))
            .unwrap()
            .route(RouteBuilder::delete("/{id}").operation("remove"))
            .unwrap();
        let config = Config::new(TypeRegistry::new());
        let mut sb = SwaggerBuilder::new(&config);

        let paths = build_paths(&service, &mut sb).unwrap();
        assert_eq!(paths.len(), 1);
        let item = &paths["/users/{id}"];
        for (method, id) in [
            (HttpMethod::Get, "find"),
            (HttpMethod::Put, "update"),
            (HttpMethod::Delete, "remove"),
        ] {
            let op = item.operation(method).unwrap();
            assert_eq!(op.operation_id.as_deref(), Some(id));
            assert_eq!(op.responses.get(200).unwrap().description, "OK");
            assert_eq!(op.responses.status_codes.len(), 1);
        }
        assert!(item.post.is_none());
    }

    #[test]
    fn test_service_path_parameters_come_first() {
        let tenant = Arc::new(ParameterDescriptor::path("tenant", ""));
        let service = WebService::param_path("/t/{%s}", vec![tenant])
            .unwrap()
            .route(
                RouteBuilder::post("/items")
                    .read(TypeDescriptor::named("user.User"), "")
                    .default_returns("error", Some(TypeDescriptor::string())),
            )
            .unwrap();
        let config = Config::new(user_types());
        let mut sb = SwaggerBuilder::new(&config);

        let paths = build_paths(&service, &mut sb).unwrap();
        let op = paths["/t/{tenant}/items"].post.as_ref().unwrap();
        let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["tenant", "body"]);
        assert_eq!(
            op.responses.default.as_ref().unwrap().schema,
            Some(Schema::typed("string", ""))
        );
        assert!(op.responses.status_codes.is_empty());
    }

    #[test]
    fn test_write_sample_contributes_definitions() {
        let service = WebService::new("/")
            .unwrap()
            .route(RouteBuilder::get("/me").write(TypeDescriptor::named("user.User")))
            .unwrap();
        let config = Config::new(user_types());
        let mut sb = SwaggerBuilder::new(&config);
        build_paths(&service, &mut sb).unwrap();
        assert!(sb.definitions.definitions().contains_key("user.User"));
    }

    #[test]
    fn test_default_content_types_apply_when_nothing_declared() {
        let service = WebService::new("/")
            .unwrap()
            .route(RouteBuilder::get("/ping"))
            .unwrap();
        let config = Config::new(TypeRegistry::new()).with_default_content_types(&["application/json"]);
        let mut sb = SwaggerBuilder::new(&config);
        let paths = build_paths(&service, &mut sb).unwrap();
        let op = paths["/ping"].get.as_ref().unwrap();
        assert_eq!(op.consumes, vec!["application/json".to_string()]);
        assert_eq!(op.produces, vec!["application/json".to_string()]);
    }
}
