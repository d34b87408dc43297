//! Response objects and the shared response index.

use crate::definition_builder::{DefinitionBuilder, ANONYMOUS_MODEL};
use crate::error::{BuildError, Result};
use crate::parameter_builder::simple_type;
use crate::route::ResponseDescriptor;
use crate::swagger::{Header, Response};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Reference string for a shared response
pub fn response_ref(name: &str) -> String {
    format!("#/responses/{}", name)
}

/// Builds response objects and collects the ones shared by reference name.
///
/// Identity rules are the same as for parameters: one reference name, one
/// descriptor `Arc`.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    shared: BTreeMap<String, Arc<ResponseDescriptor>>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(
        &mut self,
        response: &Arc<ResponseDescriptor>,
        defs: &mut DefinitionBuilder<'_>,
    ) -> Result<Response> {
        let Some(ref_name) = response.ref_name.as_deref().filter(|n| !n.is_empty()) else {
            return create_response(response, defs);
        };

        match self.shared.get(ref_name) {
            Some(existing) if !Arc::ptr_eq(existing, response) => {
                return Err(BuildError::ResponseConflict {
                    name: ref_name.to_string(),
                });
            }
            Some(_) => {}
            None => {
                debug!("Sharing response {} as {}", response.code, ref_name);
                self.shared.insert(ref_name.to_string(), Arc::clone(response));
            }
        }
        Ok(Response {
            reference: Some(response_ref(ref_name)),
            ..Default::default()
        })
    }

    /// The shared index, keyed by reference name
    pub fn shared_responses(
        &self,
        defs: &mut DefinitionBuilder<'_>,
    ) -> Result<BTreeMap<String, Response>> {
        let mut responses = BTreeMap::new();
        for (ref_name, response) in &self.shared {
            responses.insert(ref_name.clone(), create_response(response, defs)?);
        }
        Ok(responses)
    }
}

fn create_response(
    descriptor: &ResponseDescriptor,
    defs: &mut DefinitionBuilder<'_>,
) -> Result<Response> {
    let mut response = Response {
        description: descriptor.message.clone(),
        ..Default::default()
    };
    if let Some(sample) = &descriptor.sample {
        response.schema = Some(defs.schema_from_model(sample, ANONYMOUS_MODEL, "response")?);
    }

    for header in &descriptor.headers {
        let (header_type, format) = simple_type(&header.name, &header.sample, None, defs)?;
        response.headers.insert(
            header.name.clone(),
            Header {
                description: Some(header.description.clone()).filter(|d| !d.is_empty()),
                header_type: Some(header_type),
                format: Some(format).filter(|f| !f.is_empty()),
                items: None,
                example: header.example.clone(),
            },
        );
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec_builder::Config;
    use crate::swagger::Schema;
    use crate::types::{FieldDef, PrimitiveKind, StructDef, TypeDescriptor, TypeRegistry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn user_types() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types.register(
            "user.User",
            StructDef::new().field(FieldDef::new("Name", TypeDescriptor::string())),
        );
        types
    }

    #[test]
    fn test_array_of_models() {
        let config = Config::new(user_types());
        let mut defs = DefinitionBuilder::new(&config);
        let users = Arc::new(ResponseDescriptor::new(
            200,
            "OK",
            Some(TypeDescriptor::slice(TypeDescriptor::named("user.User"))),
        ));

        let response = ResponseBuilder::new().build(&users, &mut defs).unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "description": "OK",
                "schema": {"type": "array", "items": {"$ref": "#/definitions/user.User"}}
            })
        );
        assert!(defs.definitions().contains_key("user.User"));
    }

    #[test]
    fn test_primitive_response_has_no_reference() {
        let config = Config::new(TypeRegistry::new());
        let mut defs = DefinitionBuilder::new(&config);
        let text = Arc::new(ResponseDescriptor::new(200, "OK", Some(TypeDescriptor::string())));

        let response = ResponseBuilder::new().build(&text, &mut defs).unwrap();
        assert_eq!(response.schema, Some(Schema::typed("string", "")));
        assert!(defs.definitions().is_empty());
    }

    #[test]
    fn test_pointer_sample_references_element() {
        let config = Config::new(user_types());
        let mut defs = DefinitionBuilder::new(&config);
        let user = Arc::new(ResponseDescriptor::new(
            201,
            "created",
            Some(TypeDescriptor::pointer(TypeDescriptor::named("user.User"))),
        ));
        let response = ResponseBuilder::new().build(&user, &mut defs).unwrap();
        assert_eq!(response.schema, Some(Schema::reference("user.User")));
    }

    #[test]
    fn test_headers_are_typed_independently() {
        let config = Config::new(TypeRegistry::new());
        let mut defs = DefinitionBuilder::new(&config);
        let limited = Arc::new(
            ResponseDescriptor::new(429, "slow down", None)
                .header(
                    "Retry-After",
                    "seconds to wait",
                    TypeDescriptor::primitive(PrimitiveKind::Int),
                    Some(json!(30)),
                )
                .header("X-Trace", "", TypeDescriptor::string(), None),
        );

        let response = ResponseBuilder::new().build(&limited, &mut defs).unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "description": "slow down",
                "headers": {
                    "Retry-After": {
                        "description": "seconds to wait",
                        "type": "integer",
                        "format": "int32",
                        "example": 30
                    },
                    "X-Trace": {"type": "string"}
                }
            })
        );
    }

    #[test]
    fn test_shared_response_conflict() {
        let config = Config::new(TypeRegistry::new());
        let mut defs = DefinitionBuilder::new(&config);
        let mut builder = ResponseBuilder::new();
        let not_found = Arc::new(ResponseDescriptor::new(404, "missing", None).with_ref_name("NotFound"));
        let other = Arc::new(ResponseDescriptor::new(404, "missing", None).with_ref_name("NotFound"));

        let reference = builder.build(&not_found, &mut defs).unwrap();
        assert_eq!(reference.reference.as_deref(), Some("#/responses/NotFound"));
        builder.build(&not_found, &mut defs).unwrap();
        assert_eq!(
            builder.build(&other, &mut defs).unwrap_err(),
            BuildError::ResponseConflict {
                name: "NotFound".to_string()
            }
        );

        let shared = builder.shared_responses(&mut defs).unwrap();
        assert_eq!(shared["NotFound"].description, "missing");
    }

    #[test]
    fn test_struct_header_is_unsupported() {
        let config = Config::new(user_types());
        let mut defs = DefinitionBuilder::new(&config);
        let bad = Arc::new(ResponseDescriptor::new(200, "OK", None).header(
            "X-User",
            "",
            TypeDescriptor::named("user.User"),
            None,
        ));
        assert!(matches!(
            ResponseBuilder::new().build(&bad, &mut defs),
            Err(BuildError::UnsupportedParameterType { .. })
        ));
    }
}
