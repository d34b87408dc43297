//! Parameter objects and the shared parameter index.

use crate::definition_builder::{DefinitionBuilder, ANONYMOUS_MODEL};
use crate::error::{BuildError, Result};
use crate::route::{ParameterDescriptor, ParameterKind};
use crate::swagger::{Items, Parameter};
use crate::types::{json_schema_type, TypeDescriptor};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Reference string for a shared parameter
pub fn parameter_ref(name: &str) -> String {
    format!("#/parameters/{}", name)
}

/// Builds parameter objects and collects the ones shared by reference name.
#[derive(Debug, Default)]
pub struct ParameterBuilder {
    shared: BTreeMap<String, Arc<ParameterDescriptor>>,
}

impl ParameterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one parameter of an operation.
    ///
    /// A descriptor with a reference name is recorded in the shared index the
    /// first time it is seen and rendered as a reference. Every later use of
    /// the name must be the same `Arc`, otherwise the build fails with
    /// [`BuildError::ParameterConflict`].
    pub fn build(
        &mut self,
        param: &Arc<ParameterDescriptor>,
        pattern: Option<&str>,
        defs: &mut DefinitionBuilder<'_>,
    ) -> Result<Parameter> {
        let Some(ref_name) = param.ref_name.as_deref().filter(|n| !n.is_empty()) else {
            return create_parameter(param, pattern, defs);
        };

        match self.shared.get(ref_name) {
            Some(existing) if !Arc::ptr_eq(existing, param) => {
                return Err(BuildError::ParameterConflict {
                    name: ref_name.to_string(),
                });
            }
            Some(_) => {}
            None => {
                debug!("Sharing parameter {} as {}", param.name, ref_name);
                self.shared.insert(ref_name.to_string(), Arc::clone(param));
            }
        }
        Ok(Parameter {
            reference: Some(parameter_ref(ref_name)),
            ..Default::default()
        })
    }

    /// The shared index, keyed by reference name
    pub fn shared_parameters(
        &self,
        defs: &mut DefinitionBuilder<'_>,
    ) -> Result<BTreeMap<String, Parameter>> {
        let mut parameters = BTreeMap::new();
        for (ref_name, param) in &self.shared {
            parameters.insert(ref_name.clone(), create_parameter(param, None, defs)?);
        }
        Ok(parameters)
    }
}

fn create_parameter(
    param: &ParameterDescriptor,
    pattern: Option<&str>,
    defs: &mut DefinitionBuilder<'_>,
) -> Result<Parameter> {
    let mut p = Parameter {
        name: param.name.clone(),
        location: param.kind.location().to_string(),
        required: param.required,
        ..Default::default()
    };
    if !param.description.is_empty() {
        p.description = Some(param.description.clone());
    }

    if param.kind == ParameterKind::Body {
        let schema = match &param.schema {
            Some(schema) => schema.clone(),
            None => defs.schema_from_model(&param.sample, ANONYMOUS_MODEL, &param.name)?,
        };
        p.schema = Some(schema);
        return Ok(p);
    }

    let sample = param.sample.deref();
    let (element, multiple) = match sample {
        TypeDescriptor::Slice(elem) if !sample.is_bytes() => (elem.as_ref(), true),
        _ => (sample, param.allow_multiple),
    };
    let (param_type, inferred_format) =
        simple_type(&param.name, element, param.data_type.as_deref(), defs)?;
    let format = param
        .data_format
        .clone()
        .or_else(|| Some(inferred_format).filter(|f| !f.is_empty()));

    if multiple {
        p.param_type = Some("array".to_string());
        p.items = Some(Items {
            item_type: Some(param_type),
            format,
        });
        p.collection_format = param.collection_format.map(|cf| cf.as_str().to_string());
    } else {
        p.param_type = Some(param_type);
        p.format = format;
    }

    p.default = param.default.clone();
    p.minimum = param.minimum.clone();
    p.maximum = param.maximum.clone();
    p.min_length = param.min_length;
    p.max_length = param.max_length;
    p.enum_values = param.enum_values.clone();
    p.pattern = match (&param.pattern, pattern) {
        (Some(own), _) if !own.is_empty() => Some(own.clone()),
        (_, Some(extracted)) if param.kind == ParameterKind::Path && !extracted.is_empty() => {
            Some(extracted.to_string())
        }
        _ => None,
    };
    Ok(p)
}

/// Type keyword and format of a parameter or header that is not a body.
///
/// An explicit data type wins over the sample. Samples must be primitive or
/// self-serializing.
pub(crate) fn simple_type(
    name: &str,
    sample: &TypeDescriptor,
    data_type: Option<&str>,
    defs: &DefinitionBuilder<'_>,
) -> Result<(String, String)> {
    if let Some(data_type) = data_type.filter(|t| !t.is_empty()) {
        return Ok((json_schema_type(data_type), defs.schema_format(data_type)));
    }
    match sample.deref() {
        TypeDescriptor::Primitive { kind, .. } => Ok((
            kind.json_type().to_string(),
            defs.schema_format(kind.keyword()),
        )),
        TypeDescriptor::Text(_) => Ok(("string".to_string(), defs.schema_format(&defs.key_from(sample)))),
        other if other.is_bytes() => Ok(("string".to_string(), "byte".to_string())),
        other => Err(BuildError::UnsupportedParameterType {
            name: name.to_string(),
            type_name: other.type_name(),
        }),
    }
}
