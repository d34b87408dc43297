use crate::swagger::Schema;
use crate::types::{FieldDef, TypeOverride};

/// Copy a field's documentation and validation metadata onto its property schema.
///
/// An explicit type override replaces the type keyword; the `[]item` shorthand
/// turns the property into an array of `item` instead.
pub fn apply_field_metadata(prop: &mut Schema, field: &FieldDef) {
    let meta = &field.meta;

    if let Some(description) = &meta.description {
        prop.description = Some(description.clone());
    }
    if let Some(default) = &meta.default {
        prop.default = Some(default.clone());
    }
    if let Some(values) = &meta.enum_values {
        prop.enum_values = Some(values.clone());
    }
    if let Some(minimum) = &meta.minimum {
        prop.minimum = Some(minimum.clone());
    }
    if let Some(maximum) = &meta.maximum {
        prop.maximum = Some(maximum.clone());
    }
    if let Some(min_length) = meta.min_length {
        prop.min_length = Some(min_length);
    }
    if let Some(max_length) = meta.max_length {
        prop.max_length = Some(max_length);
    }
    if let Some(pattern) = &meta.pattern {
        prop.pattern = Some(pattern.clone());
    }
    if let Some(unique) = meta.unique {
        prop.unique_items = unique;
    }

    match &meta.type_override {
        Some(TypeOverride::ArrayOf(item)) => {
            prop.schema_type = Some("array".to_string());
            prop.items = Some(Box::new(Schema {
                schema_type: Some(item.clone()),
                ..Default::default()
            }));
        }
        Some(TypeOverride::Scalar(schema_type)) => {
            prop.schema_type = Some(schema_type.clone());
        }
        None => {}
    }

    if let Some(read_only) = meta.read_only {
        prop.read_only = read_only;
    }
}
