//! Model definitions.
//!
//! Builds the `definitions` section of a document by walking type descriptors.
//! A model is registered under its key before its fields are visited, so a
//! type that refers back to itself finds the entry and emits a reference
//! instead of recursing forever.

use crate::error::Result;
use crate::property::apply_field_metadata;
use crate::spec_builder::Config;
use crate::swagger::Schema;
use crate::types::{
    is_primitive_type, json_schema_format, json_schema_type, FieldDef, PrimitiveKind, StructDef,
    TypeDescriptor,
};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Model name used for payloads whose type is an anonymous struct
pub const ANONYMOUS_MODEL: &str = "Anonymous";

/// Accumulates model definitions during one build.
pub struct DefinitionBuilder<'a> {
    config: &'a Config,
    definitions: BTreeMap<String, Schema>,
    /// Keys of the embedded structs being flattened, outermost first
    embedding: Vec<String>,
}

impl<'a> DefinitionBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            definitions: BTreeMap::new(),
            embedding: Vec::new(),
        }
    }

    pub fn definitions(&self) -> &BTreeMap<String, Schema> {
        &self.definitions
    }

    pub fn into_definitions(self) -> BTreeMap<String, Schema> {
        self.definitions
    }

    /// Register the models reachable from a sample type
    pub fn add_model_from(&mut self, sample: &TypeDescriptor) -> Result<()> {
        self.add_model(sample, None).map(|_| ())
    }

    /// Register the model of a struct type under its key, or under `name_override`.
    ///
    /// Slices register their element. Primitives, maps, byte sequences and
    /// self-serializing types are always inlined and never produce a definition.
    /// Returns the key the model is registered under.
    pub fn add_model(
        &mut self,
        ty: &TypeDescriptor,
        name_override: Option<&str>,
    ) -> Result<Option<String>> {
        let ty = ty.deref();
        if ty.is_bytes() {
            return Ok(None);
        }
        if let TypeDescriptor::Slice(elem) = ty {
            return self.add_model(elem, name_override);
        }

        let config = self.config;
        let def: &StructDef = match ty {
            TypeDescriptor::Struct(name) => config.types.resolve(name)?,
            TypeDescriptor::Anonymous(def) => def.as_ref(),
            _ => return Ok(None),
        };

        let key = match name_override {
            Some(name) => name.to_string(),
            None => self.key_from(ty),
        };
        if key.is_empty() || is_primitive_type(&key) {
            return Ok(None);
        }
        if self.definitions.contains_key(&key) {
            return Ok(Some(key));
        }

        debug!("Building model definition: {}", key);
        self.definitions.insert(key.clone(), Schema::default());
        // a referenced model starts its own embedding chain
        let outer = std::mem::take(&mut self.embedding);
        let model = self.build_model(def, &key);
        self.embedding = outer;
        self.definitions.insert(key.clone(), model?);
        Ok(Some(key))
    }

    fn build_model(&mut self, def: &StructDef, model_name: &str) -> Result<Schema> {
        let mut model = Schema::typed("object", "");
        let mut model_descriptions = Vec::new();

        for field in &def.fields {
            let Some(json_name) = exposed_name(field) else {
                continue;
            };
            if let Some(description) = &field.meta.model_description {
                model_descriptions.push(description.clone());
            }

            let Some(mut prop) = self.build_property(field, &json_name, &mut model, model_name)?
            else {
                continue;
            };
            if let Some(doc) = def.docs.as_ref().and_then(|docs| docs.get(&json_name)) {
                prop.description = Some(doc.clone());
            }
            if is_property_required(field) && !model.required.contains(&json_name) {
                model.required.push(json_name.clone());
            }
            model.properties.insert(json_name, prop);
        }

        match def.docs.as_ref().and_then(|docs| docs.get("")) {
            Some(doc) => model.description = Some(doc.clone()),
            None if !model_descriptions.is_empty() => {
                model.description = Some(model_descriptions.join("\n"));
            }
            None => {}
        }
        Ok(model)
    }

    /// Schema of one field, or `None` when the field was flattened into `model`
    fn build_property(
        &mut self,
        field: &FieldDef,
        json_name: &str,
        model: &mut Schema,
        model_name: &str,
    ) -> Result<Option<Schema>> {
        let mut prop = Schema::default();
        apply_field_metadata(&mut prop, field);
        if prop.schema_type.is_some() {
            return Ok(Some(prop));
        }

        let ty = &field.ty;
        if let TypeDescriptor::Text(_) = ty.deref() {
            let format = self.schema_format(&self.key_from(ty));
            prop.add_type("string", &format);
            return Ok(Some(prop));
        }
        if field.meta.as_string {
            prop.add_type("string", "");
            return Ok(Some(prop));
        }

        let mut prop = match ty {
            TypeDescriptor::Struct(_) if field.embedded && field.meta.rename.is_none() => {
                self.flatten_embedded(ty, model)?;
                return Ok(None);
            }
            TypeDescriptor::Anonymous(_) => {
                self.create_ref(ty, &format!("{}.{}", model_name, json_name))?
            }
            TypeDescriptor::Struct(_) => {
                let key = self.key_from(ty);
                self.create_ref(ty, &key)?
            }
            TypeDescriptor::Primitive {
                kind: PrimitiveKind::String,
                ..
            } => Schema::typed("string", ""),
            _ => self.schema_from_model(ty, model_name, json_name)?,
        };
        apply_field_metadata(&mut prop, field);
        Ok(Some(prop))
    }

    /// Merge the properties of an embedded struct into `model`
    fn flatten_embedded(&mut self, ty: &TypeDescriptor, model: &mut Schema) -> Result<()> {
        let key = self.key_from(ty);
        if self.embedding.contains(&key) {
            warn!("Struct {} embeds itself, stopping the flattening there", key);
            return Ok(());
        }
        let config = self.config;
        let def = match ty {
            TypeDescriptor::Struct(name) => config.types.resolve(name)?,
            _ => return Ok(()),
        };

        self.embedding.push(key.clone());
        let embedded = self.build_model(def, &key);
        self.embedding.pop();
        let embedded = embedded?;

        debug!(
            "Flattening {} properties of embedded struct {}",
            embedded.properties.len(),
            key
        );
        for name in embedded.required {
            if !model.required.contains(&name) {
                model.required.push(name);
            }
        }
        model.properties.extend(embedded.properties);
        Ok(())
    }

    /// Inline schema for any type; structs become references to their definition.
    ///
    /// Anonymous structs are registered as `<model_name>.<json_name>`.
    pub fn schema_from_model(
        &mut self,
        ty: &TypeDescriptor,
        model_name: &str,
        json_name: &str,
    ) -> Result<Schema> {
        if ty.is_bytes() {
            return Ok(Schema::typed("string", ""));
        }
        match ty {
            TypeDescriptor::Pointer(inner) => self.schema_from_model(inner, model_name, json_name),
            TypeDescriptor::Slice(elem) => Ok(Schema::array(
                self.schema_from_model(elem, model_name, json_name)?,
            )),
            TypeDescriptor::Primitive { kind, .. } => Ok(self.primitive_schema(*kind)),
            TypeDescriptor::Text(_) => {
                let format = self.schema_format(&self.key_from(ty));
                Ok(Schema::typed("string", &format))
            }
            TypeDescriptor::Map(value) => {
                let mut schema = Schema::typed("object", "");
                if value.deref() != &TypeDescriptor::Interface {
                    let values = self.schema_from_model(value, model_name, json_name)?;
                    schema.additional_properties = Some(Box::new(values));
                }
                Ok(schema)
            }
            TypeDescriptor::Interface | TypeDescriptor::Marker => Ok(Schema::default()),
            TypeDescriptor::Struct(_) | TypeDescriptor::Anonymous(_) => {
                let mut name = self.key_from(ty);
                if name.is_empty() {
                    name = format!("{}.{}", model_name, json_name);
                }
                self.create_ref(ty, &name)
            }
        }
    }

    /// Type and format of a primitive kind, the format hook taking precedence
    pub fn primitive_schema(&self, kind: PrimitiveKind) -> Schema {
        let format = self.schema_format(kind.keyword());
        Schema::typed(kind.json_type(), &format)
    }

    /// Register a struct and refer to it; names that cannot carry a definition
    /// are inlined instead
    fn create_ref(&mut self, ty: &TypeDescriptor, name: &str) -> Result<Schema> {
        match self.add_model(ty, Some(name))? {
            Some(key) => Ok(Schema::reference(&key)),
            None => Ok(Schema::typed(json_schema_type(name), json_schema_format(name))),
        }
    }

    /// Definition key of a type: the naming hook's answer, else its own name
    pub fn key_from(&self, ty: &TypeDescriptor) -> String {
        if let Some(handler) = &self.config.model_type_name_handler {
            if let Some(name) = handler(ty) {
                return name;
            }
        }
        match ty {
            TypeDescriptor::Pointer(inner) | TypeDescriptor::Slice(inner) => self.key_from(inner),
            TypeDescriptor::Struct(name) | TypeDescriptor::Text(name) => name.clone(),
            TypeDescriptor::Primitive { kind, name } => {
                name.clone().unwrap_or_else(|| kind.keyword().to_string())
            }
            TypeDescriptor::Anonymous(_) | TypeDescriptor::Marker => String::new(),
            TypeDescriptor::Map(_) | TypeDescriptor::Interface => ty.type_name(),
        }
    }

    /// Format for a type key: the format hook first, then the built-in table
    pub fn schema_format(&self, key: &str) -> String {
        if let Some(handler) = &self.config.schema_format_handler {
            if let Some(format) = handler(key) {
                return format;
            }
        }
        json_schema_format(key).to_string()
    }
}

/// Name a field is exposed under, `None` when it is not exposed at all
fn exposed_name(field: &FieldDef) -> Option<String> {
    if field.meta.skip || field.ty == TypeDescriptor::Marker {
        return None;
    }
    match &field.meta.rename {
        Some(name) if !name.is_empty() => Some(name.clone()),
        _ => Some(field.name.clone()),
    }
}

fn is_property_required(field: &FieldDef) -> bool {
    !field.meta.optional && !field.meta.omit_empty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldMeta, TypeRegistry};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn build(types: TypeRegistry, root: &str) -> BTreeMap<String, Schema> {
        let config = Config::new(types);
        let mut builder = DefinitionBuilder::new(&config);
        builder.add_model_from(&TypeDescriptor::named(root)).unwrap();
        builder.into_definitions()
    }

    fn as_json(definitions: &BTreeMap<String, Schema>) -> serde_json::Value {
        serde_json::to_value(definitions).unwrap()
    }

    #[test]
    fn test_optional_and_required_fields() {
        let mut types = TypeRegistry::new();
        types.register(
            "user.User",
            StructDef::new()
                .field(
                    FieldDef::new("ID", TypeDescriptor::primitive(PrimitiveKind::Int))
                        .describe("identifier")
                        .optional(),
                )
                .field(FieldDef::new("Name", TypeDescriptor::string()).describe("name")),
        );

        assert_eq!(
            as_json(&build(types, "user.User")),
            json!({
                "user.User": {
                    "type": "object",
                    "required": ["Name"],
                    "properties": {
                        "ID": {"type": "integer", "format": "int32", "description": "identifier"},
                        "Name": {"type": "string", "description": "name"}
                    }
                }
            })
        );
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut types = TypeRegistry::new();
        types.register(
            "Node",
            StructDef::new()
                .field(FieldDef::new("value", TypeDescriptor::string()))
                .field(
                    FieldDef::new("next", TypeDescriptor::pointer(TypeDescriptor::named("Node")))
                        .optional(),
                )
                .field(FieldDef::new(
                    "children",
                    TypeDescriptor::slice(TypeDescriptor::named("Node")),
                )),
        );

        let definitions = build(types, "Node");
        assert_eq!(definitions.len(), 1);
        let node = &definitions["Node"];
        assert_eq!(node.properties["next"], Schema::reference("Node"));
        assert_eq!(
            node.properties["children"],
            Schema::array(Schema::reference("Node"))
        );
    }

    #[test]
    fn test_embedded_struct_is_flattened() {
        let mut types = TypeRegistry::new();
        types
            .register(
                "Audit",
                StructDef::new()
                    .field(FieldDef::new("created", TypeDescriptor::text("DateTime")))
                    .field(FieldDef::new("owner", TypeDescriptor::named("Owner"))),
            )
            .register(
                "Owner",
                StructDef::new().field(FieldDef::new("name", TypeDescriptor::string())),
            )
            .register(
                "Doc",
                StructDef::new()
                    .field(FieldDef::embed("Audit"))
                    .field(FieldDef::new("title", TypeDescriptor::string())),
            );

        let definitions = build(types, "Doc");
        assert!(!definitions.contains_key("Audit"));
        assert!(definitions.contains_key("Owner"));
        let doc = &definitions["Doc"];
        assert_eq!(
            doc.properties["created"],
            Schema::typed("string", "date-time")
        );
        assert_eq!(doc.properties["owner"], Schema::reference("Owner"));
        assert_eq!(doc.required, vec!["created", "owner", "title"]);
    }

    #[test]
    fn test_renamed_embedded_struct_is_a_reference() {
        let mut types = TypeRegistry::new();
        types
            .register(
                "Audit",
                StructDef::new().field(FieldDef::new("by", TypeDescriptor::string())),
            )
            .register(
                "Doc",
                StructDef::new().field(FieldDef::embed("Audit").rename("audit")),
            );

        let definitions = build(types, "Doc");
        assert_eq!(
            definitions["Doc"].properties["audit"],
            Schema::reference("Audit")
        );
        assert!(definitions.contains_key("Audit"));
    }

    #[test]
    fn test_self_embedding_stops() {
        let mut types = TypeRegistry::new();
        types.register(
            "Loop",
            StructDef::new()
                .field(FieldDef::embed("Loop"))
                .field(FieldDef::new("x", TypeDescriptor::string())),
        );
        let definitions = build(types, "Loop");
        assert_eq!(definitions["Loop"].properties.len(), 1);
        assert!(definitions["Loop"].properties.contains_key("x"));
    }

    fn shared_base_types() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types
            .register(
                "Base",
                StructDef::new().field(
                    FieldDef::new("child", TypeDescriptor::pointer(TypeDescriptor::named("Child")))
                        .optional(),
                ),
            )
            .register(
                "Child",
                StructDef::new()
                    .field(FieldDef::embed("Base"))
                    .field(FieldDef::new("name", TypeDescriptor::string())),
            )
            .register("Parent", StructDef::new().field(FieldDef::embed("Base")));
        types
    }

    #[test]
    fn test_referenced_model_flattens_independently_of_build_order() {
        let direct = build(shared_base_types(), "Child");
        let through_parent = build(shared_base_types(), "Parent");

        assert_eq!(through_parent["Child"], direct["Child"]);
        assert_eq!(
            as_json(&through_parent),
            json!({
                "Child": {
                    "type": "object",
                    "properties": {
                        "child": {"$ref": "#/definitions/Child"},
                        "name": {"type": "string"}
                    },
                    "required": ["name"]
                },
                "Parent": {
                    "type": "object",
                    "properties": {
                        "child": {"$ref": "#/definitions/Child"}
                    }
                }
            })
        );
    }

    #[test]
    fn test_bytes_and_maps() {
        let mut types = TypeRegistry::new();
        types.register(
            "Blob",
            StructDef::new()
                .field(FieldDef::new("data", TypeDescriptor::bytes()))
                .field(FieldDef::new(
                    "labels",
                    TypeDescriptor::map(TypeDescriptor::string()),
                ))
                .field(FieldDef::new("extra", TypeDescriptor::map(TypeDescriptor::Interface)))
                .field(FieldDef::new("any", TypeDescriptor::Interface)),
        );

        assert_eq!(
            as_json(&build(types, "Blob"))["Blob"]["properties"],
            json!({
                "data": {"type": "string"},
                "labels": {"type": "object", "additionalProperties": {"type": "string"}},
                "extra": {"type": "object"},
                "any": {}
            })
        );
    }

    #[test]
    fn test_bytes_never_get_a_definition() {
        let config = Config::new(TypeRegistry::new());
        let mut builder = DefinitionBuilder::new(&config);
        assert_eq!(builder.add_model(&TypeDescriptor::bytes(), None).unwrap(), None);
        assert!(builder.definitions().is_empty());
    }

    #[test]
    fn test_anonymous_field_gets_qualified_name() {
        let mut types = TypeRegistry::new();
        types.register(
            "Order",
            StructDef::new().field(FieldDef::new(
                "shipping",
                TypeDescriptor::anonymous(
                    StructDef::new().field(FieldDef::new("city", TypeDescriptor::string())),
                ),
            )),
        );

        let definitions = build(types, "Order");
        assert_eq!(
            definitions["Order"].properties["shipping"],
            Schema::reference("Order.shipping")
        );
        assert!(definitions["Order.shipping"].properties.contains_key("city"));
    }

    #[test]
    fn test_skip_rename_marker_and_string_option() {
        let mut types = TypeRegistry::new();
        types.register(
            "Item",
            StructDef::new()
                .field(FieldDef::new("XMLName", TypeDescriptor::Marker))
                .field(FieldDef::new("secret", TypeDescriptor::string()).skip())
                .field(FieldDef::new("Count", TypeDescriptor::primitive(PrimitiveKind::Int64)).rename("count"))
                .field(
                    FieldDef::new("Big", TypeDescriptor::primitive(PrimitiveKind::Uint64)).with_meta(
                        FieldMeta {
                            as_string: true,
                            omit_empty: true,
                            ..Default::default()
                        },
                    ),
                ),
        );

        assert_eq!(
            as_json(&build(types, "Item")),
            json!({
                "Item": {
                    "type": "object",
                    "required": ["count"],
                    "properties": {
                        "count": {"type": "integer", "format": "int64"},
                        "Big": {"type": "string"}
                    }
                }
            })
        );
    }

    #[test]
    fn test_docs_lookup_overrides_descriptions() {
        let mut types = TypeRegistry::new();
        types.register(
            "Pet",
            StructDef::new()
                .field(FieldDef::new("name", TypeDescriptor::string()).describe("from meta"))
                .doc("", "A pet")
                .doc("name", "from docs"),
        );
        let definitions = build(types, "Pet");
        assert_eq!(definitions["Pet"].description.as_deref(), Some("A pet"));
        assert_eq!(
            definitions["Pet"].properties["name"].description.as_deref(),
            Some("from docs")
        );
    }

    #[test]
    fn test_model_descriptions_are_joined() {
        let mut types = TypeRegistry::new();
        types.register(
            "Pet",
            StructDef::new()
                .field(FieldDef::new("a", TypeDescriptor::string()).with_meta(FieldMeta {
                    model_description: Some("first".to_string()),
                    ..Default::default()
                }))
                .field(FieldDef::new("b", TypeDescriptor::string()).with_meta(FieldMeta {
                    model_description: Some("second".to_string()),
                    ..Default::default()
                })),
        );
        assert_eq!(
            build(types, "Pet")["Pet"].description.as_deref(),
            Some("first\nsecond")
        );
    }

    #[test]
    fn test_naming_and_format_hooks() {
        let mut types = TypeRegistry::new();
        types.register(
            "pkg.Event",
            StructDef::new()
                .field(FieldDef::new("at", TypeDescriptor::text("Timestamp")))
                .field(FieldDef::new("n", TypeDescriptor::primitive(PrimitiveKind::Int))),
        );
        let config = Config::new(types)
            .with_model_type_name_handler(Arc::new(|ty: &TypeDescriptor| match ty {
                TypeDescriptor::Struct(name) => name.rsplit('.').next().map(str::to_string),
                _ => None,
            }))
            .with_schema_format_handler(Arc::new(|key: &str| match key {
                "Timestamp" => Some("unix-time".to_string()),
                "int" => Some("int64".to_string()),
                _ => None,
            }));
        let mut builder = DefinitionBuilder::new(&config);
        builder
            .add_model_from(&TypeDescriptor::named("pkg.Event"))
            .unwrap();

        let event = &builder.definitions()["Event"];
        assert_eq!(event.properties["at"], Schema::typed("string", "unix-time"));
        assert_eq!(event.properties["n"], Schema::typed("integer", "int64"));
    }

    #[test]
    fn test_primitive_keyword_name_is_inlined() {
        let mut types = TypeRegistry::new();
        types
            .register("Wrapper", StructDef::new().field(FieldDef::new("v", TypeDescriptor::named("string"))))
            .register("string", StructDef::new());
        let definitions = build(types, "Wrapper");
        assert!(!definitions.contains_key("string"));
        assert_eq!(
            definitions["Wrapper"].properties["v"],
            Schema::typed("string", "")
        );
    }

    #[test]
    fn test_unknown_struct_is_an_error() {
        let mut types = TypeRegistry::new();
        types.register(
            "Holder",
            StructDef::new().field(FieldDef::new("x", TypeDescriptor::named("Missing"))),
        );
        let config = Config::new(types);
        let mut builder = DefinitionBuilder::new(&config);
        let err = builder
            .add_model_from(&TypeDescriptor::named("Holder"))
            .unwrap_err();
        assert_eq!(
            err,
            crate::error::BuildError::UnresolvedType {
                name: "Missing".to_string()
            }
        );
    }

    #[test]
    fn test_array_type_override() {
        let mut types = TypeRegistry::new();
        types.register(
            "Tagged",
            StructDef::new().field(
                FieldDef::new("tags", TypeDescriptor::string()).with_meta(FieldMeta {
                    type_override: Some(crate::types::TypeOverride::parse("[]string")),
                    ..Default::default()
                }),
            ),
        );
        assert_eq!(
            as_json(&build(types, "Tagged"))["Tagged"]["properties"]["tags"],
            json!({"type": "array", "items": {"type": "string"}})
        );
    }
}
