//! Structural type descriptors and field metadata.
//!
//! Models are described by an explicit, closed set of kinds instead of being
//! discovered at runtime. Named structs live in a [`TypeRegistry`] and are
//! referred to by key, which lets self-referential models be declared without
//! owning cycles.

use crate::error::{BuildError, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Primitive kinds with a fixed schema type and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
}

impl PrimitiveKind {
    /// Every primitive kind, in table order
    pub const ALL: [PrimitiveKind; 14] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Int,
        PrimitiveKind::Int8,
        PrimitiveKind::Int16,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::Uint,
        PrimitiveKind::Uint8,
        PrimitiveKind::Uint16,
        PrimitiveKind::Uint32,
        PrimitiveKind::Uint64,
        PrimitiveKind::Float32,
        PrimitiveKind::Float64,
        PrimitiveKind::String,
    ];

    /// The keyword naming this kind (also the key of the format tables)
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::Uint => "uint",
            PrimitiveKind::Uint8 => "uint8",
            PrimitiveKind::Uint16 => "uint16",
            PrimitiveKind::Uint32 => "uint32",
            PrimitiveKind::Uint64 => "uint64",
            PrimitiveKind::Float32 => "float32",
            PrimitiveKind::Float64 => "float64",
            PrimitiveKind::String => "string",
        }
    }

    /// Parse a kind keyword; `byte` and `rune` are accepted as aliases
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "byte" => Some(PrimitiveKind::Uint8),
            "rune" => Some(PrimitiveKind::Int32),
            other => Self::ALL.iter().copied().find(|k| k.keyword() == other),
        }
    }

    /// JSON schema type of this kind
    pub fn json_type(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "boolean",
            PrimitiveKind::Float32 | PrimitiveKind::Float64 => "number",
            PrimitiveKind::String => "string",
            _ => "integer",
        }
    }

    /// JSON schema format of this kind, empty when there is none
    pub fn json_format(self) -> &'static str {
        match self {
            PrimitiveKind::Int => "int32",
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::Uint => "uint32",
            PrimitiveKind::Uint8 => "uint8",
            PrimitiveKind::Uint16 => "uint16",
            PrimitiveKind::Uint32 => "uint32",
            PrimitiveKind::Uint64 => "uint64",
            PrimitiveKind::Float32 => "float",
            PrimitiveKind::Float64 => "double",
            PrimitiveKind::Bool | PrimitiveKind::String => "",
        }
    }

    /// Parse a literal written for a field of this kind into a typed JSON value.
    ///
    /// Literals that do not parse are kept as strings.
    pub fn parse_literal(self, literal: &str) -> Value {
        let parsed = match self {
            PrimitiveKind::Bool => literal.parse::<bool>().ok().map(Value::from),
            PrimitiveKind::Int
            | PrimitiveKind::Int8
            | PrimitiveKind::Int16
            | PrimitiveKind::Int32
            | PrimitiveKind::Int64 => literal.parse::<i64>().ok().map(Value::from),
            PrimitiveKind::Uint
            | PrimitiveKind::Uint8
            | PrimitiveKind::Uint16
            | PrimitiveKind::Uint32
            | PrimitiveKind::Uint64 => literal.parse::<u64>().ok().map(Value::from),
            PrimitiveKind::Float32 | PrimitiveKind::Float64 => {
                literal.parse::<f64>().ok().map(Value::from)
            }
            PrimitiveKind::String => None,
        };
        parsed.unwrap_or_else(|| Value::String(literal.to_string()))
    }
}

/// Names of self-serializing types that render as formatted strings
const TEXT_FORMATS: &[(&str, &str)] = &[
    ("time.Time", "date-time"),
    ("DateTime", "date-time"),
    ("NaiveDateTime", "date-time"),
    ("OffsetDateTime", "date-time"),
    ("SystemTime", "date-time"),
    ("NaiveDate", "date"),
    ("Date", "date"),
    ("Uuid", "uuid"),
];

/// Whether a type name denotes a primitive and must always be inlined
pub fn is_primitive_type(name: &str) -> bool {
    !name.is_empty()
        && (PrimitiveKind::from_keyword(name).is_some()
            || TEXT_FORMATS.iter().any(|(n, _)| *n == name))
}

/// Schema type for a type name; unknown names are used as-is
pub fn json_schema_type(name: &str) -> String {
    if name == "byte" || TEXT_FORMATS.iter().any(|(n, _)| *n == name) {
        return "string".to_string();
    }
    match PrimitiveKind::from_keyword(name) {
        Some(kind) => kind.json_type().to_string(),
        None => name.to_string(),
    }
}

/// Built-in schema format for a type name, empty when there is none
pub fn json_schema_format(name: &str) -> &'static str {
    if name == "byte" {
        return "byte";
    }
    if let Some((_, format)) = TEXT_FORMATS.iter().find(|(n, _)| *n == name) {
        return format;
    }
    PrimitiveKind::from_keyword(name)
        .map(|k| k.json_format())
        .unwrap_or("")
}

/// A structural type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// A primitive, optionally under its own name (a newtype such as `UserId`)
    Primitive {
        kind: PrimitiveKind,
        name: Option<String>,
    },
    /// A named struct, resolved through the [`TypeRegistry`]
    Struct(String),
    /// A struct type without a name of its own
    Anonymous(Box<StructDef>),
    /// A slice or fixed-size array
    Slice(Box<TypeDescriptor>),
    /// A map with string keys
    Map(Box<TypeDescriptor>),
    /// An indirection (reference, box, optional value)
    Pointer(Box<TypeDescriptor>),
    /// Any JSON value
    Interface,
    /// A type that serializes itself to a string
    Text(String),
    /// Serialization metadata carrying no document value
    Marker,
}

impl TypeDescriptor {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        TypeDescriptor::Primitive { kind, name: None }
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    /// A primitive kind declared under its own type name
    pub fn named_primitive(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        TypeDescriptor::Primitive {
            kind,
            name: Some(name.into()),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeDescriptor::Struct(name.into())
    }

    pub fn anonymous(def: StructDef) -> Self {
        TypeDescriptor::Anonymous(Box::new(def))
    }

    pub fn slice(elem: TypeDescriptor) -> Self {
        TypeDescriptor::Slice(Box::new(elem))
    }

    /// A byte sequence, rendered as a base64 string
    pub fn bytes() -> Self {
        Self::slice(Self::primitive(PrimitiveKind::Uint8))
    }

    pub fn map(value: TypeDescriptor) -> Self {
        TypeDescriptor::Map(Box::new(value))
    }

    pub fn pointer(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Pointer(Box::new(inner))
    }

    pub fn text(name: impl Into<String>) -> Self {
        TypeDescriptor::Text(name.into())
    }

    /// Strip every level of pointer indirection
    pub fn deref(&self) -> &TypeDescriptor {
        let mut current = self;
        while let TypeDescriptor::Pointer(inner) = current {
            current = inner;
        }
        current
    }

    /// Whether this is a byte slice
    pub fn is_bytes(&self) -> bool {
        match self.deref() {
            TypeDescriptor::Slice(elem) => matches!(
                elem.deref(),
                TypeDescriptor::Primitive {
                    kind: PrimitiveKind::Uint8,
                    ..
                }
            ),
            _ => false,
        }
    }

    /// The primitive kind behind any pointers, if there is one
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.deref() {
            TypeDescriptor::Primitive { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Human-readable name, used in log lines and errors
    pub fn type_name(&self) -> String {
        match self {
            TypeDescriptor::Primitive { kind, name } => {
                name.clone().unwrap_or_else(|| kind.keyword().to_string())
            }
            TypeDescriptor::Struct(name) | TypeDescriptor::Text(name) => name.clone(),
            TypeDescriptor::Anonymous(_) => "struct {...}".to_string(),
            TypeDescriptor::Slice(elem) => format!("[]{}", elem.type_name()),
            TypeDescriptor::Map(value) => format!("map[string]{}", value.type_name()),
            TypeDescriptor::Pointer(inner) => format!("*{}", inner.type_name()),
            TypeDescriptor::Interface => "interface {}".to_string(),
            TypeDescriptor::Marker => "marker".to_string(),
        }
    }
}

/// Explicit type given to a field, bypassing structural inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOverride {
    Scalar(String),
    /// The `[]item` shorthand
    ArrayOf(String),
}

impl TypeOverride {
    /// Parse `"string"` or the array shorthand `"[]string"`
    pub fn parse(tag: &str) -> Self {
        match tag.strip_prefix("[]") {
            Some(item) if !item.is_empty() => TypeOverride::ArrayOf(item.to_string()),
            _ => TypeOverride::Scalar(tag.to_string()),
        }
    }
}

/// Per-field documentation and serialization options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMeta {
    pub rename: Option<String>,
    pub skip: bool,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
    pub minimum: Option<Value>,
    pub maximum: Option<Value>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub type_override: Option<TypeOverride>,
    pub unique: Option<bool>,
    pub read_only: Option<bool>,
    /// Never listed as required
    pub optional: bool,
    /// Omitted from output when empty, which also makes it not required
    pub omit_empty: bool,
    /// A numeric value carried as a JSON string
    pub as_string: bool,
    /// Contributes a line to the containing model's description
    pub model_description: Option<String>,
}

/// A struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeDescriptor,
    /// Declared without a field name of its own; its fields are flattened
    pub embedded: bool,
    pub meta: FieldMeta,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            embedded: false,
            meta: FieldMeta::default(),
        }
    }

    /// An embedded field named after its struct type
    pub fn embed(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let mut field = Self::new(type_name.clone(), TypeDescriptor::named(type_name));
        field.embedded = true;
        field
    }

    pub fn with_meta(mut self, meta: FieldMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.meta.rename = Some(name.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.meta.optional = true;
        self
    }

    pub fn skip(mut self) -> Self {
        self.meta.skip = true;
        self
    }
}

/// Field list of a struct plus its documentation lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructDef {
    pub fields: Vec<FieldDef>,
    /// Exposed field name to description; the empty key documents the model
    pub docs: Option<HashMap<String, String>>,
}

impl StructDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn doc(mut self, key: impl Into<String>, description: impl Into<String>) -> Self {
        self.docs
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), description.into());
        self
    }
}

/// Named struct definitions, keyed by qualified type name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    structs: HashMap<String, StructDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a struct under its key
    pub fn register(&mut self, name: impl Into<String>, def: StructDef) -> &mut Self {
        self.structs.insert(name.into(), def);
        self
    }

    pub fn get(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    /// Look up a struct that the build depends on
    pub fn resolve(&self, name: &str) -> Result<&StructDef> {
        self.structs.get(name).ok_or_else(|| BuildError::UnresolvedType {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    /// Move every struct of `other` into this registry
    pub fn extend(&mut self, other: TypeRegistry) {
        self.structs.extend(other.structs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_tables_are_total() {
        for kind in PrimitiveKind::ALL {
            assert!(!kind.json_type().is_empty());
            assert_eq!(PrimitiveKind::from_keyword(kind.keyword()), Some(kind));
        }
        assert_eq!(PrimitiveKind::Int.json_format(), "int32");
        assert_eq!(PrimitiveKind::Uint.json_format(), "uint32");
        assert_eq!(PrimitiveKind::Float64.json_format(), "double");
        assert_eq!(PrimitiveKind::String.json_format(), "");
    }

    #[test]
    fn test_name_tables() {
        assert_eq!(json_schema_type("int64"), "integer");
        assert_eq!(json_schema_type("byte"), "string");
        assert_eq!(json_schema_type("time.Time"), "string");
        assert_eq!(json_schema_type("default-v"), "default-v");
        assert_eq!(json_schema_format("byte"), "byte");
        assert_eq!(json_schema_format("DateTime"), "date-time");
        assert_eq!(json_schema_format("user.User"), "");
    }

    #[test]
    fn test_is_primitive_type_is_exact() {
        assert!(is_primitive_type("string"));
        assert!(is_primitive_type("rune"));
        assert!(is_primitive_type("time.Time"));
        assert!(!is_primitive_type(""));
        assert!(!is_primitive_type("in"));
        assert!(!is_primitive_type("user.User"));
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(PrimitiveKind::Int.parse_literal("21"), json!(21));
        assert_eq!(PrimitiveKind::Uint8.parse_literal("7"), json!(7));
        assert_eq!(PrimitiveKind::Float32.parse_literal("1.5"), json!(1.5));
        assert_eq!(PrimitiveKind::Bool.parse_literal("true"), json!(true));
        assert_eq!(PrimitiveKind::Int.parse_literal("abc"), json!("abc"));
        assert_eq!(PrimitiveKind::String.parse_literal("12"), json!("12"));
    }

    #[test]
    fn test_bytes_detection() {
        assert!(TypeDescriptor::bytes().is_bytes());
        assert!(TypeDescriptor::pointer(TypeDescriptor::bytes()).is_bytes());
        assert!(!TypeDescriptor::slice(TypeDescriptor::string()).is_bytes());
    }

    #[test]
    fn test_type_override_parse() {
        assert_eq!(
            TypeOverride::parse("[]string"),
            TypeOverride::ArrayOf("string".to_string())
        );
        assert_eq!(
            TypeOverride::parse("integer"),
            TypeOverride::Scalar("integer".to_string())
        );
        assert_eq!(TypeOverride::parse("[]"), TypeOverride::Scalar("[]".to_string()));
    }

    #[test]
    fn test_registry_resolve_missing() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.resolve("Missing").unwrap_err(),
            BuildError::UnresolvedType {
                name: "Missing".to_string()
            }
        );
    }
}
