//! Model declarations read from Rust source.
//!
//! Structs with named fields become registry entries. Unit-only enums render
//! as strings listing their variants, newtypes take the shape of the wrapped
//! type, and type aliases are followed. Serde attributes shape the exposed
//! names, and `#[swagger(...)]` attributes carry documentation metadata:
//!
//! ```ignore
//! /// A registered user
//! #[derive(Serialize)]
//! #[serde(rename_all = "camelCase")]
//! pub struct User {
//!     /// Unique identifier
//!     #[swagger(minimum = 1)]
//!     pub user_id: u64,
//!     #[swagger(enum = "admin|member", default = "member")]
//!     pub role: String,
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     pub nickname: Option<String>,
//! }
//! ```

use crate::types::{
    json_schema_format, FieldDef, FieldMeta, PrimitiveKind, StructDef, TypeDescriptor,
    TypeOverride, TypeRegistry,
};
use anyhow::{Context, Result};
use log::{debug, warn};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Expr, Fields, GenericArgument, Item, Lit, LitBool, LitStr, PathArguments, Type};

/// Type resolver - turns parsed source files into a type registry
#[derive(Debug, Default)]
pub struct TypeResolver {
    registry: TypeRegistry,
    /// Enums, newtypes and aliases, by name
    named: HashMap<String, TypeDescriptor>,
    /// Wire names of the variants of unit-only enums
    enum_variants: HashMap<String, Vec<String>>,
}

impl TypeResolver {
    /// Resolve every model declared in a set of files.
    ///
    /// Enums are indexed first, then newtypes and aliases, then structs, so a
    /// struct may use any of them regardless of declaration order.
    pub fn resolve(files: &[syn::File]) -> Self {
        let mut resolver = Self::default();

        for file in files {
            walk_items(&file.items, &mut |item| {
                if let Item::Enum(item_enum) = item {
                    resolver.index_enum(item_enum);
                }
            });
        }
        for file in files {
            walk_items(&file.items, &mut |item| match item {
                Item::Struct(item_struct) if !matches!(item_struct.fields, Fields::Named(_)) => {
                    resolver.index_tuple_struct(item_struct);
                }
                Item::Type(alias) => {
                    let target = resolver.map_type(&alias.ty, &HashSet::new());
                    debug!("Alias {} = {}", alias.ident, target.type_name());
                    resolver.named.insert(alias.ident.unraw().to_string(), target);
                }
                _ => {}
            });
        }
        for file in files {
            walk_items(&file.items, &mut |item| {
                if let Item::Struct(item_struct) = item {
                    if matches!(item_struct.fields, Fields::Named(_)) {
                        resolver.register_struct(item_struct);
                    }
                }
            });
        }

        debug!(
            "Resolved {} structs and {} other named types",
            resolver.registry.len(),
            resolver.named.len()
        );
        resolver
    }

    /// Resolve the models of a single source text
    pub fn from_source(source: &str) -> Result<Self> {
        let file = syn::parse_file(source).context("Failed to parse Rust source")?;
        Ok(Self::resolve(&[file]))
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> TypeRegistry {
        self.registry
    }

    /// Variant names of a unit-only enum, as they appear on the wire
    pub fn enum_variants(&self, name: &str) -> Option<&[String]> {
        self.enum_variants.get(name).map(Vec::as_slice)
    }

    /// Turn a type expression such as `Vec<User>` into a descriptor
    pub fn parse_type_expr(&self, expr: &str) -> Result<TypeDescriptor> {
        let ty: Type = syn::parse_str(expr)
            .with_context(|| format!("Invalid type expression '{}'", expr))?;
        Ok(self.map_type(&ty, &HashSet::new()))
    }

    fn index_enum(&mut self, item_enum: &syn::ItemEnum) {
        let name = item_enum.ident.unraw().to_string();
        let unit_only = !item_enum.variants.is_empty()
            && item_enum
                .variants
                .iter()
                .all(|v| matches!(v.fields, Fields::Unit));

        if !unit_only {
            debug!("Enum {} carries data, rendering it as any value", name);
            self.named.insert(name, TypeDescriptor::Interface);
            return;
        }

        let rule = parse_serde_container(&item_enum.attrs).rename_all;
        let variants: Vec<String> = item_enum
            .variants
            .iter()
            .filter_map(|variant| {
                let serde = parse_serde_field(&variant.attrs);
                if serde.skip {
                    return None;
                }
                let ident = variant.ident.unraw().to_string();
                Some(match (serde.rename, rule) {
                    (Some(rename), _) => rename,
                    (None, Some(rule)) => rule.apply_to_variant(&ident),
                    (None, None) => ident,
                })
            })
            .collect();

        debug!("Enum {} has variants {:?}", name, variants);
        self.enum_variants.insert(name.clone(), variants);
        self.named.insert(name.clone(), TypeDescriptor::text(name));
    }

    fn index_tuple_struct(&mut self, item_struct: &syn::ItemStruct) {
        let name = item_struct.ident.unraw().to_string();
        let generics = generic_names(&item_struct.generics);
        let descriptor = match &item_struct.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                match self.map_type(&fields.unnamed[0].ty, &generics) {
                    TypeDescriptor::Primitive { kind, name: None } => {
                        TypeDescriptor::named_primitive(name.clone(), kind)
                    }
                    other => other,
                }
            }
            Fields::Unnamed(_) => TypeDescriptor::slice(TypeDescriptor::Interface),
            _ => TypeDescriptor::Interface,
        };
        debug!("Newtype {} = {}", name, descriptor.type_name());
        self.named.insert(name, descriptor);
    }

    fn register_struct(&mut self, item_struct: &syn::ItemStruct) {
        let name = item_struct.ident.unraw().to_string();
        let container = parse_serde_container(&item_struct.attrs);
        let generics = generic_names(&item_struct.generics);

        let mut def = StructDef::new();
        if let Some(doc) = doc_text(&item_struct.attrs) {
            def = def.doc("", doc);
        }
        if let Fields::Named(named) = &item_struct.fields {
            for field in &named.named {
                if let Some(field_def) = self.resolve_field(field, &container, &generics) {
                    def.fields.push(field_def);
                }
            }
        }

        if self.registry.contains(&name) {
            warn!("Struct {} is declared more than once, keeping the last one", name);
        }
        debug!("Registered struct {} with {} fields", name, def.fields.len());
        self.registry.register(name, def);
    }

    fn resolve_field(
        &self,
        field: &syn::Field,
        container: &SerdeContainer,
        generics: &HashSet<String>,
    ) -> Option<FieldDef> {
        let name = field.ident.as_ref()?.unraw().to_string();
        let (mut ty, is_option) = self.field_type(&field.ty, generics);
        let serde = parse_serde_field(&field.attrs);

        let mut meta = FieldMeta {
            // a flattened field has no name of its own on the wire
            rename: if serde.flatten {
                None
            } else {
                serde
                    .rename
                    .or_else(|| container.rename_all.map(|rule| rule.apply_to_field(&name)))
            },
            skip: serde.skip,
            optional: is_option || serde.default || container.default,
            omit_empty: serde.skip_serializing_if,
            description: doc_text(&field.attrs),
            ..Default::default()
        };

        if serde.flatten {
            ty = ty.deref().clone();
            if matches!(ty, TypeDescriptor::Map(_)) {
                debug!("Field {} flattens a map, leaving it out", name);
                meta.skip = true;
            }
        }

        apply_swagger_attributes(&field.attrs, ty.primitive_kind(), &mut meta);

        if meta.enum_values.is_none() {
            if let TypeDescriptor::Text(enum_name) = ty.deref() {
                if let Some(variants) = self.enum_variants.get(enum_name) {
                    meta.enum_values = Some(variants.iter().cloned().map(Value::String).collect());
                }
            }
        }

        Some(FieldDef {
            name,
            ty,
            embedded: serde.flatten,
            meta,
        })
    }

    /// Map a field type; a top-level `Option` also marks the field optional
    fn field_type(&self, ty: &Type, generics: &HashSet<String>) -> (TypeDescriptor, bool) {
        if let Type::Path(type_path) = ty {
            if let Some(segment) = type_path.path.segments.last() {
                if segment.ident == "Option" {
                    if let Some(inner) = type_arguments(&segment.arguments).first() {
                        return (
                            TypeDescriptor::pointer(self.map_type(inner, generics)),
                            true,
                        );
                    }
                }
            }
        }
        (self.map_type(ty, generics), false)
    }

    fn map_type(&self, ty: &Type, generics: &HashSet<String>) -> TypeDescriptor {
        match ty {
            Type::Path(type_path) if type_path.qself.is_none() => {
                self.map_path(&type_path.path, generics)
            }
            Type::Reference(reference) => self.map_type(&reference.elem, generics),
            Type::Paren(paren) => self.map_type(&paren.elem, generics),
            Type::Group(group) => self.map_type(&group.elem, generics),
            Type::Slice(slice) => TypeDescriptor::slice(self.map_type(&slice.elem, generics)),
            Type::Array(array) => TypeDescriptor::slice(self.map_type(&array.elem, generics)),
            Type::Tuple(tuple) if !tuple.elems.is_empty() => {
                TypeDescriptor::slice(TypeDescriptor::Interface)
            }
            _ => TypeDescriptor::Interface,
        }
    }

    fn map_path(&self, path: &syn::Path, generics: &HashSet<String>) -> TypeDescriptor {
        let Some(segment) = path.segments.last() else {
            return TypeDescriptor::Interface;
        };
        let ident = segment.ident.unraw().to_string();
        let args = type_arguments(&segment.arguments);

        if path.segments.len() == 1 && generics.contains(&ident) {
            return TypeDescriptor::Interface;
        }
        if let Some(kind) = rust_primitive(&ident) {
            return TypeDescriptor::primitive(kind);
        }

        match (ident.as_str(), args.as_slice()) {
            (
                "Option" | "Box" | "Rc" | "Arc" | "Cow" | "RefCell" | "Cell" | "Mutex" | "RwLock",
                [inner, ..],
            ) => return TypeDescriptor::pointer(self.map_type(inner, generics)),
            (
                "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet"
                | "BinaryHeap",
                [inner, ..],
            ) => return TypeDescriptor::slice(self.map_type(inner, generics)),
            ("HashMap" | "BTreeMap" | "IndexMap", [_, value, ..]) => {
                return TypeDescriptor::map(self.map_type(value, generics))
            }
            ("PhantomData", _) => return TypeDescriptor::Marker,
            ("Value", _) if is_json_value(path) => return TypeDescriptor::Interface,
            _ => {}
        }

        if !json_schema_format(&ident).is_empty() {
            return TypeDescriptor::text(ident);
        }
        if let Some(descriptor) = self.named.get(&ident) {
            return descriptor.clone();
        }
        TypeDescriptor::named(ident)
    }
}

/// Visit items, descending into inline modules
fn walk_items(items: &[Item], visit: &mut impl FnMut(&Item)) {
    for item in items {
        if let Item::Mod(module) = item {
            if let Some((_, nested)) = &module.content {
                walk_items(nested, &mut *visit);
            }
            continue;
        }
        visit(item);
    }
}

fn generic_names(generics: &syn::Generics) -> HashSet<String> {
    generics
        .type_params()
        .map(|param| param.ident.to_string())
        .collect()
}

fn type_arguments(arguments: &PathArguments) -> Vec<&Type> {
    match arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn is_json_value(path: &syn::Path) -> bool {
    path.segments.len() == 1
        || path
            .segments
            .first()
            .map_or(false, |s| s.ident == "serde_json" || s.ident == "serde_yaml")
}

fn rust_primitive(ident: &str) -> Option<PrimitiveKind> {
    let kind = match ident {
        "bool" => PrimitiveKind::Bool,
        "i8" => PrimitiveKind::Int8,
        "i16" => PrimitiveKind::Int16,
        "i32" => PrimitiveKind::Int32,
        "i64" | "i128" => PrimitiveKind::Int64,
        "isize" => PrimitiveKind::Int,
        "u8" => PrimitiveKind::Uint8,
        "u16" => PrimitiveKind::Uint16,
        "u32" => PrimitiveKind::Uint32,
        "u64" | "u128" => PrimitiveKind::Uint64,
        "usize" => PrimitiveKind::Uint,
        "f32" => PrimitiveKind::Float32,
        "f64" => PrimitiveKind::Float64,
        "String" | "str" | "char" => PrimitiveKind::String,
        _ => return None,
    };
    Some(kind)
}

/// Text of the `///` comments on an item, `None` when there are none
fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(syn::ExprLit {
                    lit: Lit::Str(text),
                    ..
                }) => Some(text.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect();
    let text = lines.join("\n").trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Serde options of a field or enum variant
#[derive(Debug, Default)]
struct SerdeField {
    rename: Option<String>,
    skip: bool,
    flatten: bool,
    default: bool,
    skip_serializing_if: bool,
}

/// Serde options of a struct or enum
#[derive(Debug, Default)]
struct SerdeContainer {
    rename_all: Option<RenameRule>,
    default: bool,
}

fn parse_serde_field(attrs: &[Attribute]) -> SerdeField {
    let mut serde = SerdeField::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                serde.rename = Some(serialized_name(&meta)?);
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                serde.skip = true;
            } else if meta.path.is_ident("flatten") {
                serde.flatten = true;
            } else if meta.path.is_ident("default") {
                serde.default = true;
                skip_value(&meta)?;
            } else if meta.path.is_ident("skip_serializing_if") {
                serde.skip_serializing_if = true;
                skip_value(&meta)?;
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        });
        if let Err(err) = result {
            warn!("Ignoring malformed #[serde] attribute: {}", err);
        }
    }
    serde
}

fn parse_serde_container(attrs: &[Attribute]) -> SerdeContainer {
    let mut container = SerdeContainer::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let rule = serialized_name(&meta)?;
                container.rename_all = RenameRule::parse(&rule);
                if container.rename_all.is_none() {
                    warn!("Unknown rename_all rule '{}'", rule);
                }
            } else if meta.path.is_ident("default") {
                container.default = true;
                skip_value(&meta)?;
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        });
        if let Err(err) = result {
            warn!("Ignoring malformed #[serde] attribute: {}", err);
        }
    }
    container
}

/// `rename = "x"` or the serialize half of `rename(serialize = "x", ...)`
fn serialized_name(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    if meta.input.peek(syn::Token![=]) {
        let name: LitStr = meta.value()?.parse()?;
        return Ok(name.value());
    }
    let mut serialized = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("serialize") {
            let name: LitStr = inner.value()?.parse()?;
            serialized = Some(name.value());
        } else {
            skip_value(&inner)?;
        }
        Ok(())
    })?;
    serialized.ok_or_else(|| meta.error("expected a serialize name"))
}

/// Consume the value of an option this reader does not use
fn skip_value(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_value(&inner))?;
    }
    Ok(())
}

fn apply_swagger_attributes(
    attrs: &[Attribute],
    kind: Option<PrimitiveKind>,
    meta: &mut FieldMeta,
) {
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("swagger")) {
        let result = attr.parse_nested_meta(|nested| {
            let key = nested
                .path
                .get_ident()
                .map(|ident| ident.to_string())
                .unwrap_or_default();
            match key.as_str() {
                "description" => meta.description = Some(literal_text(&nested)?),
                "default" => meta.default = Some(typed_literal(kind, &literal_text(&nested)?)),
                "enum" => {
                    let values = literal_text(&nested)?;
                    meta.enum_values = Some(
                        values
                            .split('|')
                            .map(|value| typed_literal(kind, value))
                            .collect(),
                    );
                }
                "minimum" => meta.minimum = Some(numeric_literal(kind, &literal_text(&nested)?)),
                "maximum" => meta.maximum = Some(numeric_literal(kind, &literal_text(&nested)?)),
                "min_length" => meta.min_length = Some(integer_value(&nested)?),
                "max_length" => meta.max_length = Some(integer_value(&nested)?),
                "pattern" => meta.pattern = Some(literal_text(&nested)?),
                "type" => meta.type_override = Some(TypeOverride::parse(&literal_text(&nested)?)),
                "unique" => meta.unique = Some(flag_value(&nested)?),
                "read_only" => meta.read_only = Some(flag_value(&nested)?),
                "optional" => meta.optional = flag_value(&nested)?,
                "string" => meta.as_string = flag_value(&nested)?,
                "model_description" => meta.model_description = Some(literal_text(&nested)?),
                _ => return Err(nested.error(format!("unknown swagger option '{}'", key))),
            }
            Ok(())
        });
        if let Err(err) = result {
            warn!("Ignoring malformed #[swagger] attribute: {}", err);
        }
    }
}

/// The value of `key = <literal>` as text
fn literal_text(nested: &ParseNestedMeta<'_>) -> syn::Result<String> {
    let lit: Lit = nested.value()?.parse()?;
    match lit {
        Lit::Str(text) => Ok(text.value()),
        Lit::Int(int) => Ok(int.base10_digits().to_string()),
        Lit::Float(float) => Ok(float.base10_digits().to_string()),
        Lit::Bool(flag) => Ok(flag.value.to_string()),
        _ => Err(nested.error("expected a string, number or boolean literal")),
    }
}

fn integer_value(nested: &ParseNestedMeta<'_>) -> syn::Result<u64> {
    literal_text(nested)?
        .trim()
        .parse()
        .map_err(|_| nested.error("expected a non-negative integer"))
}

/// A bare flag means `true`
fn flag_value(nested: &ParseNestedMeta<'_>) -> syn::Result<bool> {
    if nested.input.peek(syn::Token![=]) {
        let flag: LitBool = nested.value()?.parse()?;
        Ok(flag.value)
    } else {
        Ok(true)
    }
}

fn typed_literal(kind: Option<PrimitiveKind>, text: &str) -> Value {
    match kind {
        Some(kind) => kind.parse_literal(text.trim()),
        None => Value::String(text.to_string()),
    }
}

fn numeric_literal(kind: Option<PrimitiveKind>, text: &str) -> Value {
    let kind = kind
        .filter(|k| !matches!(k, PrimitiveKind::String | PrimitiveKind::Bool))
        .unwrap_or(PrimitiveKind::Float64);
    kind.parse_literal(text.trim())
}

/// Serde `rename_all` conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(rule: &str) -> Option<Self> {
        Some(match rule {
            "lowercase" => RenameRule::Lower,
            "UPPERCASE" => RenameRule::Upper,
            "PascalCase" => RenameRule::Pascal,
            "camelCase" => RenameRule::Camel,
            "snake_case" => RenameRule::Snake,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnake,
            "kebab-case" => RenameRule::Kebab,
            "SCREAMING-KEBAB-CASE" => RenameRule::ScreamingKebab,
            _ => return None,
        })
    }

    /// Rename a snake_case field
    fn apply_to_field(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => field.split('_').map(capitalize).collect(),
            RenameRule::Camel => {
                let pascal: String = field.split('_').map(capitalize).collect();
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
        }
    }

    /// Rename a PascalCase enum variant
    fn apply_to_variant(self, variant: &str) -> String {
        match self {
            RenameRule::Pascal => variant.to_string(),
            RenameRule::Lower => variant.to_ascii_lowercase(),
            RenameRule::Upper => variant.to_ascii_uppercase(),
            RenameRule::Camel => {
                let mut chars = variant.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
            RenameRule::Snake
            | RenameRule::ScreamingSnake
            | RenameRule::Kebab
            | RenameRule::ScreamingKebab => {
                let mut snake = String::new();
                for (i, c) in variant.char_indices() {
                    if c.is_uppercase() && i > 0 {
                        snake.push('_');
                    }
                    snake.extend(c.to_lowercase());
                }
                match self {
                    RenameRule::Snake => snake,
                    other => other.apply_to_field(&snake),
                }
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
