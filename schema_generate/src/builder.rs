//! Resolves parsed JSON Schema documents into the Go [`TypeModel`].
//!
//! Every document contributes its root and its `definitions`/`$defs` entries.
//! Object-like schemas become structs, everything else named becomes an
//! alias. All documents share one name space; a taken name gets a numeric
//! suffix (`Address`, `Address1`, ...).

use heck::ToUpperCamelCase;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::error::JsonSchemaGenError;
use crate::gofmt;
use crate::json_pointer;
use crate::model::{Alias, Field, Struct, TypeModel};
use crate::schema::{Items, JsonSchema};

const EMPTY_INTERFACE: &str = "interface{}";
const ROOT_NAME: &str = "Root";
const FALLBACK_FIELD_NAME: &str = "Field";

/// A parsed document together with the name diagnostics use for it.
#[derive(Debug)]
pub struct SchemaDocument {
    pub source_name: String,
    pub schema: JsonSchema,
}

/// Build the type model for `documents`, processed in order.
///
/// # Errors
///
/// Returns [`JsonSchemaGenError::UnsupportedSchema`] for `$ref`s that are
/// external or cannot be resolved, unknown `type` names and empty property
/// keys.
pub fn build_model(documents: &[SchemaDocument]) -> Result<TypeModel, JsonSchemaGenError> {
    let mut builder = Builder::default();
    for document in documents {
        builder.add_document(document)?;
    }
    Ok(builder.model)
}

#[derive(Default)]
struct Builder {
    model: TypeModel,
    claimed: HashSet<String>,
    /// Inline structs under construction, by pointer. A schema that reaches
    /// one of these again through `$ref` reuses its name.
    building: HashMap<String, String>,
}

/// A named schema `$ref` can point at.
struct Target<'s> {
    name: String,
    schema: &'s JsonSchema,
    is_struct: bool,
}

/// Named schemas of one document, keyed by canonical JSON Pointer (`""` is
/// the root).
struct Scope<'s> {
    source_name: &'s str,
    targets: BTreeMap<String, Target<'s>>,
}

impl<'s> Scope<'s> {
    /// The canonical pointer and target a local `$ref` names.
    fn lookup(
        &self,
        reference: &str,
        pointer: &str,
    ) -> Result<(&str, &Target<'s>), JsonSchemaGenError> {
        let Some(fragment) = reference.strip_prefix('#') else {
            return Err(self.unsupported(
                pointer,
                format!("external $ref '{reference}' is not supported"),
            ));
        };
        json_pointer::segments(fragment)
            .map(|segments| {
                segments
                    .iter()
                    .fold(String::new(), |path, segment| json_pointer::format(&path, segment))
            })
            .and_then(|canonical| self.targets.get_key_value(&canonical))
            .map(|(target_pointer, target)| (target_pointer.as_str(), target))
            .ok_or_else(|| self.unsupported(pointer, format!("unresolved $ref '{reference}'")))
    }

    fn unsupported(&self, pointer: &str, message: String) -> JsonSchemaGenError {
        JsonSchemaGenError::UnsupportedSchema {
            source_name: self.source_name.to_string(),
            pointer: format!("#{pointer}"),
            message,
        }
    }
}

/// Properties and `required` keys merged from a schema and its `allOf`
/// members.
#[derive(Default)]
struct Members<'s> {
    properties: BTreeMap<&'s str, (&'s JsonSchema, String)>,
    required: BTreeSet<&'s str>,
    visited_refs: BTreeSet<String>,
}

impl Builder {
    fn add_document(&mut self, document: &SchemaDocument) -> Result<(), JsonSchemaGenError> {
        let root: &JsonSchema = &document.schema;
        let mut scope = Scope {
            source_name: &document.source_name,
            targets: BTreeMap::new(),
        };

        // A document that only carries definitions has no root type.
        if root.is_object_like() || root.r#type.is_some() || root.reference.is_some() {
            let name: String = self.claim(&type_name(root.title.as_deref(), ROOT_NAME));
            scope.targets.insert(
                String::new(),
                Target {
                    name,
                    schema: root,
                    is_struct: root.is_object_like(),
                },
            );
        }
        for (container, key, definition) in root.definition_entries() {
            let pointer: String = json_pointer::format(&json_pointer::format("", container), key);
            let name: String = self.claim(&type_name(None, key));
            scope.targets.insert(
                pointer,
                Target {
                    name,
                    schema: definition,
                    is_struct: definition.is_object_like(),
                },
            );
        }

        for (pointer, target) in &scope.targets {
            if target.is_struct {
                self.build_struct(target.schema, &target.name, &scope, pointer)?;
            } else {
                let r#type: String = self.resolve_type(target.schema, &target.name, &scope, pointer)?;
                debug!(name = %target.name, go_type = %r#type, "built alias");
                self.model.insert_alias(Alias {
                    name: target.name.clone(),
                    r#type,
                });
            }
        }
        Ok(())
    }

    /// Reserve `base`, or `base` with the smallest free numeric suffix.
    fn claim(&mut self, base: &str) -> String {
        if self.claimed.insert(base.to_string()) {
            return base.to_string();
        }
        let mut suffix: usize = 1;
        loop {
            let candidate: String = format!("{base}{suffix}");
            if self.claimed.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }

    fn build_struct<'s>(
        &mut self,
        schema: &'s JsonSchema,
        name: &str,
        scope: &Scope<'s>,
        pointer: &str,
    ) -> Result<(), JsonSchemaGenError> {
        let mut members = Members::default();
        collect_members(schema, scope, pointer, &mut members)?;

        let mut s = Struct::new(name);
        s.description = normalize_description(schema.description.as_deref());
        for (key, (property, property_pointer)) in &members.properties {
            if key.is_empty() {
                return Err(scope.unsupported(
                    property_pointer,
                    "property names must not be empty".to_string(),
                ));
            }
            let go_field: String = unique_field_name(&s, &field_name(key));
            let context: String = format!("{name}{go_field}");
            let r#type: String = self.resolve_type(*property, &context, scope, property_pointer)?;
            s.insert_field(Field {
                name: go_field,
                json_name: (*key).to_string(),
                r#type,
                required: members.required.contains(key),
                description: normalize_description(property.description.as_deref()),
            });
        }
        debug!(name, fields = s.fields.len(), "built struct");
        self.model.insert_struct(s);
        Ok(())
    }

    /// Go type expression for `schema`. `context` names any nested struct the
    /// schema needs.
    fn resolve_type<'s>(
        &mut self,
        schema: &'s JsonSchema,
        context: &str,
        scope: &Scope<'s>,
        pointer: &str,
    ) -> Result<String, JsonSchemaGenError> {
        if let Some(reference) = &schema.reference {
            let (_, target) = scope.lookup(reference, pointer)?;
            return Ok(if target.is_struct {
                format!("*{}", target.name)
            } else {
                target.name.clone()
            });
        }
        if has_members(schema) {
            if let Some(name) = self.building.get(pointer) {
                debug!(name = %name, pointer, "recursive inline struct");
                return Ok(format!("*{name}"));
            }
            let name: String = self.claim(&type_name(schema.title.as_deref(), context));
            self.building.insert(pointer.to_string(), name.clone());
            let built = self.build_struct(schema, &name, scope, pointer);
            self.building.remove(pointer);
            built?;
            return Ok(format!("*{name}"));
        }
        if schema.any_of.is_some() || schema.one_of.is_some() {
            return Ok(EMPTY_INTERFACE.to_string());
        }

        let Some(keyword) = &schema.r#type else {
            return self.resolve_map(schema, context, scope, pointer);
        };
        match keyword.non_null().as_slice() {
            ["object"] => self.resolve_map(schema, context, scope, pointer),
            ["array"] => match &schema.items {
                Some(Items::Single(item)) => {
                    let item_pointer: String = json_pointer::format(pointer, "items");
                    let element: String =
                        self.resolve_type(item, &format!("{context}Items"), scope, &item_pointer)?;
                    Ok(format!("[]{element}"))
                }
                Some(Items::Tuple(_)) | None => Ok(format!("[]{EMPTY_INTERFACE}")),
            },
            ["string"] => Ok("string".to_string()),
            ["integer"] => Ok("int".to_string()),
            ["number"] => Ok("float64".to_string()),
            ["boolean"] => Ok("bool".to_string()),
            [other] => Err(scope.unsupported(
                &json_pointer::format(pointer, "type"),
                format!("unsupported type '{other}'"),
            )),
            _ => Ok(EMPTY_INTERFACE.to_string()),
        }
    }

    /// `map[string]T` for an `additionalProperties` schema; free-form objects
    /// and untyped schemas fall back to `map[string]interface{}` and
    /// `interface{}`.
    fn resolve_map<'s>(
        &mut self,
        schema: &'s JsonSchema,
        context: &str,
        scope: &Scope<'s>,
        pointer: &str,
    ) -> Result<String, JsonSchemaGenError> {
        if let Some(values) = schema.additional_properties_schema() {
            let values_pointer: String = json_pointer::format(pointer, "additionalProperties");
            let value: String =
                self.resolve_type(values, &format!("{context}Value"), scope, &values_pointer)?;
            return Ok(format!("map[string]{value}"));
        }
        if schema.r#type.is_some() {
            Ok(format!("map[string]{EMPTY_INTERFACE}"))
        } else {
            Ok(EMPTY_INTERFACE.to_string())
        }
    }
}

/// Merge properties and `required` of `schema`, its `$ref` target and its
/// `allOf` members. The first definition of a property wins; `$ref` cycles are
/// followed once.
fn collect_members<'s>(
    schema: &'s JsonSchema,
    scope: &Scope<'s>,
    pointer: &str,
    members: &mut Members<'s>,
) -> Result<(), JsonSchemaGenError> {
    let properties_pointer: String = json_pointer::format(pointer, "properties");
    for (key, property) in schema.properties.iter().flatten() {
        members
            .properties
            .entry(key.as_str())
            .or_insert_with(|| (property, json_pointer::format(&properties_pointer, key)));
    }
    members
        .required
        .extend(schema.required.iter().flatten().map(String::as_str));

    if let Some(reference) = &schema.reference {
        let (target_pointer, target) = scope.lookup(reference, pointer)?;
        if members.visited_refs.insert(target_pointer.to_string()) {
            collect_members(target.schema, scope, target_pointer, members)?;
        }
    }
    let all_of_pointer: String = json_pointer::format(pointer, "allOf");
    for (index, member) in schema.all_of.iter().flatten().enumerate() {
        let member_pointer: String = json_pointer::format(&all_of_pointer, &index.to_string());
        collect_members(member, scope, &member_pointer, members)?;
    }
    Ok(())
}

fn has_members(schema: &JsonSchema) -> bool {
    schema.properties.is_some() || schema.all_of.as_ref().is_some_and(|m| !m.is_empty())
}

/// Convert a property key or title to an exported Go identifier
/// (`UpperCamelCase`). Characters Go does not allow in identifiers are
/// dropped; a leading digit gets an `X` prefix.
fn go_name(s: &str) -> String {
    let camel: String = s
        .to_upper_camel_case()
        .chars()
        .filter(|&c| gofmt::is_letter(c) || gofmt::is_digit(c))
        .collect();
    if camel.starts_with(gofmt::is_digit) {
        format!("X{camel}")
    } else {
        camel
    }
}

/// Type name from a non-blank title, else from `fallback`.
fn type_name(title: Option<&str>, fallback: &str) -> String {
    let from_title: String = title.map(go_name).unwrap_or_default();
    if !from_title.is_empty() {
        return from_title;
    }
    let from_fallback: String = go_name(fallback);
    if from_fallback.is_empty() {
        ROOT_NAME.to_string()
    } else {
        from_fallback
    }
}

fn field_name(key: &str) -> String {
    let name: String = go_name(key);
    if name.is_empty() {
        FALLBACK_FIELD_NAME.to_string()
    } else {
        name
    }
}

fn unique_field_name(s: &Struct, base: &str) -> String {
    if !s.fields.contains_key(base) {
        return base.to_string();
    }
    let mut suffix: usize = 1;
    loop {
        let candidate: String = format!("{base}{suffix}");
        if !s.fields.contains_key(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Trim a description; empty or whitespace-only becomes `None`.
fn normalize_description(description: Option<&str>) -> Option<String> {
    description.and_then(|d| {
        let trimmed: &str = d.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    fn build(schema_json: &str) -> TypeModel {
        let document = SchemaDocument {
            source_name: "schema.json".to_string(),
            schema: parse_schema("schema.json", schema_json).expect("schema should parse"),
        };
        build_model(&[document]).expect("model should build")
    }

    fn build_err(schema_json: &str) -> JsonSchemaGenError {
        let document = SchemaDocument {
            source_name: "schema.json".to_string(),
            schema: parse_schema("schema.json", schema_json).expect("schema should parse"),
        };
        build_model(&[document]).expect_err("model should not build")
    }

    fn field<'m>(model: &'m TypeModel, struct_name: &str, field_name: &str) -> &'m Field {
        &model.structs[struct_name].fields[field_name]
    }

    #[test]
    fn go_name_camel_cases_keys() {
        assert_eq!("FooBarBaz", go_name("foo-bar_baz"));
        assert_eq!("TheWidgetSchema", go_name("The Widget Schema"));
        assert_eq!("Id", go_name("id"));
    }

    #[test]
    fn go_name_prefixes_leading_digit() {
        assert_eq!("X1stPlace", go_name("1st-place"));
    }

    #[test]
    fn blank_names_fall_back() {
        assert_eq!("Field", field_name("$$"));
        assert_eq!("Root", type_name(Some("  "), ""));
        assert_eq!("Record", type_name(Some("  "), "record"));
    }

    #[test]
    fn root_struct_from_title_with_required_and_optional_fields() {
        let model = build(
            r#"{
                "title": "Foo",
                "type": "object",
                "description": "A foo.",
                "required": ["id"],
                "properties": {
                    "id": { "type": "integer" },
                    "name": { "type": "string", "description": "  Display name.  " }
                }
            }"#,
        );

        let foo: &Struct = &model.structs["Foo"];
        assert_eq!(Some("A foo."), foo.description.as_deref());
        assert_eq!(
            &Field {
                name: "Id".to_string(),
                json_name: "id".to_string(),
                r#type: "int".to_string(),
                required: true,
                description: None,
            },
            field(&model, "Foo", "Id")
        );
        let name: &Field = field(&model, "Foo", "Name");
        assert!(!name.required);
        assert_eq!("string", name.r#type);
        assert_eq!(Some("Display name."), name.description.as_deref());
        assert!(model.aliases.is_empty());
    }

    #[test]
    fn untitled_root_is_named_root() {
        let model = build(r#"{ "type": "object", "properties": { "a": { "type": "boolean" } } }"#);
        assert_eq!("bool", field(&model, "Root", "A").r#type);
    }

    #[test]
    fn primitive_mapping() {
        let model = build(
            r#"{
                "type": "object",
                "properties": {
                    "b": { "type": "boolean" },
                    "i": { "type": "integer" },
                    "n": { "type": "number" },
                    "s": { "type": "string" },
                    "z": { "type": "null" },
                    "nullable": { "type": ["string", "null"] },
                    "either": { "type": ["string", "integer"] },
                    "untyped": {}
                }
            }"#,
        );
        let types: Vec<(&str, &str)> = ["B", "I", "N", "S", "Z", "Nullable", "Either", "Untyped"]
            .iter()
            .map(|name| (*name, field(&model, "Root", name).r#type.as_str()))
            .collect();
        assert_eq!(
            vec![
                ("B", "bool"),
                ("I", "int"),
                ("N", "float64"),
                ("S", "string"),
                ("Z", "interface{}"),
                ("Nullable", "string"),
                ("Either", "interface{}"),
                ("Untyped", "interface{}"),
            ],
            types
        );
    }

    #[test]
    fn arrays_and_maps() {
        let model = build(
            r#"{
                "type": "object",
                "properties": {
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "any": { "type": "array" },
                    "tuple": { "type": "array", "items": [{ "type": "string" }] },
                    "counts": { "type": "object", "additionalProperties": { "type": "integer" } },
                    "free": { "type": "object" }
                }
            }"#,
        );
        assert_eq!("[]string", field(&model, "Root", "Tags").r#type);
        assert_eq!("[]interface{}", field(&model, "Root", "Any").r#type);
        assert_eq!("[]interface{}", field(&model, "Root", "Tuple").r#type);
        assert_eq!("map[string]int", field(&model, "Root", "Counts").r#type);
        assert_eq!("map[string]interface{}", field(&model, "Root", "Free").r#type);
    }

    #[test]
    fn nested_objects_become_pointer_structs() {
        let model = build(
            r#"{
                "title": "Person",
                "type": "object",
                "properties": {
                    "address": {
                        "type": "object",
                        "properties": { "city": { "type": "string" } }
                    },
                    "pets": {
                        "type": "array",
                        "items": { "type": "object", "title": "Pet", "properties": { "name": { "type": "string" } } }
                    }
                }
            }"#,
        );
        assert_eq!("*PersonAddress", field(&model, "Person", "Address").r#type);
        assert_eq!("string", field(&model, "PersonAddress", "City").r#type);
        assert_eq!("[]*Pet", field(&model, "Person", "Pets").r#type);
        assert!(model.structs.contains_key("Pet"));
    }

    #[test]
    fn definitions_and_refs() {
        let model = build(
            r##"{
                "title": "Order",
                "type": "object",
                "properties": {
                    "shipTo": { "$ref": "#/definitions/address" },
                    "status": { "$ref": "#/$defs/status" },
                    "parent": { "$ref": "#" }
                },
                "definitions": {
                    "address": { "type": "object", "properties": { "street": { "type": "string" } } }
                },
                "$defs": {
                    "status": { "type": "string" }
                }
            }"##,
        );
        assert_eq!("*Address", field(&model, "Order", "ShipTo").r#type);
        assert_eq!("Status", field(&model, "Order", "Status").r#type);
        assert_eq!("*Order", field(&model, "Order", "Parent").r#type);
        assert_eq!(
            Some(&Alias {
                name: "Status".to_string(),
                r#type: "string".to_string(),
            }),
            model.aliases.get("Status")
        );
        assert!(model.structs.contains_key("Address"));
    }

    #[test]
    fn empty_object_definition_is_an_empty_struct() {
        let model = build(r#"{ "definitions": { "marker": { "type": "object" } } }"#);
        assert!(model.structs["Marker"].fields.is_empty());
        assert_eq!(1, model.structs.len(), "definitions-only root is not emitted");
    }

    #[test]
    fn array_root_is_an_alias() {
        let model = build(r#"{ "title": "Names", "type": "array", "items": { "type": "string" } }"#);
        assert_eq!("[]string", model.aliases["Names"].r#type);
    }

    #[test]
    fn all_of_is_flattened() {
        let model = build(
            r##"{
                "title": "Employee",
                "allOf": [
                    { "$ref": "#/definitions/person" },
                    { "type": "object", "required": ["badge"], "properties": { "badge": { "type": "integer" } } }
                ],
                "definitions": {
                    "person": {
                        "type": "object",
                        "required": ["name"],
                        "properties": { "name": { "type": "string" } }
                    }
                }
            }"##,
        );
        let employee: &Struct = &model.structs["Employee"];
        assert_eq!(2, employee.fields.len());
        assert!(employee.fields["Name"].required);
        assert!(employee.fields["Badge"].required);
    }

    #[test]
    fn all_of_ref_cycle_terminates() {
        let model = build(
            r##"{
                "definitions": {
                    "a": { "allOf": [{ "$ref": "#/definitions/b" }], "properties": { "x": { "type": "string" } } },
                    "b": { "allOf": [{ "$ref": "#/definitions/a" }], "properties": { "y": { "type": "string" } } }
                }
            }"##,
        );
        assert_eq!(2, model.structs["A"].fields.len());
        assert_eq!(2, model.structs["B"].fields.len());
    }

    #[test]
    fn all_of_back_to_root_reuses_the_inline_struct() {
        let model = build(
            r##"{
                "title": "Node",
                "type": "object",
                "properties": { "child": { "allOf": [{ "$ref": "#" }] } }
            }"##,
        );
        assert_eq!("*NodeChild", field(&model, "Node", "Child").r#type);
        assert_eq!("*NodeChild", field(&model, "NodeChild", "Child").r#type);
        assert_eq!(2, model.structs.len());
    }

    #[test]
    fn all_of_back_to_own_definition_terminates() {
        let model = build(
            r##"{
                "definitions": {
                    "tree": {
                        "type": "object",
                        "properties": {
                            "children": {
                                "type": "array",
                                "items": { "allOf": [{ "$ref": "#/definitions/tree" }] }
                            }
                        }
                    }
                }
            }"##,
        );
        assert_eq!("[]*TreeChildrenItems", field(&model, "Tree", "Children").r#type);
        assert_eq!(
            "[]*TreeChildrenItems",
            field(&model, "TreeChildrenItems", "Children").r#type
        );
    }

    #[test]
    fn names_drop_characters_go_rejects() {
        assert_eq!("X", go_name("x\u{b2}"));
        assert_eq!("Field", field_name("\u{2167}"));
        assert_eq!("X\u{663}", go_name("x\u{663}"));

        let model = build(r#"{ "type": "object", "properties": { "x\u00b2": { "type": "string" } } }"#);
        let x = field(&model, "Root", "X");
        assert_eq!("x\u{b2}", x.json_name);
    }

    #[test]
    fn any_of_and_one_of_are_empty_interfaces() {
        let model = build(
            r#"{
                "type": "object",
                "properties": {
                    "a": { "anyOf": [{ "type": "string" }, { "type": "integer" }] },
                    "o": { "oneOf": [{ "type": "string" }] }
                }
            }"#,
        );
        assert_eq!("interface{}", field(&model, "Root", "A").r#type);
        assert_eq!("interface{}", field(&model, "Root", "O").r#type);
    }

    #[test]
    fn colliding_field_names_get_suffixes() {
        let model = build(
            r#"{
                "type": "object",
                "properties": {
                    "foo-bar": { "type": "string" },
                    "foo_bar": { "type": "integer" }
                }
            }"#,
        );
        assert_eq!("foo-bar", field(&model, "Root", "FooBar").json_name);
        assert_eq!("foo_bar", field(&model, "Root", "FooBar1").json_name);
    }

    #[test]
    fn colliding_type_names_get_suffixes_across_documents() {
        let documents: Vec<SchemaDocument> = ["a.json", "b.json"]
            .iter()
            .map(|source_name| SchemaDocument {
                source_name: (*source_name).to_string(),
                schema: parse_schema(source_name, r#"{ "title": "Item", "type": "object" }"#)
                    .expect("parse"),
            })
            .collect();
        let model: TypeModel = build_model(&documents).expect("build");
        let mut names: Vec<&str> = model.structs.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(vec!["Item", "Item1"], names);
    }

    #[test]
    fn unresolved_ref_is_reported_with_pointer() {
        let error = build_err(
            r##"{ "type": "object", "properties": { "x": { "$ref": "#/definitions/missing" } } }"##,
        );
        assert_eq!(
            "unresolved $ref '#/definitions/missing' at '#/properties/x' in schema.json",
            error.to_string()
        );
    }

    #[test]
    fn external_ref_is_rejected() {
        let error = build_err(
            r#"{ "type": "object", "properties": { "x": { "$ref": "other.json#/definitions/a" } } }"#,
        );
        assert!(matches!(error, JsonSchemaGenError::UnsupportedSchema { .. }));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let error = build_err(r#"{ "type": "object", "properties": { "x": { "type": "date" } } }"#);
        assert_eq!(
            "unsupported type 'date' at '#/properties/x/type' in schema.json",
            error.to_string()
        );
    }

    #[test]
    fn empty_property_key_is_rejected() {
        let error = build_err(r#"{ "type": "object", "properties": { "": { "type": "string" } } }"#);
        assert!(matches!(
            error,
            JsonSchemaGenError::UnsupportedSchema { ref pointer, .. } if pointer == "#/properties/"
        ));
    }
}
