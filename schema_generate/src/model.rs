//! The Go type model rendered by the emitter.
//!
//! Collections are plain `HashMap`s; rendering order comes from
//! [`crate::ordering`], never from the maps themselves.

use std::collections::HashMap;

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Go identifier.
    pub name: String,
    /// Property key in the schema, used for the `json` struct tag.
    pub json_name: String,
    /// Go type expression.
    pub r#type: String,
    pub required: bool,
    pub description: Option<String>,
}

/// An object-like schema definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub name: String,
    /// May span several lines.
    pub description: Option<String>,
    /// Keyed by field name.
    pub fields: HashMap<String, Field>,
}

impl Struct {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: HashMap::new(),
        }
    }

    /// Insert `field` under its own name.
    pub fn insert_field(&mut self, field: Field) {
        self.fields.insert(field.name.clone(), field);
    }
}

/// A named synonym for another type, e.g. `type Tags []string`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub r#type: String,
}

/// Everything one generation run renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeModel {
    pub structs: HashMap<String, Struct>,
    pub aliases: HashMap<String, Alias>,
}

impl TypeModel {
    /// Insert `s` under its own name.
    pub fn insert_struct(&mut self, s: Struct) {
        self.structs.insert(s.name.clone(), s);
    }

    /// Insert `alias` under its own name.
    pub fn insert_alias(&mut self, alias: Alias) {
        self.aliases.insert(alias.name.clone(), alias);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.structs.is_empty() && self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_fields_are_keyed_by_name() {
        let mut s = Struct::new("Foo");
        s.insert_field(Field {
            name: "Id".to_string(),
            json_name: "id".to_string(),
            r#type: "int".to_string(),
            required: true,
            description: None,
        });
        assert_eq!(Some("id"), s.fields.get("Id").map(|f| f.json_name.as_str()));
    }

    #[test]
    fn model_is_empty_until_a_type_is_added() {
        let mut model = TypeModel::default();
        assert!(model.is_empty());
        model.insert_alias(Alias {
            name: "Tags".to_string(),
            r#type: "[]string".to_string(),
        });
        assert!(!model.is_empty());
        assert!(model.aliases.contains_key("Tags"));
    }
}
