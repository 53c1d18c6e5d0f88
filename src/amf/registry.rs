//! Type registry
//!
//! Maps a wire class name to a host record shape so typed objects decode
//! into a known field layout instead of whatever property order the peer
//! sent. Wire property names typically start lowercase while host field
//! names start uppercase, so lookup uppercases the first character.

use std::collections::HashMap;
use std::rc::Rc;

use crate::amf::value::{AvmObject, ClassDef, Value};

/// A host record shape: an ordered list of field names.
///
/// Field names are given in host form (uppercase first character).
#[derive(Debug, Clone, Default)]
pub struct TypeShape {
    fields: Vec<String>,
}

impl TypeShape {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a field; builder-style
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    /// Build from a list of field names
    pub fn with_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: names.into_iter().map(|n| n.into()).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

struct RegisteredType {
    class: Rc<ClassDef>,
    positions: HashMap<String, usize>,
}

/// Registry of class-name → record-shape mappings
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<String, RegisteredType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Register a shape for a wire class name
    pub fn register(&mut self, class_name: impl Into<String>, shape: TypeShape) {
        let class_name = class_name.into();
        let positions = shape
            .fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let class = Rc::new(ClassDef {
            name: class_name.clone(),
            externalizable: false,
            dynamic: false,
            properties: shape.fields,
        });
        self.types.insert(class_name, RegisteredType { class, positions });
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.types.contains_key(class_name)
    }

    /// Project a freshly decoded object into its registered shape.
    ///
    /// Static values are re-ordered to the shape's field positions by
    /// matching the wire property names (first character uppercased).
    /// Shape fields absent from the wire stay default-initialized; wire
    /// fields absent from the shape are dropped with a warning. No-op if
    /// the class name is not registered.
    pub fn project(&self, object: &mut AvmObject) {
        let registered = match self.types.get(&object.class.name) {
            Some(r) => r,
            None => return,
        };

        let mut projected = vec![Value::Null; registered.class.properties.len()];
        for (i, wire_name) in object.class.properties.iter().enumerate() {
            let host_name = uppercase_first(wire_name);
            match registered.positions.get(&host_name) {
                Some(&pos) => {
                    if let Some(value) = object.static_fields.get(i) {
                        projected[pos] = value.clone();
                    }
                }
                None => {
                    tracing::warn!(
                        class = %object.class.name,
                        field = %wire_name,
                        "dropping wire field not present in registered shape"
                    );
                }
            }
        }

        object.class = Rc::clone(&registered.class);
        object.static_fields = projected;
    }
}

/// Uppercase the first character of a property name
pub(crate) fn uppercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
