//! AMF value types
//!
//! Both dialects share one in-memory value representation. Containers are
//! reference-counted so the decoder can enter a placeholder into the object
//! table before decoding contents; a value that refers back to its container
//! resolves to the same allocation, which is what makes cyclic graphs work.
//! Value trees are single-threaded, like the decoder that produces them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a typed object
pub type ObjectRef = Rc<RefCell<AvmObject>>;
/// Shared handle to an array
pub type ArrayRef = Rc<RefCell<AvmArray>>;
/// Shared handle to an anonymous object
pub type MapRef = Rc<RefCell<HashMap<String, Value>>>;

/// Unified AMF value representation
#[derive(Debug, Clone)]
pub enum Value {
    /// Null (AMF0: 0x05, AMF3: 0x01)
    Null,

    /// Undefined (AMF0: 0x06, AMF3: 0x00) - distinct from Null on the wire
    Undefined,

    /// Boolean (AMF0: 0x01, AMF3: 0x02/0x03)
    Boolean(bool),

    /// 29-bit unsigned integer, widened to 32 bits (AMF3 only: 0x04)
    Integer(u32),

    /// IEEE 754 double-precision floating point (AMF0: 0x00, AMF3: 0x05)
    Double(f64),

    /// UTF-8 string (AMF0: 0x02, AMF3: 0x06)
    String(String),

    /// Array with a dense portion and an optional associative portion;
    /// dense iff the associative map is empty (AMF3: 0x09)
    Array(ArrayRef),

    /// Anonymous object: plain string-keyed map (AMF0: 0x03, or AMF3
    /// object whose traits carry an empty class name)
    Object(MapRef),

    /// Typed object: class traits plus positional static fields and a
    /// dynamic map (AMF3: 0x0A with a non-empty class name)
    Typed(ObjectRef),
}

/// A class definition shipped on the wire.
///
/// Traits have reference identity within a bundle: two identical
/// definitions appearing twice inline become two table entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub externalizable: bool,
    pub dynamic: bool,
    /// Ordered static property names; the count on the wire equals this length
    pub properties: Vec<String>,
}

impl ClassDef {
    /// An anonymous dynamic class with no static properties
    pub fn anonymous() -> Self {
        Self {
            name: String::new(),
            externalizable: false,
            dynamic: true,
            properties: Vec::new(),
        }
    }
}

/// A typed object: static fields positionally match the class properties
#[derive(Debug)]
pub struct AvmObject {
    pub class: Rc<ClassDef>,
    pub static_fields: Vec<Value>,
    pub dynamic_fields: HashMap<String, Value>,
}

impl AvmObject {
    /// Fresh object for the given class, fields not yet decoded
    pub fn new(class: Rc<ClassDef>) -> Self {
        Self {
            class,
            static_fields: Vec::new(),
            dynamic_fields: HashMap::new(),
        }
    }

    /// Look up a static field by its property name
    pub fn static_field(&self, name: &str) -> Option<&Value> {
        let index = self.class.properties.iter().position(|p| p == name)?;
        self.static_fields.get(index)
    }
}

/// An array in AVM land: a dense sequence plus string-keyed fields
#[derive(Debug, Default)]
pub struct AvmArray {
    pub elements: Vec<Value>,
    pub fields: HashMap<String, Value>,
}

impl AvmArray {
    /// Dense iff there are no associative entries
    pub fn is_dense(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Value {
    /// Build a dense array value
    pub fn dense_array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(AvmArray {
            elements,
            fields: HashMap::new(),
        })))
    }

    /// Build an anonymous object value
    pub fn object(fields: HashMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(fields)))
    }

    /// Try to get this value as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            Value::Integer(i) => Some(f64::from(*i)),
            _ => None,
        }
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    /// Get a named property from an anonymous or typed object
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.borrow().get(key).cloned(),
            Value::Typed(obj) => {
                let obj = obj.borrow();
                obj.static_field(key)
                    .or_else(|| obj.dynamic_fields.get(key))
                    .cloned()
            }
            Value::Array(arr) => arr.borrow().fields.get(key).cloned(),
            _ => None,
        }
    }

    /// Get a string property from an object value
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)?.as_str().map(|s| s.to_string())
    }

    /// Get a number property from an object value
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_number()
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(v: Vec<V>) -> Self {
        Value::dense_array(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<V: Into<Value>> From<HashMap<String, V>> for Value {
    fn from(v: HashMap<String, V>) -> Self {
        Value::object(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut visited = Vec::new();
        eq_values(self, other, &mut visited)
    }
}

// Structural comparison over possibly-cyclic graphs. A container pair
// already on the in-progress stack is taken as equal; the recursion
// terminates because every revisit hits the stack.
fn eq_values(a: &Value, b: &Value, visited: &mut Vec<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Undefined, Value::Undefined) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        // Bit-exact: zero signs and NaNs stay distinct.
        (Value::Double(x), Value::Double(y)) => x.to_bits() == y.to_bits(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            let pair = (Rc::as_ptr(x) as usize, Rc::as_ptr(y) as usize);
            if Rc::ptr_eq(x, y) || visited.contains(&pair) {
                return true;
            }
            visited.push(pair);
            let x = x.borrow();
            let y = y.borrow();
            x.elements.len() == y.elements.len()
                && eq_maps(&x.fields, &y.fields, visited)
                && x.elements
                    .iter()
                    .zip(y.elements.iter())
                    .all(|(xe, ye)| eq_values(xe, ye, visited))
        }
        (Value::Object(x), Value::Object(y)) => {
            let pair = (Rc::as_ptr(x) as usize, Rc::as_ptr(y) as usize);
            if Rc::ptr_eq(x, y) || visited.contains(&pair) {
                return true;
            }
            visited.push(pair);
            eq_maps(&x.borrow(), &y.borrow(), visited)
        }
        (Value::Typed(x), Value::Typed(y)) => {
            let pair = (Rc::as_ptr(x) as usize, Rc::as_ptr(y) as usize);
            if Rc::ptr_eq(x, y) || visited.contains(&pair) {
                return true;
            }
            visited.push(pair);
            let x = x.borrow();
            let y = y.borrow();
            // Typed objects compare by class name, positional statics, and
            // the dynamic map; traits identity is a per-bundle notion only.
            x.class.name == y.class.name
                && x.static_fields.len() == y.static_fields.len()
                && x.static_fields
                    .iter()
                    .zip(y.static_fields.iter())
                    .all(|(xe, ye)| eq_values(xe, ye, visited))
                && eq_maps(&x.dynamic_fields, &y.dynamic_fields, visited)
        }
        _ => false,
    }
}

fn eq_maps(
    a: &HashMap<String, Value>,
    b: &HashMap<String, Value>,
    visited: &mut Vec<(usize, usize)>,
) -> bool {
    a.len() == b.len()
        && a.iter().all(|(k, va)| match b.get(k) {
            Some(vb) => eq_values(va, vb, visited),
            None => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        let s = Value::String("test".into());
        assert_eq!(s.as_str(), Some("test"));
        assert_eq!(s.as_number(), None);

        let n = Value::Double(42.0);
        assert_eq!(n.as_number(), Some(42.0));
        assert_eq!(n.as_str(), None);

        let i = Value::Integer(7);
        assert_eq!(i.as_number(), Some(7.0));

        let mut obj = HashMap::new();
        obj.insert("key".to_string(), Value::String("value".into()));
        let o = Value::object(obj);
        assert_eq!(o.get_string("key"), Some("value".to_string()));
    }

    #[test]
    fn test_from_conversions() {
        let v: Value = "test".into();
        assert!(matches!(v, Value::String(_)));

        let v: Value = 42.0.into();
        assert!(matches!(v, Value::Double(_)));

        let v: Value = 42u32.into();
        assert!(matches!(v, Value::Integer(42)));

        let v: Value = true.into();
        assert!(matches!(v, Value::Boolean(true)));

        let v: Value = vec![1u32, 2, 3].into();
        match &v {
            Value::Array(arr) => {
                let arr = arr.borrow();
                assert!(arr.is_dense());
                assert_eq!(arr.elements.len(), 3);
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Undefined);
        assert_eq!(Value::Integer(3), Value::Integer(3));
        assert_ne!(Value::Integer(3), Value::Double(3.0));

        let a: Value = vec!["x", "y"].into();
        let b: Value = vec!["x", "y"].into();
        let c: Value = vec!["x", "z"].into();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_double_equality_is_bit_exact() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
    }

    #[test]
    fn test_dense_vs_sparse() {
        let dense: Value = vec![1u32, 2].into();
        let sparse = match &dense {
            Value::Array(arr) => {
                let copy = AvmArray {
                    elements: arr.borrow().elements.clone(),
                    fields: [("k".to_string(), Value::Null)].into_iter().collect(),
                };
                Value::Array(Rc::new(RefCell::new(copy)))
            }
            _ => unreachable!(),
        };
        assert_ne!(dense, sparse);
    }

    #[test]
    fn test_cyclic_equality_terminates() {
        let class = Rc::new(ClassDef {
            name: "Node".to_string(),
            externalizable: false,
            dynamic: false,
            properties: vec!["next".to_string()],
        });

        let make_cycle = || {
            let obj = Rc::new(RefCell::new(AvmObject::new(class.clone())));
            let self_ref = Value::Typed(obj.clone());
            obj.borrow_mut().static_fields.push(self_ref);
            Value::Typed(obj)
        };

        let a = make_cycle();
        let b = make_cycle();
        assert!(a == a.clone());
        assert!(a == b);
    }

    #[test]
    fn test_typed_object_field_lookup() {
        let class = Rc::new(ClassDef {
            name: "Point".to_string(),
            externalizable: false,
            dynamic: true,
            properties: vec!["x".to_string(), "y".to_string()],
        });
        let mut obj = AvmObject::new(class);
        obj.static_fields = vec![Value::Integer(1), Value::Integer(2)];
        obj.dynamic_fields
            .insert("label".to_string(), Value::String("origin".into()));
        let v = Value::Typed(Rc::new(RefCell::new(obj)));

        assert_eq!(v.get("x"), Some(Value::Integer(1)));
        assert_eq!(v.get("y"), Some(Value::Integer(2)));
        assert_eq!(v.get_string("label"), Some("origin".to_string()));
        assert_eq!(v.get("missing"), None);
    }
}
