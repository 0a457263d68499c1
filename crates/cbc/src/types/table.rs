//! Interning table for type descriptors

use super::{StructMember, TypeDescriptor, TypeId};
use crate::ast::ConstValue;
use crate::common::Position;
use std::collections::HashMap;
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Built-in primitives and their byte sizes
pub const BUILTIN_PRIMITIVES: &[(&str, u32)] = &[
    ("int", 4),
    ("i8", 1),
    ("i16", 2),
    ("i32", 4),
    ("i64", 8),
    ("u8", 1),
    ("u16", 2),
    ("u32", 4),
    ("u64", 8),
    ("float", 4),
    ("double", 8),
    ("bool", 1),
    ("string", 8),
    ("dump", 0),
    ("void", 0),
    ("type", 0),
    ("scope", 0),
    ("generic_fn", 0),
];

const INTEGER_PRIMITIVES: &[&str] = &["int", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64"];
const FLOAT_PRIMITIVES: &[&str] = &["float", "double"];

/// Handles of the primitives the resolver refers to directly
#[derive(Debug, Clone, Copy)]
pub struct Builtins {
    pub int: TypeId,
    pub float: TypeId,
    pub bool: TypeId,
    pub string: TypeId,
    pub void: TypeId,
    pub type_: TypeId,
    pub scope: TypeId,
    pub generic_fn: TypeId,
}

/// Owns every type descriptor of a session.
///
/// Descriptors are keyed by their mangled name, so structurally equal
/// function, array and list types collapse onto one [`TypeId`]. Struct and
/// placeholder keys embed a serial, which keeps them distinct.
#[derive(Debug)]
pub struct TypeTable {
    keys: DefaultStringInterner,
    by_key: HashMap<DefaultSymbol, TypeId>,
    entries: Vec<(DefaultSymbol, TypeDescriptor)>,
    struct_names: HashMap<TypeId, String>,
    next_struct: u32,
    next_placeholder: u32,
    builtins: Builtins,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = Self {
            keys: DefaultStringInterner::default(),
            by_key: HashMap::new(),
            entries: Vec::new(),
            struct_names: HashMap::new(),
            next_struct: 0,
            next_placeholder: 0,
            builtins: Builtins {
                int: TypeId(0),
                float: TypeId(0),
                bool: TypeId(0),
                string: TypeId(0),
                void: TypeId(0),
                type_: TypeId(0),
                scope: TypeId(0),
                generic_fn: TypeId(0),
            },
        };

        let mut ids = HashMap::new();
        for (name, size) in BUILTIN_PRIMITIVES {
            let id = table.intern(TypeDescriptor::Primitive {
                name: (*name).to_string(),
                size: *size,
            });
            ids.insert(*name, id);
        }
        let get = |name: &str| ids.get(name).copied().unwrap_or(TypeId(0));
        table.builtins = Builtins {
            int: get("int"),
            float: get("float"),
            bool: get("bool"),
            string: get("string"),
            void: get("void"),
            type_: get("type"),
            scope: get("scope"),
            generic_fn: get("generic_fn"),
        };
        table
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Intern a descriptor, returning the existing handle for an equal key
    pub fn intern(&mut self, descriptor: TypeDescriptor) -> TypeId {
        let key = self.key_of(&descriptor);
        let symbol = self.keys.get_or_intern(&key);
        if let Some(id) = self.by_key.get(&symbol) {
            return *id;
        }
        let id = TypeId(self.entries.len());
        self.entries.push((symbol, descriptor));
        self.by_key.insert(symbol, id);
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.entries[id.0].1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Interning key, e.g. `fn(int,int)->(int)`
    pub fn mangled(&self, id: TypeId) -> &str {
        self.keys.resolve(self.entries[id.0].0).unwrap_or("")
    }

    pub fn primitive(&self, name: &str) -> Option<TypeId> {
        let symbol = self.keys.get(name)?;
        let id = *self.by_key.get(&symbol)?;
        matches!(self.get(id), TypeDescriptor::Primitive { .. }).then_some(id)
    }

    pub fn function(&mut self, inputs: Vec<TypeId>, outputs: Vec<TypeId>) -> TypeId {
        self.intern(TypeDescriptor::Function { inputs, outputs })
    }

    pub fn array(&mut self, element: TypeId, size: Option<u64>) -> TypeId {
        self.intern(TypeDescriptor::Array { element, size })
    }

    pub fn type_list(&mut self, items: Vec<TypeId>) -> TypeId {
        self.intern(TypeDescriptor::TypeList(items))
    }

    /// Fresh placeholder for a type name that still needs lookup
    pub fn placeholder(
        &mut self,
        name: impl Into<String>,
        position: Position,
        deciding: bool,
    ) -> TypeId {
        self.intern(TypeDescriptor::Unresolved {
            name: name.into(),
            position,
            deciding,
        })
    }

    pub fn new_struct(&mut self, members: Vec<StructMember>) -> TypeId {
        let serial = self.next_struct;
        self.next_struct += 1;
        self.intern(TypeDescriptor::Struct { serial, members })
    }

    /// Remember a declared name for a struct, used in messages. First name wins.
    pub fn name_struct(&mut self, id: TypeId, name: &str) {
        if matches!(self.get(id), TypeDescriptor::Struct { .. }) {
            self.struct_names.entry(id).or_insert_with(|| name.to_string());
        }
    }

    /// True when no placeholder is reachable from `id`
    pub fn is_resolved(&self, id: TypeId) -> bool {
        match self.get(id) {
            TypeDescriptor::Primitive { .. } => true,
            TypeDescriptor::Unresolved { .. } => false,
            TypeDescriptor::Function { inputs, outputs } => {
                inputs.iter().chain(outputs).all(|t| self.is_resolved(*t))
            }
            TypeDescriptor::Struct { members, .. } => {
                members.iter().all(|m| self.is_resolved(m.ty))
            }
            TypeDescriptor::Array { element, .. } => self.is_resolved(*element),
            TypeDescriptor::TypeList(items) => items.iter().all(|t| self.is_resolved(*t)),
        }
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            TypeDescriptor::Primitive { name, .. } if INTEGER_PRIMITIVES.contains(&name.as_str())
        )
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            TypeDescriptor::Primitive { name, .. } if FLOAT_PRIMITIVES.contains(&name.as_str())
        )
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.is_integer(id) || self.is_float(id)
    }

    /// Value an explicitly typed declaration without initializer receives
    pub fn default_value(&self, id: TypeId) -> ConstValue {
        if self.is_integer(id) {
            ConstValue::Int(0)
        } else if self.is_float(id) {
            ConstValue::Float(0.0)
        } else if id == self.builtins.bool {
            ConstValue::Bool(false)
        } else if id == self.builtins.string {
            ConstValue::Str(String::new())
        } else {
            ConstValue::Default(id)
        }
    }

    /// Flatten a multi-value type into its parts; `void` has none
    pub fn expand(&self, id: TypeId) -> Vec<TypeId> {
        match self.get(id) {
            TypeDescriptor::TypeList(items) => items.clone(),
            _ if id == self.builtins.void => Vec::new(),
            _ => vec![id],
        }
    }

    /// Human readable name for messages
    pub fn display(&self, id: TypeId) -> String {
        match self.get(id) {
            TypeDescriptor::Primitive { name, .. } => name.clone(),
            TypeDescriptor::Function { inputs, outputs } => {
                let mut out = format!("fn({})", self.display_list(inputs));
                match outputs.len() {
                    0 => {}
                    1 => out.push_str(&format!(" -> {}", self.display(outputs[0]))),
                    _ => out.push_str(&format!(" -> ({})", self.display_list(outputs))),
                }
                out
            }
            TypeDescriptor::Struct { members, .. } => match self.struct_names.get(&id) {
                Some(name) => name.clone(),
                None => {
                    let fields: Vec<String> = members
                        .iter()
                        .map(|m| format!("{}: {}", m.name, self.display(m.ty)))
                        .collect();
                    format!("struct{{{}}}", fields.join(", "))
                }
            },
            TypeDescriptor::Array { element, size } => match size {
                Some(n) => format!("{}[{}]", self.display(*element), n),
                None => format!("{}[..]", self.display(*element)),
            },
            TypeDescriptor::Unresolved { name, deciding, .. } => {
                if *deciding {
                    format!("${}", name)
                } else {
                    name.clone()
                }
            }
            TypeDescriptor::TypeList(items) => format!("({})", self.display_list(items)),
        }
    }

    fn display_list(&self, items: &[TypeId]) -> String {
        items.iter().map(|t| self.display(*t)).collect::<Vec<_>>().join(", ")
    }

    fn key_of(&mut self, descriptor: &TypeDescriptor) -> String {
        match descriptor {
            TypeDescriptor::Primitive { name, .. } => name.clone(),
            TypeDescriptor::Function { inputs, outputs } => {
                let mut key = "fn".to_string();
                if !inputs.is_empty() {
                    key.push_str(&format!("({})", self.key_list(inputs)));
                }
                if !outputs.is_empty() {
                    key.push_str(&format!("->({})", self.key_list(outputs)));
                }
                key
            }
            TypeDescriptor::Struct { serial, members } => {
                if members.iter().all(|m| self.is_resolved(m.ty)) {
                    format!("struct#{}", serial)
                } else {
                    format!("struct?{}", serial)
                }
            }
            TypeDescriptor::Array { element, size } => match size {
                Some(n) => format!("{}[{}]", self.mangled(*element), n),
                None => format!("{}[..]", self.mangled(*element)),
            },
            TypeDescriptor::Unresolved { name, .. } => {
                self.next_placeholder += 1;
                format!("?{}#{}", name, self.next_placeholder)
            }
            TypeDescriptor::TypeList(items) => format!("type_list{{{}}}", self.key_list(items)),
        }
    }

    fn key_list(&self, items: &[TypeId]) -> String {
        items.iter().map(|t| self.mangled(*t)).collect::<Vec<_>>().join(",")
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtins_registered() {
        let table = TypeTable::new();
        let int = table.primitive("int").unwrap();
        assert_eq!(int, table.builtins().int);
        assert!(matches!(table.get(int), TypeDescriptor::Primitive { size: 4, .. }));
        assert!(matches!(
            table.get(table.primitive("double").unwrap()),
            TypeDescriptor::Primitive { size: 8, .. }
        ));
        assert!(table.primitive("nope").is_none());
    }

    #[test]
    fn test_function_types_are_structural() {
        let mut table = TypeTable::new();
        let int = table.builtins().int;
        let a = table.function(vec![int, int], vec![int]);
        let b = table.function(vec![int, int], vec![int]);
        let c = table.function(vec![int], vec![int]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.mangled(a), "fn(int,int)->(int)");
        assert_eq!(table.display(a), "fn(int, int) -> int");
    }

    #[test]
    fn test_function_mangling_without_parts() {
        let mut table = TypeTable::new();
        let int = table.builtins().int;
        let nothing = table.function(vec![], vec![]);
        let only_out = table.function(vec![], vec![int, int]);
        assert_eq!(table.mangled(nothing), "fn");
        assert_eq!(table.mangled(only_out), "fn->(int,int)");
    }

    #[test]
    fn test_structs_are_nominal() {
        let mut table = TypeTable::new();
        let int = table.builtins().int;
        let member = |name: &str| StructMember {
            name: name.to_string(),
            position: Position::builtin(),
            ty: int,
            default: None,
            merged: false,
        };
        let a = table.new_struct(vec![member("x")]);
        let b = table.new_struct(vec![member("x")]);
        assert_ne!(a, b);

        table.name_struct(a, "Point");
        assert_eq!(table.display(a), "Point");
        assert_eq!(table.display(b), "struct{x: int}");
    }

    #[test]
    fn test_arrays_and_placeholders() {
        let mut table = TypeTable::new();
        let int = table.builtins().int;
        let fixed = table.array(int, Some(4));
        let dynamic = table.array(int, None);
        assert_eq!(table.mangled(fixed), "int[4]");
        assert_eq!(table.mangled(dynamic), "int[..]");
        assert_eq!(fixed, table.array(int, Some(4)));

        let p1 = table.placeholder("T", Position::builtin(), true);
        let p2 = table.placeholder("T", Position::builtin(), true);
        assert_ne!(p1, p2);
        assert!(!table.is_resolved(p1));
        let list = table.array(p1, None);
        assert!(!table.is_resolved(list));
    }

    #[test]
    fn test_default_values() {
        let table = TypeTable::new();
        let b = *table.builtins();
        assert_eq!(table.default_value(b.int), ConstValue::Int(0));
        assert_eq!(table.default_value(b.float), ConstValue::Float(0.0));
        assert_eq!(table.default_value(b.bool), ConstValue::Bool(false));
        assert_eq!(table.default_value(b.string), ConstValue::Str(String::new()));
    }

    #[test]
    fn test_expand_lists() {
        let mut table = TypeTable::new();
        let b = *table.builtins();
        let list = table.type_list(vec![b.int, b.float]);
        assert_eq!(table.expand(list), vec![b.int, b.float]);
        assert_eq!(table.expand(b.void), Vec::<TypeId>::new());
        assert_eq!(table.expand(b.int), vec![b.int]);
    }
}
