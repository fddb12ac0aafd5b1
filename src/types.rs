use std::collections::HashMap;
use std::fmt::Display;

use crate::prelude::*;

/// A declarable type: what may follow in `<type> name = value`, in a
/// parameter list or as a function's return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    Long,
    Double,
    Boolean,
    String,
    List,
    Function,
    Namespace,
    Void,
    /// Any numeric kind.
    Number,
    /// Any value at all.
    Object,
}

impl TypeTag {
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Long => "long",
            TypeTag::Double => "double",
            TypeTag::Boolean => "boolean",
            TypeTag::String => "string",
            TypeTag::List => "list",
            TypeTag::Function => "func",
            TypeTag::Namespace => "ns",
            TypeTag::Void => "void",
            TypeTag::Number => "number",
            TypeTag::Object => "object",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            TypeTag::Object => true,
            TypeTag::Number => value.as_number().is_some(),
            tag => *tag == value.type_tag(),
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Names that are valid in type position.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, TypeTag>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self { types: HashMap::new() };

        for tag in [
            TypeTag::Int,
            TypeTag::Long,
            TypeTag::Double,
            TypeTag::Boolean,
            TypeTag::String,
            TypeTag::List,
            TypeTag::Function,
            TypeTag::Namespace,
            TypeTag::Void,
            TypeTag::Number,
            TypeTag::Object,
        ] {
            registry.register(tag.name(), tag);
        }
        registry.register("bool", TypeTag::Boolean);

        registry
    }

    pub fn register(&mut self, name: &str, tag: TypeTag) {
        self.types.insert(name.to_owned(), tag);
    }

    pub fn resolve(&self, name: &str) -> Option<TypeTag> {
        self.types.get(name).copied()
    }
}
