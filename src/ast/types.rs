use super::Name;
use crate::lexer::Position;

/// A reference to a type, appearing wherever the grammar admits a type
/// name: field types, parameter types, return types, variable/const types,
/// array element types, set element types, pointer targets and routine
/// signatures. [`TypeExpr::Named`] carries the referenced name's own
/// position, satisfying the "every referenced name has its own position"
/// invariant for type names.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    Named(Name),
    StaticArray {
        element: Box<TypeExpr>,
        low: i64,
        high: i64,
        position: Position,
    },
    DynamicArray {
        element: Box<TypeExpr>,
        position: Position,
    },
    Set {
        element: Box<TypeExpr>,
        position: Position,
    },
    Pointer {
        target: Box<TypeExpr>,
        position: Position,
    },
    Routine {
        params: Vec<TypeExpr>,
        return_type: Option<Box<TypeExpr>>,
        position: Position,
    },
}

impl TypeExpr {
    pub fn position(&self) -> Position {
        match self {
            TypeExpr::Named(name) => name.position,
            TypeExpr::StaticArray { position, .. }
            | TypeExpr::DynamicArray { position, .. }
            | TypeExpr::Set { position, .. }
            | TypeExpr::Pointer { position, .. }
            | TypeExpr::Routine { position, .. } => *position,
        }
    }

    /// The named type this reference ultimately points at, if it is (or
    /// wraps down to) a plain name — used by hover/type-definition to walk
    /// through a single layer of array/set/pointer wrapping is not
    /// attempted here; those compound forms have no single "defining name"
    /// and queries over them report an empty location.
    pub fn as_named(&self) -> Option<&Name> {
        match self {
            TypeExpr::Named(name) => Some(name),
            _ => None,
        }
    }
}
