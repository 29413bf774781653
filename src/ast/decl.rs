use super::{Name, TypeExpr};
use crate::ast::Expr;
use crate::lexer::Position;

#[derive(Debug, Clone)]
pub struct ConstDecl {
    pub name: Name,
    pub value: Expr,
    pub exported: bool,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: Name,
    pub type_ref: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub exported: bool,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: Name,
    pub type_ref: TypeExpr,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct RecordBody {
    /// The parent type named in `record(Parent)`. `record` without a
    /// parenthesized parent has no base.
    pub parent: Option<Name>,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone)]
pub enum TypeBody {
    Alias(TypeExpr),
    Record(RecordBody),
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: Name,
    pub body: TypeBody,
    pub exported: bool,
    pub position: Position,
    pub end_line: usize,
}
