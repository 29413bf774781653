use super::Name;
use crate::lexer::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(Name),
    IntLiteral { value: i64, position: Position },
    FloatLiteral { value: f64, position: Position },
    StringLiteral { value: String, position: Position },
    CharLiteral { value: char, position: Position },
    BoolLiteral { value: bool, position: Position },
    NilLiteral { position: Position },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        position: Position,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        position: Position,
    },
    /// `callee(args)`. When `callee` is an [`Expr::Ident`] or
    /// [`Expr::FieldAccess`], the callee's own name position (already
    /// captured there) is what go-to-definition and signature help resolve
    /// against — no separate position is duplicated here.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        position: Position,
    },
    FieldAccess {
        target: Box<Expr>,
        field: Name,
        position: Position,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
        position: Position,
    },
    Deref {
        target: Box<Expr>,
        position: Position,
    },
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        position: Position,
    },
    SetLiteral {
        elements: Vec<Expr>,
        position: Position,
    },
    /// `value AS T` — a checked narrowing cast.
    Cast {
        target: Box<Expr>,
        type_name: Name,
        position: Position,
    },
    /// `value IS T` — a runtime type test.
    TypeTest {
        target: Box<Expr>,
        type_name: Name,
        position: Position,
    },
    /// `inherited MethodName(args)`.
    Inherited {
        method: Name,
        args: Vec<Expr>,
        position: Position,
    },
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Expr::Ident(name) => name.position,
            Expr::IntLiteral { position, .. }
            | Expr::FloatLiteral { position, .. }
            | Expr::StringLiteral { position, .. }
            | Expr::CharLiteral { position, .. }
            | Expr::BoolLiteral { position, .. }
            | Expr::NilLiteral { position }
            | Expr::Binary { position, .. }
            | Expr::Unary { position, .. }
            | Expr::Call { position, .. }
            | Expr::FieldAccess { position, .. }
            | Expr::Index { position, .. }
            | Expr::Deref { position, .. }
            | Expr::Range { position, .. }
            | Expr::SetLiteral { position, .. }
            | Expr::Cast { position, .. }
            | Expr::TypeTest { position, .. }
            | Expr::Inherited { position, .. } => *position,
        }
    }
}
