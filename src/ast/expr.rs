use crate::diagnostics::Pos;

use super::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    NotEq,
    LessThan,
    LessThanEq,
    GreaterThan,
    GreaterThanEq,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum UnaryOperator {
    Not,
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum AssignMode {
    Assign,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StructExprField {
    pub name: String,
    pub body: Expression,
    pub position: Pos,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Expression {
    NumberLiteral {
        id: NodeId,
        value: f64,
        position: Pos,
    },
    BoolLiteral {
        id: NodeId,
        value: bool,
        position: Pos,
    },
    CharLiteral {
        id: NodeId,
        value: String,
        position: Pos,
    },
    StringLiteral {
        id: NodeId,
        value: String,
        position: Pos,
    },
    Identifier {
        id: NodeId,
        name: String,
        position: Pos,
    },
    BinaryOp {
        id: NodeId,
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        position: Pos,
    },
    UnaryOp {
        id: NodeId,
        op: UnaryOperator,
        operand: Box<Expression>,
        position: Pos,
    },
    Call {
        id: NodeId,
        callee: Box<Expression>,
        args: Vec<Expression>,
        position: Pos,
    },
    FieldAccess {
        id: NodeId,
        target: Box<Expression>,
        name: String,
        position: Pos,
    },
    IndexAccess {
        id: NodeId,
        target: Box<Expression>,
        index: Box<Expression>,
        position: Pos,
    },
    Array {
        id: NodeId,
        items: Vec<Expression>,
        position: Pos,
    },
    StructExpr {
        id: NodeId,
        name: String,
        fields: Vec<StructExprField>,
        position: Pos,
    },
    If {
        id: NodeId,
        cond: Box<Expression>,
        then_block: Vec<super::Step>,
        else_block: Option<Vec<super::Step>>,
        position: Pos,
    },
}

impl Expression {
    pub fn id(&self) -> NodeId {
        match self {
            Expression::NumberLiteral { id, .. }
            | Expression::BoolLiteral { id, .. }
            | Expression::CharLiteral { id, .. }
            | Expression::StringLiteral { id, .. }
            | Expression::Identifier { id, .. }
            | Expression::BinaryOp { id, .. }
            | Expression::UnaryOp { id, .. }
            | Expression::Call { id, .. }
            | Expression::FieldAccess { id, .. }
            | Expression::IndexAccess { id, .. }
            | Expression::Array { id, .. }
            | Expression::StructExpr { id, .. }
            | Expression::If { id, .. } => *id,
        }
    }

    pub fn position(&self) -> Pos {
        match self {
            Expression::NumberLiteral { position, .. }
            | Expression::BoolLiteral { position, .. }
            | Expression::CharLiteral { position, .. }
            | Expression::StringLiteral { position, .. }
            | Expression::Identifier { position, .. }
            | Expression::BinaryOp { position, .. }
            | Expression::UnaryOp { position, .. }
            | Expression::Call { position, .. }
            | Expression::FieldAccess { position, .. }
            | Expression::IndexAccess { position, .. }
            | Expression::Array { position, .. }
            | Expression::StructExpr { position, .. }
            | Expression::If { position, .. } => *position,
        }
    }

    /// `true` for the kinds that may be assignment targets:
    /// `Identifier`, `FieldAccess`, `IndexAccess` (the "reference
    /// expressions" named in the glossary).
    pub fn is_reference_expression(&self) -> bool {
        matches!(
            self,
            Expression::Identifier { .. } | Expression::FieldAccess { .. } | Expression::IndexAccess { .. }
        )
    }
}
