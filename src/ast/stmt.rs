use crate::diagnostics::Pos;

use super::expr::{AssignMode, Expression};
use super::{NodeId, TyLabel};

/// A block element: either a statement or, at the final position of a
/// block, an expression standing in as the block's value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Step {
    VariableDecl {
        id: NodeId,
        name: String,
        ty: Option<TyLabel>,
        init: Option<Expression>,
        position: Pos,
    },
    AssignStatement {
        id: NodeId,
        target: Expression,
        body: Expression,
        mode: AssignMode,
        position: Pos,
    },
    ExprStatement {
        id: NodeId,
        expr: Expression,
        position: Pos,
    },
    LoopStatement {
        id: NodeId,
        block: Vec<Step>,
        position: Pos,
    },
    ReturnStatement {
        id: NodeId,
        expr: Option<Expression>,
        position: Pos,
    },
    BreakStatement {
        id: NodeId,
        position: Pos,
    },
    /// The trailing expression of a block, standing in for its value.
    /// Only valid as the last `Step` of a block.
    TrailingExpr {
        id: NodeId,
        expr: Expression,
        position: Pos,
    },
}

impl Step {
    pub fn id(&self) -> NodeId {
        match self {
            Step::VariableDecl { id, .. }
            | Step::AssignStatement { id, .. }
            | Step::ExprStatement { id, .. }
            | Step::LoopStatement { id, .. }
            | Step::ReturnStatement { id, .. }
            | Step::BreakStatement { id, .. }
            | Step::TrailingExpr { id, .. } => *id,
        }
    }

    pub fn position(&self) -> Pos {
        match self {
            Step::VariableDecl { position, .. }
            | Step::AssignStatement { position, .. }
            | Step::ExprStatement { position, .. }
            | Step::LoopStatement { position, .. }
            | Step::ReturnStatement { position, .. }
            | Step::BreakStatement { position, .. }
            | Step::TrailingExpr { position, .. } => *position,
        }
    }
}
