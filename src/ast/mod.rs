//! The abstract syntax tree produced by the parser and shared, read-only,
//! by the analyzer and evaluator.
//!
//! Nodes are ordinary heap values (`Box`/`Vec`), not arena-allocated, so
//! identity for the analyzer's symbol side-table can't be pointer
//! identity. Instead every node that can carry a symbol is tagged with a
//! [`NodeId`], a monotonic counter assigned during parsing.

mod expr;
mod stmt;

pub use expr::{AssignMode, BinaryOperator, Expression, StructExprField, UnaryOperator};
pub use stmt::Step;

use crate::diagnostics::Pos;

/// A stable identity for an AST node, assigned once at parse time.
///
/// Doubles as the key for the analyzer's symbol table (see
/// `crate::symbol`), since nothing about the tree itself is stable enough
/// to hash or compare once nodes start getting boxed and moved around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct NodeId(pub u32);

/// Hands out fresh, unique [`NodeId`]s. The parser owns one of these.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// A type annotation, e.g. `: number`. Resolved by the analyzer to a
/// primitive or a user-declared struct's type.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TyLabel {
    pub name: String,
    pub position: Pos,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FnDeclParam {
    pub id: NodeId,
    pub name: String,
    pub ty: Option<TyLabel>,
    pub position: Pos,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StructDeclField {
    pub id: NodeId,
    pub name: String,
    pub ty: TyLabel,
    pub position: Pos,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub name: String,
    pub params: Vec<FnDeclParam>,
    pub body: Vec<Step>,
    pub return_ty: Option<TyLabel>,
    pub exported: bool,
    pub position: Pos,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StructDecl {
    pub id: NodeId,
    pub name: String,
    pub fields: Vec<StructDeclField>,
    pub exported: bool,
    pub position: Pos,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum FileNode {
    Function(FunctionDecl),
    Struct(StructDecl),
}

impl FileNode {
    pub fn name(&self) -> &str {
        match self {
            FileNode::Function(f) => &f.name,
            FileNode::Struct(s) => &s.name,
        }
    }

    pub fn position(&self) -> Pos {
        match self {
            FileNode::Function(f) => f.position,
            FileNode::Struct(s) => s.position,
        }
    }

    pub fn exported(&self) -> bool {
        match self {
            FileNode::Function(f) => f.exported,
            FileNode::Struct(s) => s.exported,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SourceFile {
    pub filename: String,
    pub decls: Vec<FileNode>,
}
