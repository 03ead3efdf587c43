//! Symbols attached to AST nodes by the analyzer, and the side table that
//! holds them.
//!
//! Keyed by [`NodeId`](crate::ast::NodeId) rather than pointer identity,
//! since the AST is a plain `Box`/`Vec` tree (see the teacher's
//! `typechecker::scope::StoredVariable`, which this mirrors for the
//! per-variable shape, generalized to every symbol kind the pipeline
//! needs).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::NodeId;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct StructFieldSymbol {
    pub struct_name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructSymbol {
    pub name: String,
    pub fields: HashMap<String, StructFieldSymbol>,
    /// Preserves declaration order, since struct literals and runtime
    /// struct values both need a stable field ordering that a `HashMap`
    /// alone can't give them.
    pub field_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncSymbol {
    pub is_defined: bool,
    pub params: Vec<(String, Type)>,
    pub ret_ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeFuncSymbol {
    pub params: Vec<Type>,
    pub ret_ty: Type,
}

/// A variable's declared type lives behind a shared cell so the analyzer
/// can mutate it in place (e.g. once a `Pending` variable's type is
/// inferred from its first assignment) and every existing lookup of that
/// variable observes the update — the same slot trick the evaluator uses
/// for values, grounded in the teacher's `StoredVariable::type_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSymbol {
    pub is_defined: Rc<RefCell<bool>>,
    pub ty: Rc<RefCell<Type>>,
}

impl VariableSymbol {
    pub fn new(is_defined: bool, ty: Type) -> Self {
        Self {
            is_defined: Rc::new(RefCell::new(is_defined)),
            ty: Rc::new(RefCell::new(ty)),
        }
    }

    pub fn ty(&self) -> Type {
        self.ty.borrow().clone()
    }

    pub fn is_defined(&self) -> bool {
        *self.is_defined.borrow()
    }

    pub fn set_defined(&self, ty: Type) {
        *self.ty.borrow_mut() = ty;
        *self.is_defined.borrow_mut() = true;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSymbol {
    pub ty: Type,
}

/// Attached to an expression node so its inferred type can be recalled
/// without re-analyzing it (e.g. by the evaluator's defensive checks).
#[derive(Debug, Clone, PartialEq)]
pub struct ExprSymbol {
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Bad,
    Func(FuncSymbol),
    NativeFunc(NativeFuncSymbol),
    Struct(StructSymbol),
    StructField(StructFieldSymbol),
    Variable(VariableSymbol),
    Primitive(PrimitiveSymbol),
    Expr(ExprSymbol),
}

impl Symbol {
    /// The static type this symbol denotes when it's read as a value
    /// (e.g. a bare identifier occurrence). Struct fields and the `Expr`
    /// annotation aren't meaningful here and return `Bad`.
    pub fn ty(&self) -> Type {
        match self {
            Symbol::Bad => Type::Bad,
            Symbol::Func(f) => Type::Function {
                params: f.params.iter().map(|(_, t)| t.clone()).collect(),
                return_ty: Box::new(f.ret_ty.clone()),
            },
            Symbol::NativeFunc(f) => Type::Function {
                params: f.params.clone(),
                return_ty: Box::new(f.ret_ty.clone()),
            },
            Symbol::Struct(s) => Type::Named(s.name.clone()),
            Symbol::StructField(f) => f.ty.clone(),
            Symbol::Variable(v) => v.ty(),
            Symbol::Primitive(p) => p.ty.clone(),
            Symbol::Expr(e) => e.ty.clone(),
        }
    }
}

/// Maps AST node identity to the symbol the analyzer attached to it.
/// Each node has at most one entry.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<NodeId, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId, symbol: Symbol) {
        self.symbols.insert(id, symbol);
    }

    pub fn get(&self, id: NodeId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_variable_slot_is_visible_through_every_clone() {
        let var = VariableSymbol::new(false, Type::Pending);
        let alias = var.clone();
        var.set_defined(Type::number());
        assert!(alias.is_defined());
        assert_eq!(alias.ty(), Type::number());
    }

    #[test]
    fn table_holds_one_symbol_per_node() {
        let mut table = SymbolTable::new();
        let id = NodeId(0);
        table.insert(id, Symbol::Bad);
        table.insert(id, Symbol::Primitive(PrimitiveSymbol { ty: Type::number() }));
        assert_eq!(table.get(id), Some(&Symbol::Primitive(PrimitiveSymbol { ty: Type::number() })));
    }
}
