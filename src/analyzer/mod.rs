//! The three-pass semantic analyzer: declare, resolve, analyze.
//!
//! Grounded in the teacher's `typechecker::Typechecker`, generalized from
//! its single recursive `check_statement` walk into three explicit passes
//! over the top level before bodies are ever visited, so mutually (and
//! forward-) referencing functions resolve without a pre-pass hack.
//! Diagnostics are collected rather than raised (see `crate::diagnostics`)
//! the way the teacher's `TypeError` is instead turned into a `Result`
//! per statement — here flattened into one pair of lists so a single bad
//! function doesn't stop the rest of the program from being checked.

mod body;

use std::collections::HashMap;

use log::debug;

use crate::ast::{FileNode, NodeId, SourceFile, StructDecl, StructDeclField, TyLabel};
use crate::diagnostics::{Diagnostic, Pos};
use crate::scope::Scope;
use crate::symbol::{FuncSymbol, StructFieldSymbol, StructSymbol, Symbol, SymbolTable};
use crate::types::Type;

/// The result of analyzing a [`SourceFile`]: whether it is safe to hand to
/// the evaluator, plus every diagnostic collected along the way.
pub struct AnalysisOutcome {
    pub success: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub symbols: SymbolTable,
}

pub(crate) struct Analyzer {
    scope: Scope<Symbol>,
    symbols: SymbolTable,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    used_any_type: bool,
}

/// Runs the three passes over an already-parsed [`SourceFile`].
///
/// The root scope is populated with native built-ins (see
/// [`crate::builtins::install_analyzer`]) by the caller before this runs;
/// `analyze` itself only ever adds user-declared names.
pub fn analyze(file: &SourceFile) -> AnalysisOutcome {
    let mut scope = Scope::new();
    crate::builtins::install_analyzer(&mut scope);
    analyze_with_scope(file, scope)
}

pub(crate) fn analyze_with_scope(file: &SourceFile, scope: Scope<Symbol>) -> AnalysisOutcome {
    let mut analyzer = Analyzer {
        scope,
        symbols: SymbolTable::new(),
        errors: Vec::new(),
        warnings: Vec::new(),
        used_any_type: false,
    };

    debug!("analyzer: entering declare pass");
    analyzer.declare_top_level(file);
    debug!("analyzer: leaving declare pass, entering resolve pass");
    analyzer.resolve_top_level(file);
    debug!("analyzer: leaving resolve pass, entering analyze pass");
    analyzer.analyze_bodies(file);
    debug!("analyzer: leaving analyze pass ({} error(s))", analyzer.errors.len());

    if analyzer.used_any_type {
        analyzer.warn("any-type was used", None);
    }

    AnalysisOutcome {
        success: analyzer.errors.is_empty(),
        errors: analyzer.errors,
        warnings: analyzer.warnings,
        symbols: analyzer.symbols,
    }
}

impl Analyzer {
    fn error(&mut self, message: impl Into<String>, position: impl Into<Option<Pos>>) {
        self.errors.push(Diagnostic::error(message, position));
    }

    fn warn(&mut self, message: impl Into<String>, position: impl Into<Option<Pos>>) {
        self.warnings.push(Diagnostic::warn(message, position));
    }

    /// Pass 1 — declare top-level names with placeholder (`Pending`) types,
    /// so forward references between functions and structs resolve in any
    /// declaration order.
    fn declare_top_level(&mut self, file: &SourceFile) {
        for decl in &file.decls {
            if decl.exported() {
                self.warn("exported function is not supported yet", decl.position());
            }
            match decl {
                FileNode::Function(f) => {
                    if self.scope.lookup(&f.name).is_some() {
                        self.error(format!("duplicate declaration: `{}`", f.name), f.position);
                        continue;
                    }
                    let params = f.params.iter().map(|p| (p.name.clone(), Type::Pending)).collect();
                    let symbol = Symbol::Func(FuncSymbol {
                        is_defined: false,
                        params,
                        ret_ty: Type::Pending,
                    });
                    self.scope.define(f.name.clone(), symbol.clone());
                    self.symbols.insert(f.id, symbol);
                }
                FileNode::Struct(s) => {
                    if self.scope.lookup(&s.name).is_some() {
                        self.error(format!("duplicate declaration: `{}`", s.name), s.position);
                        continue;
                    }
                    let symbol = Symbol::Struct(pending_struct_symbol(s));
                    self.scope.define(s.name.clone(), symbol.clone());
                    self.symbols.insert(s.id, symbol);
                }
            }
        }
    }

    /// Pass 2 — resolve declared types of every function signature and
    /// struct field, now that every top-level name exists in scope.
    fn resolve_top_level(&mut self, file: &SourceFile) {
        for decl in &file.decls {
            match decl {
                FileNode::Function(f) => {
                    let ret_ty = match &f.return_ty {
                        Some(label) => self.resolve_ty_label(label),
                        None => Type::Void,
                    };
                    let mut params = Vec::with_capacity(f.params.len());
                    for param in &f.params {
                        let ty = match &param.ty {
                            Some(label) => self.resolve_ty_label(label),
                            None => {
                                self.error("parameter type missing.", param.position);
                                Type::Bad
                            }
                        };
                        self.symbols.insert(param.id, Symbol::Variable(crate::symbol::VariableSymbol::new(true, ty.clone())));
                        params.push((param.name.clone(), ty));
                    }
                    let symbol = Symbol::Func(FuncSymbol {
                        is_defined: true,
                        params,
                        ret_ty,
                    });
                    self.scope.define(f.name.clone(), symbol.clone());
                    self.symbols.insert(f.id, symbol);
                }
                FileNode::Struct(s) => {
                    let mut fields = HashMap::new();
                    let mut field_order = Vec::with_capacity(s.fields.len());
                    for field in &s.fields {
                        let ty = self.resolve_ty_label(&field.ty);
                        self.symbols.insert(
                            field.id,
                            Symbol::StructField(StructFieldSymbol {
                                struct_name: s.name.clone(),
                                ty: ty.clone(),
                            }),
                        );
                        fields.insert(field.name.clone(), StructFieldSymbol { struct_name: s.name.clone(), ty });
                        field_order.push(field.name.clone());
                    }
                    let symbol = Symbol::Struct(StructSymbol {
                        name: s.name.clone(),
                        fields,
                        field_order,
                    });
                    self.scope.define(s.name.clone(), symbol.clone());
                    self.symbols.insert(s.id, symbol);
                }
            }
        }
    }

    /// Pass 3 — walk every function body, type-checking statements and
    /// expressions and recording each expression's inferred type.
    fn analyze_bodies(&mut self, file: &SourceFile) {
        for decl in &file.decls {
            let FileNode::Function(f) = decl else { continue };
            let (ret_ty, params) = match self.scope.lookup(&f.name) {
                Some(Symbol::Func(func)) => (func.ret_ty.clone(), func.params.clone()),
                _ => (Type::Bad, Vec::new()),
            };
            self.scope.enter();
            for (param, (_, ty)) in f.params.iter().zip(params.into_iter()) {
                self.scope.define(
                    param.name.clone(),
                    Symbol::Variable(crate::symbol::VariableSymbol::new(true, ty)),
                );
            }
            let body_ty = self.analyze_block(&f.body, false, &ret_ty);
            if !body_ty.is_never() && !body_ty.compatible(&ret_ty) {
                self.error(
                    format!("type mismatch: expected `{ret_ty}`, found `{body_ty}`"),
                    f.position,
                );
            }
            self.scope.leave();
        }
    }

    /// Resolves a `: Name` annotation to a primitive or a declared struct's
    /// type. Built-in primitive names never touch the scope; anything else
    /// must name a `StructSymbol` in the root scope.
    fn resolve_ty_label(&mut self, label: &TyLabel) -> Type {
        if Type::is_primitive_name(&label.name) {
            return Type::named(label.name.clone());
        }
        match self.scope.lookup(&label.name) {
            Some(Symbol::Struct(s)) => Type::Named(s.name),
            Some(_) => {
                self.error(format!("invalid type name: `{}`", label.name), label.position);
                Type::Bad
            }
            None => {
                self.error(format!("unknown type name: `{}`", label.name), label.position);
                Type::Bad
            }
        }
    }
}

fn pending_struct_symbol(decl: &StructDecl) -> StructSymbol {
    let mut fields = HashMap::new();
    let mut field_order = Vec::with_capacity(decl.fields.len());
    for field in &decl.fields {
        insert_pending_field(&mut fields, &mut field_order, &decl.name, field);
    }
    StructSymbol {
        name: decl.name.clone(),
        fields,
        field_order,
    }
}

fn insert_pending_field(
    fields: &mut HashMap<String, StructFieldSymbol>,
    field_order: &mut Vec<String>,
    struct_name: &str,
    field: &StructDeclField,
) {
    fields.insert(
        field.name.clone(),
        StructFieldSymbol {
            struct_name: struct_name.to_owned(),
            ty: Type::Pending,
        },
    );
    field_order.push(field.name.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn analyze_source(src: &str) -> AnalysisOutcome {
        let file = parse(src, "t.ug").expect("parse should succeed");
        analyze(&file)
    }

    #[test]
    fn simple_arithmetic_program_succeeds() {
        let outcome = analyze_source("fn main(){ var x = 1 + 2; assertEq(x, 3); }");
        assert!(outcome.success, "errors: {:?}", outcome.errors);
    }

    #[test]
    fn forward_reference_between_functions_resolves() {
        let outcome = analyze_source(
            "fn main(){ assertEq(helper(), 1); } fn helper():number { return 1; }",
        );
        assert!(outcome.success, "errors: {:?}", outcome.errors);
    }

    #[test]
    fn duplicate_top_level_name_is_an_error() {
        let outcome = analyze_source("fn main(){} fn main(){}");
        assert!(!outcome.success);
    }

    #[test]
    fn missing_parameter_type_is_an_error() {
        let outcome = analyze_source("fn f(x){} fn main(){}");
        assert!(!outcome.success);
        assert!(outcome.errors.iter().any(|e| e.message.contains("parameter type missing")));
    }

    #[test]
    fn analysis_is_idempotent_on_success() {
        let file = parse("fn main(){ var x = 1; assertEq(x, 1); }", "t.ug").unwrap();
        let first = analyze(&file);
        let second = analyze(&file);
        assert_eq!(first.errors, second.errors);
        assert_eq!(first.warnings, second.warnings);
    }
}
