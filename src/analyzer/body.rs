//! Pass 3's expression and statement type-checking.
//!
//! Split out of `mod.rs` the way the teacher keeps `Typechecker`'s own
//! recursive descent in one file but factors scope/error plumbing into
//! siblings — here the declare/resolve passes (top-level, run once) are
//! kept apart from the body walk (recursive, run per function).

use crate::ast::{AssignMode, BinaryOperator, Expression, Step, StructExprField, UnaryOperator};
use crate::diagnostics::Pos;
use crate::symbol::{ExprSymbol, Symbol, VariableSymbol};
use crate::types::Type;

use super::Analyzer;

impl Analyzer {
    /// Analyzes a block's steps under a fresh scope layer and returns the
    /// block's own type: the last step's type, or `Never` if that step
    /// returned or broke. A missing `else` branch is treated as an empty,
    /// `Void`-typed block for the purposes of `IfExpr` type unification.
    pub(super) fn analyze_block(&mut self, steps: &[Step], allow_jump: bool, ret_ty: &Type) -> Type {
        self.scope.enter();
        let mut block_ty = Type::Void;
        let last = steps.len().checked_sub(1);
        for (i, step) in steps.iter().enumerate() {
            let step_ty = self.analyze_step(step, allow_jump, ret_ty);
            if Some(i) != last {
                if !step_ty.compatible(&Type::Void) {
                    self.error(
                        format!("type mismatch: expected `void`, found `{step_ty}`"),
                        step.position(),
                    );
                }
            } else {
                block_ty = step_ty;
            }
        }
        self.scope.leave();
        block_ty
    }

    fn analyze_step(&mut self, step: &Step, allow_jump: bool, ret_ty: &Type) -> Type {
        match step {
            Step::VariableDecl { id, name, ty, init, position } => {
                let declared_ty = ty.as_ref().map(|label| self.resolve_ty_label(label));
                let init_ty = init.as_ref().map(|e| self.analyze_expr(e, allow_jump, ret_ty));
                let final_ty = match (declared_ty, init_ty) {
                    (Some(d), Some(i)) => {
                        if !d.compatible(&i) {
                            self.error(
                                format!("type mismatch: expected `{d}`, found `{i}`"),
                                *position,
                            );
                        }
                        d
                    }
                    (Some(d), None) => d,
                    (None, Some(i)) => i,
                    (None, None) => Type::Pending,
                };
                let is_defined = init.is_some();
                let symbol = VariableSymbol::new(is_defined, final_ty);
                self.scope.define(name.clone(), Symbol::Variable(symbol.clone()));
                self.symbols.insert(*id, Symbol::Variable(symbol));
                Type::Void
            }
            Step::AssignStatement { target, body, mode, position, .. } => {
                let body_ty = self.analyze_expr(body, allow_jump, ret_ty);
                if matches!(body_ty, Type::Void) {
                    self.error("cannot assign a void value", body.position());
                }
                let target_ty = self.analyze_assign_target(target, &body_ty, allow_jump, ret_ty);
                match mode {
                    AssignMode::Assign => {
                        if !target_ty.compatible(&body_ty) {
                            self.error(
                                format!("type mismatch: expected `{target_ty}`, found `{body_ty}`"),
                                *position,
                            );
                        }
                    }
                    _ => {
                        if !target_ty.compatible(&Type::number()) {
                            self.error(format!("type mismatch: expected `number`, found `{target_ty}`"), *position);
                        }
                        if !body_ty.compatible(&Type::number()) {
                            self.error(format!("type mismatch: expected `number`, found `{body_ty}`"), *position);
                        }
                    }
                }
                Type::Void
            }
            Step::ExprStatement { expr, .. } => {
                let ty = self.analyze_expr(expr, allow_jump, ret_ty);
                if ty.is_never() { Type::Never } else { Type::Void }
            }
            Step::TrailingExpr { expr, .. } => self.analyze_expr(expr, allow_jump, ret_ty),
            Step::LoopStatement { block, position, .. } => {
                let body_ty = self.analyze_block(block, true, ret_ty);
                if !body_ty.is_never() && !body_ty.compatible(&Type::Void) {
                    self.error(format!("type mismatch: expected `void`, found `{body_ty}`"), *position);
                }
                Type::Void
            }
            Step::ReturnStatement { expr, position, .. } => {
                if let Some(e) = expr {
                    let ty = self.analyze_expr(e, allow_jump, ret_ty);
                    if matches!(ty, Type::Void) {
                        self.error("cannot return a void value", e.position());
                    } else if !ty.compatible(ret_ty) {
                        self.error(format!("type mismatch: expected `{ret_ty}`, found `{ty}`"), e.position());
                    }
                } else if !ret_ty.compatible(&Type::Void) {
                    self.error(format!("type mismatch: expected `{ret_ty}`, found `void`"), *position);
                }
                Type::Never
            }
            Step::BreakStatement { position, .. } => {
                if !allow_jump {
                    self.error("invalid break statement", *position);
                }
                Type::Never
            }
        }
    }

    /// Analyzes an assignment target under "assign mode": an `Identifier`
    /// naming an as-yet-undefined variable is allowed (and its type is
    /// inferred from `body_ty` when it was `Pending`); struct fields and
    /// array elements are always addressable once their target resolves.
    fn analyze_assign_target(&mut self, target: &Expression, body_ty: &Type, allow_jump: bool, ret_ty: &Type) -> Type {
        if !target.is_reference_expression() {
            self.error("invalid assignment target", target.position());
            return Type::Bad;
        }
        if let Expression::Identifier { id, name, position } = target {
            return match self.scope.lookup(name) {
                Some(Symbol::Variable(var)) => {
                    if !var.is_defined() {
                        let inferred = if matches!(var.ty(), Type::Pending) { body_ty.clone() } else { var.ty() };
                        var.set_defined(inferred);
                    }
                    self.symbols.insert(*id, Symbol::Variable(var.clone()));
                    var.ty()
                }
                Some(_) => {
                    self.error(format!("`{name}` is not a variable"), *position);
                    Type::Bad
                }
                None => {
                    self.error(format!("unknown identifier: `{name}`"), *position);
                    Type::Bad
                }
            };
        }
        self.analyze_expr(target, allow_jump, ret_ty)
    }

    pub(super) fn analyze_expr(&mut self, expr: &Expression, allow_jump: bool, ret_ty: &Type) -> Type {
        let ty = self.analyze_expr_inner(expr, allow_jump, ret_ty);
        self.symbols.insert(expr.id(), Symbol::Expr(ExprSymbol { ty: ty.clone() }));
        ty
    }

    fn analyze_expr_inner(&mut self, expr: &Expression, allow_jump: bool, ret_ty: &Type) -> Type {
        match expr {
            Expression::NumberLiteral { .. } => Type::number(),
            Expression::BoolLiteral { .. } => Type::bool(),
            Expression::CharLiteral { value, position, .. } => {
                if value.chars().count() != 1 {
                    self.error("char literal must contain exactly one character", *position);
                    return Type::Bad;
                }
                Type::char()
            }
            Expression::StringLiteral { .. } => Type::string(),
            Expression::Identifier { name, position, .. } => self.analyze_identifier(name, *position),
            Expression::BinaryOp { op, left, right, position, .. } => {
                self.analyze_binary_op(*op, left, right, *position, allow_jump, ret_ty)
            }
            Expression::UnaryOp { op, operand, position, .. } => {
                self.analyze_unary_op(*op, operand, *position, allow_jump, ret_ty)
            }
            Expression::Call { callee, args, position, .. } => {
                self.analyze_call(callee, args, *position, allow_jump, ret_ty)
            }
            Expression::FieldAccess { target, name, position, .. } => {
                self.analyze_field_access(target, name, *position, allow_jump, ret_ty)
            }
            Expression::IndexAccess { target, index, position, .. } => {
                self.analyze_index_access(target, index, *position, allow_jump, ret_ty)
            }
            Expression::Array { items, .. } => {
                for item in items {
                    self.analyze_expr(item, allow_jump, ret_ty);
                }
                Type::array()
            }
            Expression::StructExpr { name, fields, position, .. } => {
                self.analyze_struct_expr(name, fields, *position, allow_jump, ret_ty)
            }
            Expression::If { cond, then_block, else_block, .. } => {
                self.analyze_if_expr(cond, then_block, else_block.as_deref(), allow_jump, ret_ty)
            }
        }
    }

    fn analyze_identifier(&mut self, name: &str, position: Pos) -> Type {
        match self.scope.lookup(name) {
            Some(Symbol::Variable(var)) => {
                if !var.is_defined() {
                    self.error("variable is not assigned yet.", position);
                    return Type::Bad;
                }
                var.ty()
            }
            Some(symbol) => symbol.ty(),
            None => {
                self.error(format!("unknown identifier: `{name}`"), position);
                Type::Bad
            }
        }
    }

    fn analyze_binary_op(
        &mut self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
        position: Pos,
        allow_jump: bool,
        ret_ty: &Type,
    ) -> Type {
        let lt = self.analyze_expr(left, allow_jump, ret_ty);
        let rt = self.analyze_expr(right, allow_jump, ret_ty);
        use BinaryOperator::*;
        match op {
            Or | And => {
                self.require_compatible(&lt, &Type::bool(), position);
                self.require_compatible(&rt, &Type::bool(), position);
                Type::bool()
            }
            Eq | NotEq => {
                if !rt.compatible(&lt) {
                    self.error(format!("type mismatch: expected `{lt}`, found `{rt}`"), position);
                }
                Type::bool()
            }
            LessThan | LessThanEq | GreaterThan | GreaterThanEq => {
                self.require_compatible(&lt, &Type::number(), position);
                self.require_compatible(&rt, &Type::number(), position);
                Type::bool()
            }
            Add | Sub | Mult | Div | Mod => {
                self.require_compatible(&lt, &Type::number(), position);
                self.require_compatible(&rt, &Type::number(), position);
                Type::number()
            }
        }
    }

    fn analyze_unary_op(&mut self, op: UnaryOperator, operand: &Expression, position: Pos, allow_jump: bool, ret_ty: &Type) -> Type {
        let ot = self.analyze_expr(operand, allow_jump, ret_ty);
        match op {
            UnaryOperator::Not => {
                self.require_compatible(&ot, &Type::bool(), position);
                Type::bool()
            }
            UnaryOperator::Plus | UnaryOperator::Minus => {
                self.require_compatible(&ot, &Type::number(), position);
                Type::number()
            }
        }
    }

    fn require_compatible(&mut self, actual: &Type, expected: &Type, position: Pos) {
        if !actual.compatible(expected) {
            self.error(format!("type mismatch: expected `{expected}`, found `{actual}`"), position);
        }
    }

    fn analyze_call(&mut self, callee: &Expression, args: &[Expression], position: Pos, allow_jump: bool, ret_ty: &Type) -> Type {
        let callee_ty = self.analyze_expr(callee, allow_jump, ret_ty);
        let arg_tys: Vec<Type> = args.iter().map(|a| self.analyze_expr(a, allow_jump, ret_ty)).collect();
        match callee_ty {
            Type::Function { params, return_ty } => {
                if params.len() != arg_tys.len() {
                    self.error(
                        format!("expected {} argument(s), found {}", params.len(), arg_tys.len()),
                        position,
                    );
                } else {
                    for (expected, actual) in params.iter().zip(arg_tys.iter()) {
                        self.require_compatible(actual, expected, position);
                    }
                }
                *return_ty
            }
            Type::Bad => Type::Bad,
            other => {
                self.error(format!("type mismatch: expected a function, found `{other}`"), position);
                Type::Bad
            }
        }
    }

    fn analyze_field_access(&mut self, target: &Expression, name: &str, position: Pos, allow_jump: bool, ret_ty: &Type) -> Type {
        let target_ty = self.analyze_expr(target, allow_jump, ret_ty);
        match target_ty {
            Type::Named(struct_name) => match self.scope.lookup(&struct_name) {
                Some(Symbol::Struct(s)) => match s.fields.get(name) {
                    Some(field) => field.ty.clone(),
                    None => {
                        self.error(format!("unknown field `{name}` on `{struct_name}`"), position);
                        Type::Bad
                    }
                },
                _ => {
                    self.error(format!("`{struct_name}` has no fields"), position);
                    Type::Bad
                }
            },
            Type::Bad => Type::Bad,
            other => {
                self.error(format!("type mismatch: expected a struct, found `{other}`"), position);
                Type::Bad
            }
        }
    }

    fn analyze_index_access(&mut self, target: &Expression, index: &Expression, position: Pos, allow_jump: bool, ret_ty: &Type) -> Type {
        let target_ty = self.analyze_expr(target, allow_jump, ret_ty);
        let index_ty = self.analyze_expr(index, allow_jump, ret_ty);
        self.require_compatible(&index_ty, &Type::number(), position);
        if !matches!(target_ty, Type::Bad) {
            self.require_compatible(&target_ty, &Type::array(), position);
        }
        self.used_any_type = true;
        Type::Any
    }

    fn analyze_struct_expr(&mut self, name: &str, fields: &[StructExprField], position: Pos, allow_jump: bool, ret_ty: &Type) -> Type {
        let Some(Symbol::Struct(s)) = self.scope.lookup(name) else {
            self.error(format!("unknown struct: `{name}`"), position);
            for f in fields {
                self.analyze_expr(&f.body, allow_jump, ret_ty);
            }
            return Type::Bad;
        };
        let mut seen = std::collections::HashSet::new();
        for field in fields {
            let body_ty = self.analyze_expr(&field.body, allow_jump, ret_ty);
            match s.fields.get(&field.name) {
                Some(decl_field) => {
                    if !seen.insert(field.name.clone()) {
                        self.error(format!("field `{}` initialized more than once", field.name), field.position);
                    }
                    self.require_compatible(&body_ty, &decl_field.ty, field.position);
                }
                None => {
                    self.error(format!("unknown field `{}` on `{name}`", field.name), field.position);
                }
            }
        }
        for field_name in &s.field_order {
            if !seen.contains(field_name) {
                self.error(format!("missing field `{field_name}` in struct literal for `{name}`"), position);
            }
        }
        Type::Named(name.to_owned())
    }

    fn analyze_if_expr(
        &mut self,
        cond: &Expression,
        then_block: &[Step],
        else_block: Option<&[Step]>,
        allow_jump: bool,
        ret_ty: &Type,
    ) -> Type {
        let cond_ty = self.analyze_expr(cond, allow_jump, ret_ty);
        self.require_compatible(&cond_ty, &Type::bool(), cond.position());
        let then_ty = self.analyze_block(then_block, allow_jump, ret_ty);
        let else_ty = match else_block {
            Some(steps) => self.analyze_block(steps, allow_jump, ret_ty),
            None => Type::Void,
        };
        match (then_ty.is_never(), else_ty.is_never()) {
            (true, true) => Type::Never,
            (true, false) => else_ty,
            (false, true) => then_ty,
            (false, false) => {
                if !then_ty.compatible(&else_ty) {
                    self.error(
                        format!("type mismatch: expected `{then_ty}`, found `{else_ty}`"),
                        cond.position(),
                    );
                }
                then_ty
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::analyze;
    use crate::parser::parse;

    fn outcome(src: &str) -> crate::analyzer::AnalysisOutcome {
        analyze(&parse(src, "t.ug").unwrap())
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let out = outcome("fn main(){ break; }");
        assert!(!out.success);
        assert!(out.errors.iter().any(|e| e.message.contains("invalid break statement")));
    }

    #[test]
    fn break_inside_nested_if_inside_loop_is_accepted() {
        let out = outcome("fn main(){ loop { if true { break; } } }");
        assert!(out.success, "errors: {:?}", out.errors);
    }

    #[test]
    fn reading_unassigned_variable_is_an_error() {
        let out = outcome("fn main(){ var x: number; printNum(x); }");
        assert!(!out.success);
        assert!(out.errors.iter().any(|e| e.message.contains("not assigned yet")));
    }

    #[test]
    fn struct_literal_must_initialize_every_field_exactly_once() {
        let out = outcome("struct A { value: number } fn main(){ var a = new A {}; }");
        assert!(!out.success);
    }

    #[test]
    fn recursive_function_type_checks() {
        let out = outcome(
            "fn calc(x:number):number{ if x==0 { return 1; } else { return calc(x-1)*2; } } fn main(){ assertEq(calc(8), 256); }",
        );
        assert!(out.success, "errors: {:?}", out.errors);
    }

    #[test]
    fn array_index_access_raises_any_type_warning() {
        let out = outcome("fn main(){ var a = [1,2]; assertEq(a[0], 1); }");
        assert!(out.success, "errors: {:?}", out.errors);
        assert!(out.warnings.iter().any(|w| w.message.contains("any-type was used")));
    }

    #[test]
    fn scope_discipline_inner_name_does_not_leak() {
        let out = outcome("fn main(){ loop { var y = 1; break; } printNum(y); }");
        assert!(!out.success);
    }
}
