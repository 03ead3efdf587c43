//! The tree-walking evaluator.
//!
//! Grounded in the teacher's old `interpreter::Interpreter`, which already
//! walks statements and expressions by direct recursion over an owned
//! scope stack; generalized here to thread a [`Signal`] through every
//! `Result` so `return`/`break` unwind transparently through arbitrarily
//! nested expressions instead of each call site checking a "did we jump"
//! flag by hand.

mod value;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, error};

use crate::ast::{AssignMode, BinaryOperator, Expression, FileNode, SourceFile, Step, UnaryOperator};
use crate::diagnostics::Pos;
use crate::scope::Scope;

pub use value::{
    format_number, new_slot, new_undefined_slot, ArrayRef, FunctionValue, NativeHandler, RuntimeError, Signal, Slot,
    StructRef, Value,
};
use value::{read_slot, EvalResult};

/// The runtime's layered environment: names bound to shared, mutable
/// slots. A function's closure is a `fork()` of this at its definition
/// site (see [`crate::scope::Scope::fork`]).
pub type RunningEnv = Scope<Slot>;

/// Host-provided I/O, kept behind a trait-object callback so the library
/// never depends on a concrete notion of "the terminal" — tests can
/// capture output into a `Vec<String>`, a CLI can forward it to stdout.
#[derive(Clone)]
pub struct HostOptions {
    stdout: Option<Rc<RefCell<dyn FnMut(&str)>>>,
}

impl HostOptions {
    /// Silent by default: `printStr`/`printNum` become no-ops.
    pub fn silent() -> Self {
        Self { stdout: None }
    }

    pub fn with_stdout(callback: impl FnMut(&str) + 'static) -> Self {
        Self {
            stdout: Some(Rc::new(RefCell::new(callback))),
        }
    }

    pub fn write_stdout(&self, text: &str) {
        if let Some(cb) = &self.stdout {
            (cb.borrow_mut())(text);
        }
    }
}

impl Default for HostOptions {
    fn default() -> Self {
        Self::silent()
    }
}

/// Runs an already-analyzed program. The caller is responsible for having
/// run `crate::analyzer::analyze` successfully first — the evaluator does
/// not re-check types, only the small set of defensive invariants listed
/// in the module docs.
pub fn run(file: &SourceFile, options: &HostOptions) -> Result<Value, RuntimeError> {
    let mut root: RunningEnv = Scope::new();
    crate::builtins::install_runtime(&mut root);

    for decl in &file.decls {
        if let FileNode::Function(f) = decl {
            let closure_env = root.fork();
            let value = Value::Function(FunctionValue::User {
                decl: Rc::new(f.clone()),
                env: closure_env,
            });
            root.define(f.name.clone(), new_slot(value));
        }
    }

    let main_slot = root.lookup("main").ok_or_else(|| {
        let err = RuntimeError::new("function `main` is not found", None);
        error!("{err}");
        err
    })?;
    let main_value = main_slot.borrow().clone().ok_or_else(|| {
        let err = RuntimeError::new("function `main` is not found", None);
        error!("{err}");
        err
    })?;

    debug!("calling main");
    match call_function(&main_value, &[], options, None) {
        Ok(v) => Ok(v),
        Err(Signal::Error(err)) => {
            error!("{err}");
            Err(err)
        }
        Err(Signal::Return(v)) => Ok(v),
        Err(Signal::Break) => {
            let err = RuntimeError::new("invalid break statement", None);
            error!("{err}");
            Err(err)
        }
    }
}

pub fn call_function(func: &Value, args: &[Value], options: &HostOptions, position: Option<Pos>) -> EvalResult<Value> {
    let Value::Function(handle) = func else {
        return Err(Signal::Error(RuntimeError::new(
            format!("`{}` is not callable", func.type_name()),
            position,
        )));
    };
    match handle {
        FunctionValue::Native { handler, .. } => handler(args, options).map_err(Signal::Error),
        FunctionValue::User { decl, env } => {
            debug!("calling `{}` with {} argument(s)", decl.name, args.len());
            if decl.params.len() != args.len() {
                let err = RuntimeError::new(
                    format!("expected {} argument(s), found {}", decl.params.len(), args.len()),
                    position,
                );
                error!("{err}");
                return Err(Signal::Error(err));
            }
            let mut call_env = env.fork();
            call_env.enter();
            for (param, arg) in decl.params.iter().zip(args) {
                call_env.define(param.name.clone(), new_slot(arg.clone()));
            }
            match exec_block(&decl.body, &mut call_env, options) {
                Ok(_) => Ok(Value::Void),
                Err(Signal::Return(v)) => Ok(v),
                Err(other) => Err(other),
            }
        }
    }
}

/// Executes a block's steps under a fresh layer, always leaving it again
/// regardless of which exit path (`Ok`, error, return, break) was taken.
fn exec_block(steps: &[Step], env: &mut RunningEnv, options: &HostOptions) -> EvalResult<Value> {
    env.enter();
    let result = exec_steps(steps, env, options);
    env.leave();
    result
}

fn exec_steps(steps: &[Step], env: &mut RunningEnv, options: &HostOptions) -> EvalResult<Value> {
    let mut value = Value::Void;
    for step in steps {
        value = exec_step(step, env, options)?;
    }
    Ok(value)
}

fn exec_step(step: &Step, env: &mut RunningEnv, options: &HostOptions) -> EvalResult<Value> {
    match step {
        Step::VariableDecl { name, init, .. } => {
            let slot = match init {
                Some(e) => new_slot(eval_expr(e, env, options)?),
                None => new_undefined_slot(),
            };
            env.define(name.clone(), slot);
            Ok(Value::Void)
        }
        Step::AssignStatement { target, body, mode, position, .. } => {
            let body_val = eval_expr(body, env, options)?;
            let new_val = match mode {
                AssignMode::Assign => body_val,
                _ => {
                    let current = eval_expr(target, env, options)?;
                    apply_compound(*mode, &current, &body_val, *position)?
                }
            };
            assign_to_target(target, new_val, env, options)?;
            Ok(Value::Void)
        }
        Step::ExprStatement { expr, .. } => {
            eval_expr(expr, env, options)?;
            Ok(Value::Void)
        }
        Step::TrailingExpr { expr, .. } => eval_expr(expr, env, options),
        Step::LoopStatement { block, .. } => loop {
            match exec_block(block, env, options) {
                Ok(_) => continue,
                Err(Signal::Break) => return Ok(Value::Void),
                Err(other) => return Err(other),
            }
        },
        Step::ReturnStatement { expr, .. } => {
            let value = match expr {
                Some(e) => eval_expr(e, env, options)?,
                None => Value::Void,
            };
            Err(Signal::Return(value))
        }
        Step::BreakStatement { .. } => Err(Signal::Break),
    }
}

fn apply_compound(mode: AssignMode, current: &Value, rhs: &Value, position: Pos) -> EvalResult<Value> {
    let (Value::Number(a), Value::Number(b)) = (current, rhs) else {
        return Err(Signal::Error(RuntimeError::new(
            format!(
                "type mismatch: expected `number`, found `{}`/`{}`",
                current.type_name(),
                rhs.type_name()
            ),
            Some(position),
        )));
    };
    let result = match mode {
        AssignMode::Add => a + b,
        AssignMode::Sub => a - b,
        AssignMode::Mult => a * b,
        AssignMode::Div => a / b,
        AssignMode::Mod => a % b,
        AssignMode::Assign => unreachable!("handled separately"),
    };
    Ok(Value::Number(result))
}

fn assign_to_target(target: &Expression, value: Value, env: &mut RunningEnv, options: &HostOptions) -> EvalResult<()> {
    let slot = match target {
        Expression::Identifier { name, position, .. } => env
            .lookup(name)
            .ok_or_else(|| Signal::Error(RuntimeError::new(format!("identifier `{name}` is not defined"), Some(*position))))?,
        Expression::FieldAccess { target, name, position, .. } => resolve_field_slot(target, name, *position, env, options)?,
        Expression::IndexAccess { target, index, position, .. } => resolve_index_slot(target, index, *position, env, options)?,
        _ => unreachable!("analyzer rejects non-reference assignment targets"),
    };
    *slot.borrow_mut() = Some(value);
    Ok(())
}

fn resolve_field_slot(target: &Expression, name: &str, position: Pos, env: &mut RunningEnv, options: &HostOptions) -> EvalResult<Slot> {
    let target_val = eval_expr(target, env, options)?;
    match target_val {
        Value::Struct(s) => s
            .fields
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Signal::Error(RuntimeError::new(format!("unknown field `{name}`"), Some(position)))),
        other => Err(Signal::Error(RuntimeError::new(
            format!("`{}` is not a struct", other.type_name()),
            Some(position),
        ))),
    }
}

fn resolve_index_slot(target: &Expression, index: &Expression, position: Pos, env: &mut RunningEnv, options: &HostOptions) -> EvalResult<Slot> {
    let target_val = eval_expr(target, env, options)?;
    let index_val = eval_expr(index, env, options)?;
    let Value::Number(n) = index_val else {
        return Err(Signal::Error(RuntimeError::new(
            format!("type mismatch: expected `number`, found `{}`", index_val.type_name()),
            Some(position),
        )));
    };
    let idx = n as usize;
    match target_val {
        Value::Array(a) => a
            .0
            .borrow()
            .get(idx)
            .cloned()
            .ok_or_else(|| Signal::Error(RuntimeError::new(format!("index out of bounds: `{idx}`"), Some(position)))),
        other => Err(Signal::Error(RuntimeError::new(
            format!("`{}` is not an array", other.type_name()),
            Some(position),
        ))),
    }
}

fn eval_expr(expr: &Expression, env: &mut RunningEnv, options: &HostOptions) -> EvalResult<Value> {
    match expr {
        Expression::NumberLiteral { value, .. } => Ok(Value::Number(*value)),
        Expression::BoolLiteral { value, .. } => Ok(Value::Bool(*value)),
        Expression::CharLiteral { value, .. } => Ok(Value::Char(value.chars().next().unwrap_or_default())),
        Expression::StringLiteral { value, .. } => Ok(Value::String(value.clone())),
        Expression::Identifier { name, position, .. } => {
            let slot = env
                .lookup(name)
                .ok_or_else(|| Signal::Error(RuntimeError::new(format!("identifier `{name}` is not defined"), Some(*position))))?;
            Ok(read_slot(&slot, *position, || format!("identifier `{name}` is not defined"))?)
        }
        Expression::BinaryOp { op, left, right, position, .. } => eval_binary_op(*op, left, right, *position, env, options),
        Expression::UnaryOp { op, operand, position, .. } => eval_unary_op(*op, operand, *position, env, options),
        Expression::Call { callee, args, position, .. } => {
            let callee_val = eval_expr(callee, env, options)?;
            let mut arg_vals = Vec::with_capacity(args.len());
            for arg in args {
                arg_vals.push(eval_expr(arg, env, options)?);
            }
            call_function(&callee_val, &arg_vals, options, Some(*position))
        }
        Expression::FieldAccess { target, name, position, .. } => {
            let slot = resolve_field_slot(target, name, *position, env, options)?;
            Ok(read_slot(&slot, *position, || format!("field `{name}` is not defined"))?)
        }
        Expression::IndexAccess { target, index, position, .. } => {
            let slot = resolve_index_slot(target, index, *position, env, options)?;
            Ok(read_slot(&slot, *position, || "array element is not defined".to_owned())?)
        }
        Expression::Array { items, .. } => {
            let mut slots = Vec::with_capacity(items.len());
            for item in items {
                slots.push(new_slot(eval_expr(item, env, options)?));
            }
            Ok(Value::Array(ArrayRef::new(slots)))
        }
        Expression::StructExpr { name, fields, .. } => {
            let mut map = HashMap::with_capacity(fields.len());
            for field in fields {
                map.insert(field.name.clone(), new_slot(eval_expr(&field.body, env, options)?));
            }
            Ok(Value::Struct(StructRef {
                name: name.clone(),
                fields: Rc::new(RefCell::new(map)),
            }))
        }
        Expression::If { cond, then_block, else_block, position, .. } => {
            let cond_val = eval_expr(cond, env, options)?;
            let Value::Bool(b) = cond_val else {
                return Err(Signal::Error(RuntimeError::new(
                    format!("type mismatch: expected `bool`, found `{}`", cond_val.type_name()),
                    Some(*position),
                )));
            };
            if b {
                exec_block(then_block, env, options)
            } else {
                match else_block {
                    Some(steps) => exec_block(steps, env, options),
                    None => Ok(Value::Void),
                }
            }
        }
    }
}

fn eval_binary_op(
    op: BinaryOperator,
    left: &Expression,
    right: &Expression,
    position: Pos,
    env: &mut RunningEnv,
    options: &HostOptions,
) -> EvalResult<Value> {
    use BinaryOperator::*;
    match op {
        Or => {
            let l = expect_bool(eval_expr(left, env, options)?, position)?;
            if l {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(expect_bool(eval_expr(right, env, options)?, position)?))
        }
        And => {
            let l = expect_bool(eval_expr(left, env, options)?, position)?;
            if !l {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(expect_bool(eval_expr(right, env, options)?, position)?))
        }
        Eq | NotEq => {
            let lv = eval_expr(left, env, options)?;
            let rv = eval_expr(right, env, options)?;
            let equal = values_equal(&lv, &rv, position)?;
            Ok(Value::Bool(if matches!(op, Eq) { equal } else { !equal }))
        }
        LessThan | LessThanEq | GreaterThan | GreaterThanEq => {
            let l = expect_number(eval_expr(left, env, options)?, position)?;
            let r = expect_number(eval_expr(right, env, options)?, position)?;
            let result = match op {
                LessThan => l < r,
                LessThanEq => l <= r,
                GreaterThan => l > r,
                GreaterThanEq => l >= r,
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        Add | Sub | Mult | Div | Mod => {
            let l = expect_number(eval_expr(left, env, options)?, position)?;
            let r = expect_number(eval_expr(right, env, options)?, position)?;
            let result = match op {
                Add => l + r,
                Sub => l - r,
                Mult => l * r,
                Div => l / r,
                Mod => l % r,
                _ => unreachable!(),
            };
            Ok(Value::Number(result))
        }
    }
}

fn eval_unary_op(op: UnaryOperator, operand: &Expression, position: Pos, env: &mut RunningEnv, options: &HostOptions) -> EvalResult<Value> {
    let value = eval_expr(operand, env, options)?;
    match op {
        UnaryOperator::Not => Ok(Value::Bool(!expect_bool(value, position)?)),
        UnaryOperator::Plus => Ok(Value::Number(expect_number(value, position)?)),
        UnaryOperator::Minus => Ok(Value::Number(-expect_number(value, position)?)),
    }
}

fn expect_bool(value: Value, position: Pos) -> EvalResult<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(Signal::Error(RuntimeError::new(
            format!("type mismatch: expected `bool`, found `{}`", other.type_name()),
            Some(position),
        ))),
    }
}

fn expect_number(value: Value, position: Pos) -> EvalResult<f64> {
    match value {
        Value::Number(n) => Ok(n),
        other => Err(Signal::Error(RuntimeError::new(
            format!("type mismatch: expected `number`, found `{}`", other.type_name()),
            Some(position),
        ))),
    }
}

/// Equivalence per the language's own rules: numbers/bools/chars/strings
/// compare by value; functions compare by declaration-node or handler
/// identity; structs and arrays can never be compared this way.
fn values_equal(a: &Value, b: &Value, position: Pos) -> EvalResult<bool> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Char(x), Value::Char(y)) => Ok(x == y),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::Function(x), Value::Function(y)) => Ok(x == y),
        (Value::Void, Value::Void) => Ok(true),
        (Value::Struct(_), _) | (_, Value::Struct(_)) | (Value::Array(_), _) | (_, Value::Array(_)) => Err(Signal::Error(
            RuntimeError::new("cannot be used for equivalence comparisons", Some(position)),
        )),
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::parser::parse;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn run_source(src: &str) -> Result<Value, RuntimeError> {
        let file = parse(src, "t.ug").expect("parse should succeed");
        let outcome = analyze(&file);
        assert!(outcome.success, "analysis failed: {:?}", outcome.errors);
        run(&file, &HostOptions::silent())
    }

    #[test]
    fn arithmetic_program_runs_to_completion() {
        let result = run_source("fn main(){ var x = 1 + 2; assertEq(x, 3); }");
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn recursive_function_computes_expected_value() {
        let result = run_source(
            "fn calc(x:number):number{ if x==0 { return 1; } else { return calc(x-1)*2; } } fn main(){ assertEq(calc(8), 256); }",
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn loop_with_break_terminates_with_expected_value() {
        let result = run_source(
            "fn main(){ var i=0; var x=1; loop{ if i==10 { break; } x = x*2; i = i+1; } assertEq(x, 1024); }",
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn struct_field_assignment_mutates_shared_storage() {
        let result = run_source(
            "struct A { value: number } fn main(){ var a = new A { value: 1 }; assertEq(a.value, 1); a.value = 2; assertEq(a.value, 2); }",
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn array_index_assignment_mutates_shared_storage() {
        let result = run_source("fn main(){ var a = [1,2]; assertEq(a[0], 1); a[0] = 3; assertEq(a[0], 3); }");
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn assert_eq_failure_is_a_runtime_error() {
        let result = run_source("fn main(){ assertEq(1, 2); }");
        let err = result.expect_err("should fail");
        assert!(err.message.contains("assertion error"), "{err}");
    }

    #[test]
    fn missing_main_is_a_runtime_error() {
        let result = run_source("fn helper(){}");
        let err = result.expect_err("should fail");
        assert!(err.message.contains("function `main` is not found"), "{err}");
    }

    #[test]
    fn print_str_routes_through_host_stdout() {
        let file = parse("fn main(){ printStr(\"hi\"); }", "t.ug").unwrap();
        assert!(analyze(&file).success);
        let captured = Rc::new(RefCell::new(String::new()));
        let sink = captured.clone();
        let options = HostOptions::with_stdout(move |s| sink.borrow_mut().push_str(s));
        run(&file, &options).expect("should succeed");
        assert_eq!(*captured.borrow(), "hi");
    }

    #[test]
    fn loop_body_reuses_the_same_variable_slot_across_iterations() {
        let result = run_source("fn main(){ var total = 0; var i = 0; loop { if i == 3 { break; } total = total + i; i = i + 1; } assertEq(total, 3); }");
        assert!(result.is_ok(), "{result:?}");
    }
}
