//! The native standard library: a fixed set of functions known to the
//! analyzer by signature and to the evaluator by handler, installed into
//! each root scope before either pass runs.
//!
//! Grounded in the teacher's old `interpreter::Interpreter::run_fn_call`,
//! which dispatches on a call's callee name against a small hardcoded set
//! (`"print"` et al.) — generalized here into a declarative table so the
//! analyzer's signatures and the evaluator's handlers can't drift apart,
//! and widened past `print` to the full set this language ships with.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::error;

use crate::evaluator::{format_number, new_slot, FunctionValue, HostOptions, RunningEnv, RuntimeError, Value};
use crate::scope::Scope;
use crate::symbol::{NativeFuncSymbol, Symbol};
use crate::types::Type;

/// Registers every native function's signature into the analyzer's root
/// scope, so calls to `printStr`, `assertEq`, and the rest type-check
/// before a single user declaration is seen.
pub fn install_analyzer(scope: &mut Scope<Symbol>) {
    let entries: [(&str, Vec<Type>, Type); 9] = [
        ("printStr", vec![Type::string()], Type::Void),
        ("printNum", vec![Type::number()], Type::Void),
        ("assertEq", vec![Type::number(), Type::number()], Type::Void),
        ("getUnixtime", vec![], Type::number()),
        ("concatStr", vec![Type::string(), Type::string()], Type::string()),
        ("toString", vec![Type::number()], Type::string()),
        ("insert", vec![Type::array(), Type::number(), Type::Any], Type::Void),
        ("removeAt", vec![Type::array(), Type::number()], Type::Void),
        ("count", vec![Type::array()], Type::number()),
    ];
    for (name, params, ret_ty) in entries {
        scope.define(name, Symbol::NativeFunc(NativeFuncSymbol { params, ret_ty }));
    }
}

/// Registers every native function's handler into the evaluator's root
/// environment, matching the names declared by [`install_analyzer`].
pub fn install_runtime(env: &mut RunningEnv) {
    define_native(env, "printStr", |args, options| {
        let s = expect_string(args, 0, "printStr")?;
        options.write_stdout(&s);
        Ok(Value::Void)
    });
    define_native(env, "printNum", |args, options| {
        let n = expect_number(args, 0, "printNum")?;
        options.write_stdout(&format_number(n));
        Ok(Value::Void)
    });
    define_native(env, "assertEq", |args, _options| {
        let actual = expect_number(args, 0, "assertEq")?;
        let expected = expect_number(args, 1, "assertEq")?;
        if actual != expected {
            let err = RuntimeError::new(
                format!(
                    "assertion error. expected `{}`, actual `{}`.",
                    format_number(expected),
                    format_number(actual)
                ),
                None,
            );
            error!("{err}");
            return Err(err);
        }
        Ok(Value::Void)
    });
    define_native(env, "getUnixtime", |_args, _options| {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(Value::Number(seconds as f64))
    });
    define_native(env, "concatStr", |args, _options| {
        let a = expect_string(args, 0, "concatStr")?;
        let b = expect_string(args, 1, "concatStr")?;
        Ok(Value::String(a + &b))
    });
    define_native(env, "toString", |args, _options| {
        let n = expect_number(args, 0, "toString")?;
        Ok(Value::String(format_number(n)))
    });
    define_native(env, "insert", |args, _options| {
        let array = expect_array(args, 0, "insert")?;
        let index = expect_number(args, 1, "insert")? as usize;
        let item = args.get(2).cloned().unwrap_or(Value::Void);
        let mut items = array.0.borrow_mut();
        if index > items.len() {
            return Err(RuntimeError::new(format!("index out of bounds: `{index}`"), None));
        }
        items.insert(index, new_slot(item));
        Ok(Value::Void)
    });
    define_native(env, "removeAt", |args, _options| {
        let array = expect_array(args, 0, "removeAt")?;
        let index = expect_number(args, 1, "removeAt")? as usize;
        let mut items = array.0.borrow_mut();
        if index >= items.len() {
            return Err(RuntimeError::new(format!("index out of bounds: `{index}`"), None));
        }
        items.remove(index);
        Ok(Value::Void)
    });
    define_native(env, "count", |args, _options| {
        let array = expect_array(args, 0, "count")?;
        Ok(Value::Number(array.0.borrow().len() as f64))
    });
}

fn define_native(
    env: &mut RunningEnv,
    name: &str,
    handler: impl Fn(&[Value], &HostOptions) -> Result<Value, RuntimeError> + 'static,
) {
    let value = Value::Function(FunctionValue::Native {
        name: name.to_owned(),
        handler: Rc::new(handler),
    });
    env.define(name, new_slot(value));
}

fn expect_string(args: &[Value], index: usize, fn_name: &str) -> Result<String, RuntimeError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(RuntimeError::new(
            format!("`{fn_name}` expected a string argument, found `{}`", other.type_name()),
            None,
        )),
        None => Err(RuntimeError::new(format!("`{fn_name}` is missing an argument"), None)),
    }
}

fn expect_number(args: &[Value], index: usize, fn_name: &str) -> Result<f64, RuntimeError> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(RuntimeError::new(
            format!("`{fn_name}` expected a number argument, found `{}`", other.type_name()),
            None,
        )),
        None => Err(RuntimeError::new(format!("`{fn_name}` is missing an argument"), None)),
    }
}

fn expect_array(args: &[Value], index: usize, fn_name: &str) -> Result<crate::evaluator::ArrayRef, RuntimeError> {
    match args.get(index) {
        Some(Value::Array(a)) => Ok(a.clone()),
        Some(other) => Err(RuntimeError::new(
            format!("`{fn_name}` expected an array argument, found `{}`", other.type_name()),
            None,
        )),
        None => Err(RuntimeError::new(format!("`{fn_name}` is missing an argument"), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::evaluator::run;
    use crate::parser::parse;
    use std::cell::RefCell;

    #[test]
    fn analyzer_rejects_unknown_native_function() {
        let file = parse("fn main(){ unknownFn(1); }", "t.ug").unwrap();
        let outcome = analyze(&file);
        assert!(!outcome.success);
    }

    #[test]
    fn concat_str_and_to_string_compose() {
        let file = parse(
            "fn main(){ printStr(concatStr(\"n=\", toString(3))); }",
            "t.ug",
        )
        .unwrap();
        assert!(analyze(&file).success);
        let out = Rc::new(RefCell::new(String::new()));
        let sink = out.clone();
        let options = HostOptions::with_stdout(move |s| sink.borrow_mut().push_str(s));
        run(&file, &options).expect("should succeed");
        assert_eq!(*out.borrow(), "n=3");
    }

    #[test]
    fn array_helpers_mutate_the_shared_array() {
        let file = parse(
            "fn main(){ var a = [1,2]; insert(a, 1, 9); assertEq(count(a), 3); removeAt(a, 0); assertEq(count(a), 2); }",
            "t.ug",
        )
        .unwrap();
        assert!(analyze(&file).success, "{:?}", analyze(&file).errors);
        run(&file, &HostOptions::silent()).expect("should succeed");
    }
}
