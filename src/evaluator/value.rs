//! Runtime values and the control-flow signal threaded through evaluation.
//!
//! Grounded in the teacher's old `interpreter::VariableType`, generalized
//! from a flat enum of primitives into one that also carries arrays and
//! structs as `Rc<RefCell<_>>` handles, so that `var a = [1]; var b = a;`
//! gives `b` a second reference to the same storage rather than a copy —
//! the reference semantics the array/struct scenarios in the language
//! require.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::diagnostics::Pos;
use crate::scope::Scope;

use super::HostOptions;

/// A mutable storage cell: a variable binding, a struct field, or an
/// array element. Sharing an `Rc` to the same slot is what gives arrays,
/// structs and closures their reference semantics. `None` means "declared,
/// never assigned" — the one runtime state the analyzer's own `Pending`
/// check mirrors defensively (see `read_slot`).
pub type Slot = Rc<RefCell<Option<Value>>>;

pub fn new_slot(value: Value) -> Slot {
    Rc::new(RefCell::new(Some(value)))
}

pub fn new_undefined_slot() -> Slot {
    Rc::new(RefCell::new(None))
}

/// Reads a slot's current value, producing `describe()`'s message at
/// `position` if it was declared but never assigned.
pub fn read_slot(slot: &Slot, position: Pos, describe: impl FnOnce() -> String) -> Result<Value, RuntimeError> {
    slot.borrow().clone().ok_or_else(|| RuntimeError::new(describe(), Some(position)))
}

#[derive(Debug, Clone)]
pub struct ArrayRef(pub Rc<RefCell<Vec<Slot>>>);

impl ArrayRef {
    pub fn new(items: Vec<Slot>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }
}

impl PartialEq for ArrayRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
pub struct StructRef {
    pub name: String,
    pub fields: Rc<RefCell<std::collections::HashMap<String, Slot>>>,
}

impl PartialEq for StructRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Rc::ptr_eq(&self.fields, &other.fields)
    }
}

pub type NativeHandler = Rc<dyn Fn(&[Value], &HostOptions) -> Result<Value, RuntimeError>>;

/// A callable value: a user-defined function closes over the environment
/// it was declared in (shared slots, via [`Scope::fork`]); a native
/// function is a handler installed by `crate::builtins`.
#[derive(Clone)]
pub enum FunctionValue {
    User {
        decl: Rc<FunctionDecl>,
        env: Scope<Slot>,
    },
    Native {
        name: String,
        handler: NativeHandler,
    },
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::User { decl, .. } => write!(f, "FunctionValue::User({})", decl.name),
            FunctionValue::Native { name, .. } => write!(f, "FunctionValue::Native({name})"),
        }
    }
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FunctionValue::User { decl: a, .. }, FunctionValue::User { decl: b, .. }) => Rc::ptr_eq(a, b),
            (FunctionValue::Native { handler: a, .. }, FunctionValue::Native { handler: b, .. }) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Number(f64),
    Bool(bool),
    Char(char),
    String(String),
    Array(ArrayRef),
    Struct(StructRef),
    Function(FunctionValue),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Function(_) => "function",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, slot) in a.0.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match slot.borrow().as_ref() {
                        Some(v) => write!(f, "{v}")?,
                        None => write!(f, "<undefined>")?,
                    }
                }
                write!(f, "]")
            }
            Value::Struct(s) => write!(f, "{} {{ .. }}", s.name),
            Value::Function(func) => match func {
                FunctionValue::User { decl, .. } => write!(f, "<function {}>", decl.name),
                FunctionValue::Native { name, .. } => write!(f, "<native function {name}>"),
            },
        }
    }
}

/// `Uguisu` numbers are `f64`; integral results print without a trailing
/// `.0` the way the host language's own numeric literals read.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    pub position: Option<Pos>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, position: impl Into<Option<Pos>>) -> Self {
        Self {
            message: message.into(),
            position: position.into(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} ({pos})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Non-local control flow threaded through `eval_expr`/`exec_step` via
/// `Result`'s `?` operator: an ordinary runtime failure, an in-flight
/// `return`, or an in-flight `break`. Resolved only at the two places the
/// language defines a boundary for it — a loop catches `Break`, a
/// function call catches `Return`.
#[derive(Debug, Clone)]
pub enum Signal {
    Error(RuntimeError),
    Return(Value),
    Break,
}

impl From<RuntimeError> for Signal {
    fn from(err: RuntimeError) -> Self {
        Signal::Error(err)
    }
}

pub type EvalResult<T> = Result<T, Signal>;
