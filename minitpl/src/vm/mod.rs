use std::collections::BTreeMap;

use crate::compiler::ast::{
    BinOpKind, Binding, DeclKind, Declaration, Expr, ForInit, IterKind, Procedure, Stmt,
    UnaryOpKind,
};
use crate::context::Context;
use crate::environment::Environment;
use crate::error::{Error, ErrorKind};
use crate::output::Output;
use crate::utils::escape_value;
use crate::value::{ops, Value};

#[cfg(feature = "fuel")]
use crate::vm::fuel::FuelTracker;

#[cfg(feature = "fuel")]
pub(crate) mod fuel;

/// A render-local variable.
struct Local {
    value: Value,
    constant: bool,
}

/// The state of a single render.
///
/// All declarations and assignments end up in one flat frame of locals
/// which shadows the context.  The context itself is only ever read.
pub(crate) struct State<'ctx> {
    ctx: &'ctx Context,
    locals: BTreeMap<String, Local>,
    #[cfg(feature = "fuel")]
    fuel_tracker: Option<std::sync::Arc<FuelTracker>>,
}

impl<'ctx> State<'ctx> {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(local) = self.locals.get(name) {
            return Some(local.value.clone());
        }
        if let Some(value) = self.ctx.get(name) {
            return Some(value.clone());
        }
        match name {
            "undefined" => Some(Value::UNDEFINED),
            "NaN" => Some(Value::from(f64::NAN)),
            "Infinity" => Some(Value::from(f64::INFINITY)),
            _ => None,
        }
    }

    fn load(&self, name: &str) -> Result<Value, Error> {
        match self.lookup(name) {
            Some(value) => Ok(value),
            None => Err(Error::new(
                ErrorKind::UndefinedError,
                format!("`{name}` is not defined"),
            )),
        }
    }

    fn declare(&mut self, kind: DeclKind, name: &str, value: Option<Value>) {
        let constant = kind == DeclKind::Const;
        match value {
            Some(value) => {
                self.locals
                    .insert(name.to_string(), Local { value, constant });
            }
            // `var x;` keeps an existing binding
            None if kind == DeclKind::Var && self.locals.contains_key(name) => {}
            None => {
                self.locals.insert(
                    name.to_string(),
                    Local {
                        value: Value::UNDEFINED,
                        constant,
                    },
                );
            }
        }
    }

    fn assign(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match self.locals.get_mut(name) {
            Some(local) if local.constant => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("assignment to constant variable `{name}`"),
            )),
            Some(local) => {
                local.value = value;
                Ok(())
            }
            None => {
                trace!(name, "creating render local from assignment");
                self.locals.insert(
                    name.to_string(),
                    Local {
                        value,
                        constant: false,
                    },
                );
                Ok(())
            }
        }
    }

    /// Consumes one unit of fuel per statement or loop iteration.
    #[inline]
    fn track_fuel(&self) -> Result<(), Error> {
        #[cfg(feature = "fuel")]
        if let Some(ref tracker) = self.fuel_tracker {
            ok!(tracker.track());
        }
        Ok(())
    }
}

/// Describes a callee for error messages.
fn describe_callee(expr: &Expr) -> String {
    match expr {
        Expr::Var(name) => name.clone(),
        Expr::This => "this".into(),
        Expr::GetAttr { expr, name } => format!("{}.{}", describe_callee(expr), name),
        Expr::GetItem { expr, .. } => format!("{}[...]", describe_callee(expr)),
        Expr::Call { expr, .. } => format!("{}(...)", describe_callee(expr)),
        _ => "expression".into(),
    }
}

fn not_a_function(callee: &Expr) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("`{}` is not a function", describe_callee(callee)),
    )
}

/// Applies a binary operator that evaluates both of its operands.
fn binop(op: BinOpKind, lhs: &Value, rhs: &Value) -> Value {
    match op {
        BinOpKind::Add => ops::add(lhs, rhs),
        BinOpKind::Sub => ops::sub(lhs, rhs),
        BinOpKind::Mul => ops::mul(lhs, rhs),
        BinOpKind::Div => ops::div(lhs, rhs),
        BinOpKind::Rem => ops::rem(lhs, rhs),
        BinOpKind::Eq => Value::from(ops::loose_eq(lhs, rhs)),
        BinOpKind::Ne => Value::from(!ops::loose_eq(lhs, rhs)),
        BinOpKind::StrictEq => Value::from(ops::strict_eq(lhs, rhs)),
        BinOpKind::StrictNe => Value::from(!ops::strict_eq(lhs, rhs)),
        BinOpKind::Lt => Value::from(ops::less_than(lhs, rhs) == Some(true)),
        BinOpKind::Gt => Value::from(ops::less_than(rhs, lhs) == Some(true)),
        BinOpKind::Lte => Value::from(ops::less_than(rhs, lhs) == Some(false)),
        BinOpKind::Gte => Value::from(ops::less_than(lhs, rhs) == Some(false)),
        BinOpKind::ScAnd | BinOpKind::ScOr | BinOpKind::Nullish => {
            unreachable!("short-circuit operators are evaluated lazily")
        }
    }
}

/// Helps to evaluate something.
pub struct Vm<'env> {
    #[cfg_attr(not(feature = "fuel"), allow(unused))]
    env: &'env Environment,
}

impl<'env> Vm<'env> {
    /// Creates a new VM.
    pub fn new(env: &'env Environment) -> Vm<'env> {
        Vm { env }
    }

    /// Evaluates a procedure against a context, writing into the output.
    pub fn eval(
        &self,
        procedure: &Procedure,
        ctx: &Context,
        out: &mut Output,
    ) -> Result<(), Error> {
        let mut state = State {
            ctx,
            locals: BTreeMap::new(),
            #[cfg(feature = "fuel")]
            fuel_tracker: self.env.fuel().map(FuelTracker::new),
        };
        self.exec_block(&mut state, &procedure.body, out)
    }

    fn exec_block(&self, state: &mut State, body: &[Stmt], out: &mut Output) -> Result<(), Error> {
        for stmt in body {
            ok!(self.exec_stmt(state, stmt, out));
        }
        Ok(())
    }

    fn exec_stmt(&self, state: &mut State, stmt: &Stmt, out: &mut Output) -> Result<(), Error> {
        ok!(state.track_fuel());
        match stmt {
            Stmt::EmitRaw(text) => ok!(out.write_str(text).map_err(Error::from)),
            Stmt::EmitExpr(expr) => {
                let value = ok!(self.eval_expr(state, expr));
                ok!(out
                    .write_value(&escape_value(value))
                    .map_err(Error::from));
            }
            Stmt::IfCond {
                branches,
                else_body,
            } => {
                let mut body = else_body;
                for branch in branches {
                    if ok!(self.eval_expr(state, &branch.expr)).is_true() {
                        body = &branch.body;
                        break;
                    }
                }
                ok!(self.exec_block(state, body, out));
            }
            Stmt::WhileLoop { expr, body } => {
                while ok!(self.eval_expr(state, expr)).is_true() {
                    ok!(state.track_fuel());
                    ok!(self.exec_block(state, body, out));
                }
            }
            Stmt::ForLoop {
                init,
                test,
                update,
                body,
            } => {
                match init {
                    Some(ForInit::Declare(decl)) => ok!(self.exec_declaration(state, decl)),
                    Some(ForInit::Expr(expr)) => {
                        ok!(self.eval_expr(state, expr));
                    }
                    None => {}
                }
                loop {
                    if let Some(test) = test {
                        if !ok!(self.eval_expr(state, test)).is_true() {
                            break;
                        }
                    }
                    ok!(state.track_fuel());
                    ok!(self.exec_block(state, body, out));
                    if let Some(update) = update {
                        ok!(self.eval_expr(state, update));
                    }
                }
            }
            Stmt::ForEach {
                binding,
                kind,
                iter,
                body,
            } => {
                let iterable = ok!(self.eval_expr(state, iter));
                let items = match kind {
                    IterKind::Of => ok!(ops::iter_values(&iterable)),
                    IterKind::In => ops::iter_keys(&iterable),
                };
                for item in items {
                    ok!(state.track_fuel());
                    ok!(self.bind_loop_var(state, binding, item));
                    ok!(self.exec_block(state, body, out));
                }
            }
        }
        Ok(())
    }

    fn exec_declaration(&self, state: &mut State, decl: &Declaration) -> Result<(), Error> {
        for (name, init) in &decl.items {
            let value = match init {
                Some(expr) => Some(ok!(self.eval_expr(state, expr))),
                None => None,
            };
            state.declare(decl.kind, name, value);
        }
        Ok(())
    }

    fn bind_loop_var(&self, state: &mut State, binding: &Binding, value: Value) -> Result<(), Error> {
        match binding.kind {
            Some(kind) => {
                state.declare(kind, &binding.name, Some(value));
                Ok(())
            }
            None => state.assign(&binding.name, value),
        }
    }

    /// Evaluates a single expression.
    pub(crate) fn eval_expr(&self, state: &mut State, expr: &Expr) -> Result<Value, Error> {
        Ok(match expr {
            Expr::Var(name) => ok!(state.load(name)),
            Expr::This => state.ctx.as_value(),
            Expr::Const(value) => value.clone(),
            Expr::List(items) => {
                let mut rv = Vec::with_capacity(items.len());
                for item in items {
                    rv.push(ok!(self.eval_expr(state, item)));
                }
                Value::from(rv)
            }
            Expr::GetAttr { expr, name } => {
                let value = ok!(self.eval_expr(state, expr));
                ok!(ops::get_attr(&value, name))
            }
            Expr::GetItem { expr, subscript } => {
                let value = ok!(self.eval_expr(state, expr));
                let key = ok!(self.eval_expr(state, subscript));
                ok!(ops::get_item(&value, &key))
            }
            Expr::Call { expr, args } => ok!(self.eval_call(state, expr, args)),
            Expr::UnaryOp { op, expr } => {
                if let (UnaryOpKind::TypeOf, Expr::Var(name)) = (op, &**expr) {
                    // typeof on an undeclared name is not an error
                    let value = state.lookup(name).unwrap_or_default();
                    return Ok(Value::from(value.type_of()));
                }
                let value = ok!(self.eval_expr(state, expr));
                match op {
                    UnaryOpKind::Not => Value::from(!value.is_true()),
                    UnaryOpKind::Neg => ops::neg(&value),
                    UnaryOpKind::Pos => Value::from(value.to_number()),
                    UnaryOpKind::TypeOf => Value::from(value.type_of()),
                }
            }
            Expr::BinOp { op, left, right } => {
                let lhs = ok!(self.eval_expr(state, left));
                match op {
                    BinOpKind::ScAnd if !lhs.is_true() => lhs,
                    BinOpKind::ScOr if lhs.is_true() => lhs,
                    BinOpKind::Nullish if !lhs.is_nullish() => lhs,
                    BinOpKind::ScAnd | BinOpKind::ScOr | BinOpKind::Nullish => {
                        ok!(self.eval_expr(state, right))
                    }
                    op => {
                        let rhs = ok!(self.eval_expr(state, right));
                        binop(*op, &lhs, &rhs)
                    }
                }
            }
            Expr::IfExpr {
                test,
                true_expr,
                false_expr,
            } => {
                if ok!(self.eval_expr(state, test)).is_true() {
                    ok!(self.eval_expr(state, true_expr))
                } else {
                    ok!(self.eval_expr(state, false_expr))
                }
            }
            Expr::Assign { name, op, value } => {
                let current = match op {
                    Some(_) => Some(ok!(state.load(name))),
                    None => None,
                };
                let value = ok!(self.eval_expr(state, value));
                let value = match (op, current) {
                    (Some(op), Some(current)) => binop(*op, &current, &value),
                    _ => value,
                };
                ok!(state.assign(name, value.clone()));
                value
            }
            Expr::Update {
                name,
                increment,
                prefix,
            } => {
                let old = ok!(state.load(name)).to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                ok!(state.assign(name, Value::from(new)));
                Value::from(if *prefix { new } else { old })
            }
        })
    }

    fn eval_args(&self, state: &mut State, args: &[Expr]) -> Result<Vec<Value>, Error> {
        let mut rv = Vec::with_capacity(args.len());
        for arg in args {
            rv.push(ok!(self.eval_expr(state, arg)));
        }
        Ok(rv)
    }

    fn eval_call(&self, state: &mut State, callee: &Expr, args: &[Expr]) -> Result<Value, Error> {
        let (this, name) = match callee {
            Expr::GetAttr { expr, name } => (ok!(self.eval_expr(state, expr)), name.clone()),
            Expr::GetItem { expr, subscript } => {
                let this = ok!(self.eval_expr(state, expr));
                let key = ok!(self.eval_expr(state, subscript));
                (this, key.to_string())
            }
            _ => {
                let func = ok!(self.eval_expr(state, callee));
                let args = ok!(self.eval_args(state, args));
                if !func.is_callable() {
                    return Err(not_a_function(callee));
                }
                return func.call(&args);
            }
        };

        let prop = ok!(ops::get_attr(&this, &name));
        let args = ok!(self.eval_args(state, args));
        if prop.is_callable() {
            return prop.call(&args);
        }
        #[cfg(feature = "builtins")]
        {
            if let Some(rv) = crate::value::methods::call_method(&this, &name, &args) {
                return Ok(rv);
            }
        }
        Err(not_a_function(callee))
    }
}
