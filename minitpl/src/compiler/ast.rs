use crate::value::Value;

/// A single step of a template as it comes out of the parser.
///
/// Steps are flat: blocks opened by control fragments are only matched up
/// by the code generator.
#[derive(Debug, Clone)]
pub enum Step {
    /// Literal text emitted verbatim.
    Literal(String),
    /// A control fragment (one that contains `{` or `}`).
    Control(Vec<ControlOp>),
    /// An expression fragment whose value is escaped and emitted.
    Expr(Expr),
}

/// One block operation within a control fragment.
///
/// A fragment like `} else if (x) {` holds the operations `Close` and
/// `ElseIf`.
#[derive(Debug, Clone)]
pub enum ControlOp {
    /// `if (expr) {`
    If(Expr),
    /// `else if (expr) {`
    ElseIf(Expr),
    /// `else {`
    Else,
    /// `while (expr) {`
    While(Expr),
    /// `for (...) {`
    For(ForHead),
    /// `}`
    Close,
    /// An empty statement (`;`).
    Empty,
}

/// The header of a `for` loop.
#[derive(Debug, Clone)]
pub enum ForHead {
    /// `for (init; test; update)`
    Classic {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
    },
    /// `for (binding of iter)` and `for (binding in iter)`
    Each {
        binding: Binding,
        kind: IterKind,
        iter: Expr,
    },
}

/// The initializer clause of a classic `for` loop.
#[derive(Debug, Clone)]
pub enum ForInit {
    Declare(Declaration),
    Expr(Expr),
}

/// The declaration keyword used to introduce a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

/// A variable declaration such as `let i = 0, j = 1`.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub kind: DeclKind,
    pub items: Vec<(String, Option<Expr>)>,
}

/// The loop variable of a `for ... of` / `for ... in` loop.
#[derive(Debug, Clone)]
pub struct Binding {
    pub kind: Option<DeclKind>,
    pub name: String,
}

/// Whether a loop iterates values (`of`) or keys (`in`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterKind {
    Of,
    In,
}

/// A compiled template: a tree of statements.
#[derive(Debug, Clone, Default)]
pub struct Procedure {
    pub body: Vec<Stmt>,
}

/// One `if` or `else if` branch of a conditional.
#[derive(Debug, Clone)]
pub struct CondBranch {
    pub expr: Expr,
    pub body: Vec<Stmt>,
}

/// A statement of a compiled template.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Emits literal text.
    EmitRaw(String),
    /// Evaluates an expression and emits its escaped value.
    EmitExpr(Expr),
    /// An `if` with its `else if` branches and an optional `else` body.
    ///
    /// The first branch whose condition is truthy runs, otherwise the
    /// `else` body does.
    IfCond {
        branches: Vec<CondBranch>,
        else_body: Vec<Stmt>,
    },
    /// A `while` loop.
    WhileLoop { expr: Expr, body: Vec<Stmt> },
    /// A classic three clause `for` loop.
    ForLoop {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Vec<Stmt>,
    },
    /// A `for ... of` or `for ... in` loop.
    ForEach {
        binding: Binding,
        kind: IterKind,
        iter: Expr,
        body: Vec<Stmt>,
    },
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Not,
    Neg,
    Pos,
    TypeOf,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Lte,
    Gt,
    Gte,
    ScAnd,
    ScOr,
    Nullish,
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A free variable.
    Var(String),
    /// `this`, which is the context as an object.
    This,
    /// A literal value.
    Const(Value),
    /// An array literal.
    List(Vec<Expr>),
    /// `expr.name`
    GetAttr { expr: Box<Expr>, name: String },
    /// `expr[subscript]`
    GetItem {
        expr: Box<Expr>,
        subscript: Box<Expr>,
    },
    /// `expr(args)`
    Call { expr: Box<Expr>, args: Vec<Expr> },
    /// A unary operation.
    UnaryOp { op: UnaryOpKind, expr: Box<Expr> },
    /// A binary operation.
    BinOp {
        op: BinOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `test ? true_expr : false_expr`
    IfExpr {
        test: Box<Expr>,
        true_expr: Box<Expr>,
        false_expr: Box<Expr>,
    },
    /// `name = value` or a compound assignment like `name += value`.
    Assign {
        name: String,
        op: Option<BinOpKind>,
        value: Box<Expr>,
    },
    /// `name++`, `++name`, `name--` and `--name`.
    Update {
        name: String,
        increment: bool,
        prefix: bool,
    },
}
