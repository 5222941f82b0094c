use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;

use crate::compiler::ast::{
    self, BinOpKind, Binding, ControlOp, DeclKind, Declaration, Expr, ForHead, ForInit, IterKind,
    Step, UnaryOpKind,
};
use crate::compiler::lexer::{scan, tokenize, Segment};
use crate::compiler::tokens::Token;
use crate::error::{Error, ErrorKind};
use crate::value::Value;

const MAX_RECURSION: usize = 150;
const RESERVED_WORDS: [&str; 30] = [
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "export",
    "extends",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "let",
    "new",
    "return",
    "super",
    "switch",
    "throw",
    "try",
    "var",
    "void",
    "while",
];

fn unexpected<D: fmt::Display>(unexpected: D, expected: &str) -> Error {
    Error::new(
        ErrorKind::SyntaxError,
        format!("unexpected {unexpected}, expected {expected}"),
    )
}

fn unexpected_eof(expected: &str) -> Error {
    unexpected("end of input", expected)
}

fn syntax_error(msg: Cow<'static, str>) -> Error {
    Error::new(ErrorKind::SyntaxError, msg)
}

fn make_const<V: Into<Value>>(value: V) -> Expr {
    Expr::Const(value.into())
}

macro_rules! syntax_error {
    ($msg:expr) => {{
        return Err(syntax_error(Cow::Borrowed($msg)));
    }};
    ($msg:expr, $($tt:tt)*) => {{
        return Err(syntax_error(Cow::Owned(format!($msg, $($tt)*))));
    }};
}

macro_rules! expect_token {
    ($parser:expr, $expectation:expr) => {{
        match $parser.stream.next() {
            Some(rv) => rv,
            None => return Err(unexpected_eof($expectation)),
        }
    }};
    ($parser:expr, $match:pat, $expectation:expr) => {{
        match $parser.stream.next() {
            Some(token @ $match) => token,
            Some(token) => return Err(unexpected(token, $expectation)),
            None => return Err(unexpected_eof($expectation)),
        }
    }};
    ($parser:expr, $match:pat => $target:expr, $expectation:expr) => {{
        match $parser.stream.next() {
            Some($match) => $target,
            Some(token) => return Err(unexpected(token, $expectation)),
            None => return Err(unexpected_eof($expectation)),
        }
    }};
}

macro_rules! matches_token {
    ($p:expr, $match:pat) => {
        matches!($p.stream.current(), Some($match))
    };
}

macro_rules! skip_token {
    ($p:expr, $match:pat) => {
        match $p.stream.current() {
            Some($match) => {
                $p.stream.next();
                true
            }
            _ => false,
        }
    };
}

struct TokenStream<'a> {
    tokens: VecDeque<Token<'a>>,
}

impl<'a> TokenStream<'a> {
    fn new(tokens: Vec<Token<'a>>) -> TokenStream<'a> {
        TokenStream {
            tokens: tokens.into(),
        }
    }

    /// Advance the stream.
    fn next(&mut self) -> Option<Token<'a>> {
        self.tokens.pop_front()
    }

    /// Look at the current token
    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.front()
    }

    /// Look `n` tokens ahead of the current one.
    fn look(&self, n: usize) -> Option<&Token<'a>> {
        self.tokens.get(n)
    }
}

/// Parses the tokens of a single fragment.
struct Parser<'a> {
    stream: TokenStream<'a>,
    depth: usize,
}

macro_rules! binop {
    ($func:ident, $next:ident, { $($tok:tt)* }) => {
        fn $func(&mut self) -> Result<Expr, Error> {
            let mut left = ok!(self.$next());
            let depth = self.depth;
            loop {
                let op = match self.stream.current() {
                    $($tok)*
                    _ => break,
                };
                self.stream.next();
                // every operator in a chain nests the left side one level deeper
                ok!(self.descend());
                let right = ok!(self.$next());
                left = Expr::BinOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                };
            }
            self.depth = depth;
            Ok(left)
        }
    };
}

macro_rules! with_recursion_guard {
    ($parser:expr, $expr:expr) => {{
        ok!($parser.descend());
        let rv = $expr;
        $parser.depth -= 1;
        rv
    }};
}

fn make_update(target: Expr, increment: bool, prefix: bool) -> Result<Expr, Error> {
    match target {
        Expr::Var(name) => Ok(Expr::Update {
            name,
            increment,
            prefix,
        }),
        _ => syntax_error!("invalid operand for increment or decrement"),
    }
}

fn check_binding_name(name: &str) -> Result<(), Error> {
    if RESERVED_WORDS.contains(&name) || matches!(name, "true" | "false" | "null" | "this") {
        syntax_error!("unexpected keyword `{}`, expected identifier", name);
    }
    Ok(())
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token<'a>>) -> Parser<'a> {
        Parser {
            stream: TokenStream::new(tokens),
            depth: 0,
        }
    }

    /// Enters one more level of nesting.
    fn descend(&mut self) -> Result<(), Error> {
        self.depth += 1;
        if self.depth > MAX_RECURSION {
            syntax_error!("template exceeds maximum recursion limits");
        }
        Ok(())
    }

    /// Parses an expression fragment and asserts that nothing follows it.
    ///
    /// An empty fragment evaluates to `undefined`.
    fn parse_standalone_expr(&mut self) -> Result<Expr, Error> {
        if self.stream.current().is_none() {
            return Ok(make_const(Value::UNDEFINED));
        }
        let expr = ok!(self.parse_expr());
        match self.stream.next() {
            Some(token) => Err(unexpected(token, "end of expression")),
            None => Ok(expr),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        with_recursion_guard!(self, self.parse_assignment())
    }

    fn parse_assignment(&mut self) -> Result<Expr, Error> {
        let target = ok!(self.parse_conditional());
        let op = match self.stream.current() {
            Some(Token::Assign) => None,
            Some(Token::PlusAssign) => Some(BinOpKind::Add),
            Some(Token::MinusAssign) => Some(BinOpKind::Sub),
            Some(Token::MulAssign) => Some(BinOpKind::Mul),
            Some(Token::DivAssign) => Some(BinOpKind::Div),
            Some(Token::ModAssign) => Some(BinOpKind::Rem),
            _ => return Ok(target),
        };
        self.stream.next();
        let name = match target {
            Expr::Var(name) => name,
            _ => syntax_error!("invalid assignment target"),
        };
        let value = ok!(self.parse_expr());
        Ok(Expr::Assign {
            name,
            op,
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> Result<Expr, Error> {
        let test = ok!(self.parse_or());
        if !skip_token!(self, Token::Question) {
            return Ok(test);
        }
        let true_expr = ok!(self.parse_expr());
        expect_token!(self, Token::Colon, "`:`");
        let false_expr = ok!(self.parse_expr());
        Ok(Expr::IfExpr {
            test: Box::new(test),
            true_expr: Box::new(true_expr),
            false_expr: Box::new(false_expr),
        })
    }

    binop!(parse_or, parse_and, {
        Some(Token::Or) => BinOpKind::ScOr,
        Some(Token::Nullish) => BinOpKind::Nullish,
    });
    binop!(parse_and, parse_equality, {
        Some(Token::And) => BinOpKind::ScAnd,
    });
    binop!(parse_equality, parse_relational, {
        Some(Token::Eq) => BinOpKind::Eq,
        Some(Token::Ne) => BinOpKind::Ne,
        Some(Token::StrictEq) => BinOpKind::StrictEq,
        Some(Token::StrictNe) => BinOpKind::StrictNe,
    });
    binop!(parse_relational, parse_additive, {
        Some(Token::Lt) => BinOpKind::Lt,
        Some(Token::Lte) => BinOpKind::Lte,
        Some(Token::Gt) => BinOpKind::Gt,
        Some(Token::Gte) => BinOpKind::Gte,
    });
    binop!(parse_additive, parse_multiplicative, {
        Some(Token::Plus) => BinOpKind::Add,
        Some(Token::Minus) => BinOpKind::Sub,
    });
    binop!(parse_multiplicative, parse_unary, {
        Some(Token::Mul) => BinOpKind::Mul,
        Some(Token::Div) => BinOpKind::Div,
        Some(Token::Mod) => BinOpKind::Rem,
    });

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        with_recursion_guard!(self, self.parse_unary_impl())
    }

    fn parse_unary_impl(&mut self) -> Result<Expr, Error> {
        let op = match self.stream.current() {
            Some(Token::Bang) => UnaryOpKind::Not,
            Some(Token::Minus) => UnaryOpKind::Neg,
            Some(Token::Plus) => UnaryOpKind::Pos,
            Some(Token::Ident("typeof")) => UnaryOpKind::TypeOf,
            Some(Token::Increment | Token::Decrement) => {
                let increment = matches!(self.stream.next(), Some(Token::Increment));
                let target = ok!(self.parse_unary());
                return make_update(target, increment, true);
            }
            _ => return self.parse_postfix(),
        };
        self.stream.next();
        Ok(Expr::UnaryOp {
            op,
            expr: Box::new(ok!(self.parse_unary())),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let expr = ok!(self.parse_member());
        let increment = match self.stream.current() {
            Some(Token::Increment) => true,
            Some(Token::Decrement) => false,
            _ => return Ok(expr),
        };
        self.stream.next();
        make_update(expr, increment, false)
    }

    fn parse_member(&mut self) -> Result<Expr, Error> {
        let mut expr = ok!(self.parse_primary());
        let depth = self.depth;
        loop {
            if matches_token!(self, Token::Dot | Token::BracketOpen | Token::ParenOpen) {
                ok!(self.descend());
            }
            if skip_token!(self, Token::Dot) {
                let name = expect_token!(self, Token::Ident(name) => name, "identifier");
                expr = Expr::GetAttr {
                    expr: Box::new(expr),
                    name: name.to_string(),
                };
            } else if skip_token!(self, Token::BracketOpen) {
                let subscript = ok!(self.parse_expr());
                expect_token!(self, Token::BracketClose, "`]`");
                expr = Expr::GetItem {
                    expr: Box::new(expr),
                    subscript: Box::new(subscript),
                };
            } else if skip_token!(self, Token::ParenOpen) {
                let args = ok!(self.parse_args());
                expr = Expr::Call {
                    expr: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, Error> {
        let mut args = Vec::new();
        loop {
            if skip_token!(self, Token::ParenClose) {
                break;
            }
            if !args.is_empty() {
                expect_token!(self, Token::Comma, "`,`");
                if skip_token!(self, Token::ParenClose) {
                    break;
                }
            }
            args.push(ok!(self.parse_expr()));
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        match expect_token!(self, "expression") {
            Token::Ident("true") => Ok(make_const(true)),
            Token::Ident("false") => Ok(make_const(false)),
            Token::Ident("null") => Ok(make_const(())),
            Token::Ident("this") => Ok(Expr::This),
            Token::Ident(name) if RESERVED_WORDS.contains(&name) => {
                syntax_error!("unexpected keyword `{}`", name)
            }
            Token::Ident(name) => Ok(Expr::Var(name.to_string())),
            Token::Str(val) => Ok(make_const(val)),
            Token::String(val) => Ok(make_const(val)),
            Token::Number(val) => Ok(make_const(val)),
            Token::ParenOpen => {
                let expr = ok!(self.parse_expr());
                expect_token!(self, Token::ParenClose, "`)`");
                Ok(expr)
            }
            Token::BracketOpen => self.parse_list_expr(),
            token => syntax_error!("unexpected {}", token),
        }
    }

    fn parse_list_expr(&mut self) -> Result<Expr, Error> {
        let mut items = Vec::new();
        loop {
            if skip_token!(self, Token::BracketClose) {
                break;
            }
            if !items.is_empty() {
                expect_token!(self, Token::Comma, "`,`");
                if skip_token!(self, Token::BracketClose) {
                    break;
                }
            }
            items.push(ok!(self.parse_expr()));
        }
        Ok(Expr::List(items))
    }

    /// Parses a control fragment into its block operations.
    fn parse_control(&mut self) -> Result<Vec<ControlOp>, Error> {
        let mut ops = Vec::new();
        while let Some(token) = self.stream.next() {
            ops.push(match token {
                Token::Semicolon => ControlOp::Empty,
                Token::BraceClose => ControlOp::Close,
                Token::Ident("if") => ControlOp::If(ok!(self.parse_block_condition())),
                Token::Ident("while") => ControlOp::While(ok!(self.parse_block_condition())),
                Token::Ident("for") => ControlOp::For(ok!(self.parse_for_head())),
                Token::Ident("else") => {
                    if skip_token!(self, Token::Ident("if")) {
                        ControlOp::ElseIf(ok!(self.parse_block_condition()))
                    } else {
                        expect_token!(self, Token::BraceOpen, "`{`");
                        ControlOp::Else
                    }
                }
                token => return Err(unexpected(token, "control statement")),
            });
        }
        Ok(ops)
    }

    /// Parses `(expr) {` after `if`, `else if` and `while`.
    fn parse_block_condition(&mut self) -> Result<Expr, Error> {
        expect_token!(self, Token::ParenOpen, "`(`");
        let expr = ok!(self.parse_expr());
        expect_token!(self, Token::ParenClose, "`)`");
        expect_token!(self, Token::BraceOpen, "`{`");
        Ok(expr)
    }

    fn parse_for_head(&mut self) -> Result<ForHead, Error> {
        expect_token!(self, Token::ParenOpen, "`(`");
        let head = ok!(with_recursion_guard!(self, self.parse_for_clauses()));
        expect_token!(self, Token::ParenClose, "`)`");
        expect_token!(self, Token::BraceOpen, "`{`");
        Ok(head)
    }

    fn parse_for_clauses(&mut self) -> Result<ForHead, Error> {
        let decl_kind = match self.stream.current() {
            Some(Token::Ident("var")) => Some(DeclKind::Var),
            Some(Token::Ident("let")) => Some(DeclKind::Let),
            Some(Token::Ident("const")) => Some(DeclKind::Const),
            _ => None,
        };
        let offset = decl_kind.is_some() as usize;

        let each = match (self.stream.look(offset), self.stream.look(offset + 1)) {
            (Some(Token::Ident(name)), Some(Token::Ident(kw @ ("of" | "in")))) => Some((
                name.to_string(),
                if *kw == "of" {
                    IterKind::Of
                } else {
                    IterKind::In
                },
            )),
            _ => None,
        };
        if let Some((name, kind)) = each {
            ok!(check_binding_name(&name));
            for _ in 0..offset + 2 {
                self.stream.next();
            }
            let iter = ok!(self.parse_expr());
            return Ok(ForHead::Each {
                binding: Binding {
                    kind: decl_kind,
                    name,
                },
                kind,
                iter,
            });
        }

        let init = if skip_token!(self, Token::Semicolon) {
            None
        } else {
            let init = match decl_kind {
                Some(kind) => {
                    self.stream.next();
                    ForInit::Declare(ok!(self.parse_declaration(kind)))
                }
                None => ForInit::Expr(ok!(self.parse_expr())),
            };
            expect_token!(self, Token::Semicolon, "`;`");
            Some(init)
        };
        let test = if matches_token!(self, Token::Semicolon) {
            None
        } else {
            Some(ok!(self.parse_expr()))
        };
        expect_token!(self, Token::Semicolon, "`;`");
        let update = if matches_token!(self, Token::ParenClose) {
            None
        } else {
            Some(ok!(self.parse_expr()))
        };
        Ok(ForHead::Classic { init, test, update })
    }

    fn parse_declaration(&mut self, kind: DeclKind) -> Result<Declaration, Error> {
        let mut items = Vec::new();
        loop {
            let name = expect_token!(self, Token::Ident(name) => name, "identifier");
            ok!(check_binding_name(name));
            let value = if skip_token!(self, Token::Assign) {
                Some(ok!(self.parse_expr()))
            } else if kind == DeclKind::Const {
                syntax_error!("missing initializer in const declaration");
            } else {
                None
            };
            items.push((name.to_string(), value));
            if !skip_token!(self, Token::Comma) {
                break;
            }
        }
        Ok(Declaration { kind, items })
    }
}

/// Parses the interior of a single fragment.
///
/// A fragment whose tokens contain a block brace is a control fragment,
/// everything else is an expression fragment.
pub fn parse_fragment(interior: &str) -> Result<Step, Error> {
    let tokens = ok!(tokenize(interior));
    let is_control = tokens.iter().any(Token::is_brace);
    let mut parser = Parser::new(tokens);
    if is_control {
        parser.parse_control().map(Step::Control)
    } else {
        parser.parse_standalone_expr().map(Step::Expr)
    }
}

/// Parses a normalized template into its flat step sequence.
pub fn parse_steps(source: &str) -> Result<Vec<ast::Step>, Error> {
    let mut steps = Vec::new();
    for segment in scan(source) {
        steps.push(match segment {
            Segment::Literal(text) => Step::Literal(text.to_string()),
            Segment::Fragment(interior) => ok!(parse_fragment(interior)),
        });
    }
    Ok(steps)
}

/// Parses a standalone expression.
#[cfg(any(test, feature = "unstable_machinery"))]
pub fn parse_expr(source: &str) -> Result<Expr, Error> {
    let tokens = ok!(tokenize(source));
    Parser::new(tokens).parse_standalone_expr()
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_precedence() {
        let expr = parse_expr("1 + 2 * 3").unwrap();
        assert!(matches!(
            expr,
            Expr::BinOp {
                op: BinOpKind::Add,
                ref right,
                ..
            } if matches!(**right, Expr::BinOp { op: BinOpKind::Mul, .. })
        ));

        let expr = parse_expr("a = b = 1").unwrap();
        assert!(matches!(
            expr,
            Expr::Assign { ref name, op: None, ref value }
                if name == "a" && matches!(**value, Expr::Assign { .. })
        ));

        let expr = parse_expr("!a && b").unwrap();
        assert!(matches!(
            expr,
            Expr::BinOp {
                op: BinOpKind::ScAnd,
                ref left,
                ..
            } if matches!(**left, Expr::UnaryOp { op: UnaryOpKind::Not, .. })
        ));

        let expr = parse_expr("a ? b : c ? d : e").unwrap();
        assert!(matches!(
            expr,
            Expr::IfExpr { ref false_expr, .. } if matches!(**false_expr, Expr::IfExpr { .. })
        ));
    }

    #[test]
    fn test_member_and_calls() {
        let expr = parse_expr("user.name.toUpperCase()").unwrap();
        assert!(matches!(
            expr,
            Expr::Call { ref expr, ref args }
                if args.is_empty() && matches!(**expr, Expr::GetAttr { ref name, .. } if name == "toUpperCase")
        ));
        let expr = parse_expr("items[i + 1]").unwrap();
        assert!(matches!(expr, Expr::GetItem { .. }));
        let expr = parse_expr("[1, 'a',]").unwrap();
        assert!(matches!(expr, Expr::List(ref items) if items.len() == 2));
    }

    #[test]
    fn test_updates() {
        assert!(matches!(
            parse_expr("i++").unwrap(),
            Expr::Update { increment: true, prefix: false, .. }
        ));
        assert!(matches!(
            parse_expr("--i").unwrap(),
            Expr::Update { increment: false, prefix: true, .. }
        ));
        assert_eq!(
            parse_expr("1++").unwrap_err().to_string(),
            "syntax error: invalid operand for increment or decrement"
        );
        assert_eq!(
            parse_expr("a.b = 1").unwrap_err().to_string(),
            "syntax error: invalid assignment target"
        );
    }

    #[test]
    fn test_empty_fragment() {
        assert!(matches!(
            parse_fragment("").unwrap(),
            Step::Expr(Expr::Const(ref value)) if value.is_undefined()
        ));
    }

    #[test]
    fn test_control_fragments() {
        match parse_fragment("} else if (a > 1) {").unwrap() {
            Step::Control(ops) => {
                assert_eq!(ops.len(), 2);
                assert!(matches!(ops[0], ControlOp::Close));
                assert!(matches!(ops[1], ControlOp::ElseIf(_)));
            }
            other => panic!("unexpected step {other:?}"),
        }

        match parse_fragment("for (var i = 0, j; i < 3; i++) {").unwrap() {
            Step::Control(ops) => match &ops[..] {
                [ControlOp::For(ForHead::Classic {
                    init: Some(ForInit::Declare(decl)),
                    test: Some(_),
                    update: Some(_),
                })] => {
                    assert_eq!(decl.kind, DeclKind::Var);
                    assert_eq!(decl.items.len(), 2);
                }
                other => panic!("unexpected ops {other:?}"),
            },
            other => panic!("unexpected step {other:?}"),
        }

        match parse_fragment("for (const item of items) {").unwrap() {
            Step::Control(ops) => assert!(matches!(
                &ops[..],
                [ControlOp::For(ForHead::Each {
                    binding: Binding { kind: Some(DeclKind::Const), .. },
                    kind: IterKind::Of,
                    ..
                })]
            )),
            other => panic!("unexpected step {other:?}"),
        }

        match parse_fragment("for (;;) {").unwrap() {
            Step::Control(ops) => assert!(matches!(
                &ops[..],
                [ControlOp::For(ForHead::Classic {
                    init: None,
                    test: None,
                    update: None
                })]
            )),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_braces_in_strings_are_expressions() {
        assert!(matches!(parse_fragment("'{'").unwrap(), Step::Expr(_)));
    }

    #[test]
    fn test_syntax_errors() {
        let err = parse_fragment("if (a {").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert_eq!(
            err.to_string(),
            "syntax error: unexpected `{`, expected `)`"
        );
        assert_eq!(
            parse_fragment("x = 1; }").unwrap_err().to_string(),
            "syntax error: unexpected `x`, expected control statement"
        );
        assert_eq!(
            parse_fragment("for (const i; i < 1; i++) {")
                .unwrap_err()
                .to_string(),
            "syntax error: missing initializer in const declaration"
        );
        assert_eq!(
            parse_expr("a b").unwrap_err().to_string(),
            "syntax error: unexpected `b`, expected end of expression"
        );
        assert_eq!(
            parse_expr("new Foo").unwrap_err().to_string(),
            "syntax error: unexpected keyword `new`"
        );
        assert_eq!(
            parse_expr("(1").unwrap_err().to_string(),
            "syntax error: unexpected end of input, expected `)`"
        );
    }

    #[test]
    fn test_recursion_limit() {
        let source = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(
            parse_expr(&source).unwrap_err().to_string(),
            "syntax error: template exceeds maximum recursion limits"
        );
        assert!(parse_expr(&format!("{}x", "!".repeat(100))).is_ok());
    }

    #[test]
    fn test_chains_count_against_recursion_limit() {
        for source in [
            format!("0{}", " + 1".repeat(1000)),
            format!("a{}", ".b".repeat(1000)),
            format!("f{}", "()".repeat(1000)),
        ] {
            assert_eq!(
                parse_expr(&source).unwrap_err().to_string(),
                "syntax error: template exceeds maximum recursion limits"
            );
        }
        assert!(parse_expr(&format!("0{}", " * 2 + 1".repeat(50))).is_ok());
        assert!(parse_expr(&format!("a{}", "[0].b".repeat(50))).is_ok());
    }
}
