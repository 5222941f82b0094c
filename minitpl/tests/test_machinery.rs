#![cfg(feature = "unstable_machinery")]
use similar_asserts::assert_eq;

use minitpl::machinery::ast::{ControlOp, Step, Stmt};
use minitpl::machinery::{
    generate, get_procedure, make_string_output, normalize, parse_steps, scan, tokenize,
    CodeGenerator, Segment, Token, Vm,
};
use minitpl::{context, Environment};

#[test]
fn test_scan_pipeline() {
    let source = normalize("<p>\n  Hi <% name %>\n</p>\n");
    assert_eq!(source, "<p>Hi <% name %></p>");
    assert_eq!(
        scan(&source).collect::<Vec<_>>(),
        vec![
            Segment::Literal("<p>Hi "),
            Segment::Fragment("name"),
            Segment::Literal("</p>"),
        ]
    );
}

#[test]
fn test_tokenize() {
    assert_eq!(
        tokenize("user.name === 'x'").unwrap(),
        vec![
            Token::Ident("user"),
            Token::Dot,
            Token::Ident("name"),
            Token::StrictEq,
            Token::Str("x"),
        ]
    );
}

#[test]
fn test_steps() {
    let steps = parse_steps("a<% if (x) { %>b<% } else { %>c<% } %>").unwrap();
    assert_eq!(steps.len(), 6);
    assert!(matches!(steps[0], Step::Literal(ref s) if s == "a"));
    assert!(matches!(steps[1], Step::Control(ref ops) if matches!(ops[..], [ControlOp::If(_)])));
    assert!(matches!(
        steps[3],
        Step::Control(ref ops) if matches!(ops[..], [ControlOp::Close, ControlOp::Else])
    ));
}

#[test]
fn test_code_generator() {
    let mut gen = CodeGenerator::new();
    for step in parse_steps("<% while (x) { %>y<% } %>").unwrap() {
        gen.add_step(step).unwrap();
    }
    let procedure = gen.finish().unwrap();
    assert_eq!(procedure.body.len(), 1);
    match procedure.body[0] {
        Stmt::WhileLoop { ref body, .. } => assert_eq!(body.len(), 1),
        ref other => panic!("unexpected statement {other:?}"),
    }
}

#[test]
fn test_vm() {
    let env = Environment::new();
    let procedure = generate(parse_steps("<% a %>+<% b %>=<% a + b %>").unwrap()).unwrap();
    let mut rv = String::new();
    let mut out = make_string_output(&mut rv);
    Vm::new(&env)
        .eval(&procedure, &context!(a => 1, b => 2), &mut out)
        .unwrap();
    assert_eq!(rv, "1+2=3");
}

#[test]
fn test_get_procedure() {
    let env = Environment::new();
    let tmpl = env.compile("x<% y %>").unwrap();
    let procedure = get_procedure(&tmpl);
    assert!(matches!(procedure.body[0], Stmt::EmitRaw(ref s) if s == "x"));
    assert!(matches!(procedure.body[1], Stmt::EmitExpr(_)));
}
