use serde_json::json;
use similar_asserts::assert_eq;

use minitpl::{context, render, Context, Error, ErrorKind};

fn render_err(source: &str, mut ctx: Context) -> Error {
    render(source, &mut ctx).unwrap_err()
}

#[test]
fn test_unbalanced_blocks() {
    let err = render_err("<% if (a) { %>x", context!(a => true));
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    insta::assert_snapshot!(err, @"syntax error: unexpected end of template, expected `}` to close block");

    let err = render_err("x<% } %>yz", context!());
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    insta::assert_snapshot!(err, @"syntax error: unexpected `}`");

    let err = render_err("<% else { %>x<% } %>", context!());
    insta::assert_snapshot!(err, @"syntax error: unexpected `else`");

    let err = render_err("<% while (a) { %>x<% } else { %>y<% } %>", context!());
    insta::assert_snapshot!(err, @"syntax error: unexpected `else`");
}

#[test]
fn test_malformed_fragments() {
    let err = render_err("<% 1 + %>", context!());
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    insta::assert_snapshot!(err, @"syntax error: unexpected end of input, expected expression");

    let err = render_err("<% a b %>", context!());
    insta::assert_snapshot!(err, @"syntax error: unexpected `b`, expected end of expression");

    let err = render_err("<% if a { %><% } %>", context!());
    insta::assert_snapshot!(err, @"syntax error: unexpected `a`, expected `(`");

    let err = render_err("<% new Date() %>", context!());
    insta::assert_snapshot!(err, @"syntax error: unexpected keyword `new`");

    let err = render_err("<% a # b %>", context!());
    insta::assert_snapshot!(err, @"syntax error: unexpected character");

    let err = render_err("<% 'abc %>", context!());
    insta::assert_snapshot!(err, @"syntax error: unexpected end of string");

    let err = render_err("<% 1 = 2 %>", context!());
    insta::assert_snapshot!(err, @"syntax error: invalid assignment target");

    let err = render_err("<% for (const x; x < 1; x++) { %><% } %>", context!());
    insta::assert_snapshot!(err, @"syntax error: missing initializer in const declaration");
}

#[test]
fn test_bad_escapes() {
    let err = render_err(r"<% '\u{zz}' %>", context!());
    assert_eq!(err.kind(), ErrorKind::BadEscape);

    let err = render_err(r"<% '\01' %>", context!());
    assert_eq!(err.kind(), ErrorKind::BadEscape);
    insta::assert_snapshot!(err, @"bad string escape: octal escape sequences are not allowed");
}

#[test]
fn test_undefined_variables() {
    let err = render_err("<% missing %>", context!());
    assert_eq!(err.kind(), ErrorKind::UndefinedError);
    insta::assert_snapshot!(err, @"undefined variable: `missing` is not defined");

    // `typeof` tolerates undeclared names and `this` lookups never fail
    assert_eq!(
        render("<% typeof missing %><% this.missing %>", &mut context!()).unwrap(),
        "undefined"
    );
}

#[test]
fn test_invalid_operations() {
    let err = render_err("<% user.address.city %>", context!(user => json!({})));
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    insta::assert_snapshot!(err, @"invalid operation: cannot read properties of undefined (reading 'city')");

    let err = render_err("<% name() %>", context!(name => "Ann"));
    insta::assert_snapshot!(err, @"invalid operation: `name` is not a function");

    let err = render_err("<% user.nope() %>", context!(user => json!({})));
    insta::assert_snapshot!(err, @"invalid operation: `user.nope` is not a function");

    let err = render_err("<% for (var x of n) { %><% } %>", context!(n => 42));
    insta::assert_snapshot!(err, @"invalid operation: number is not iterable");
}

#[test]
fn test_const_reassignment() {
    let err = render_err(
        "<% for (const i = 0; i < 2; i++) { %>x<% } %>",
        context!(),
    );
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    insta::assert_snapshot!(err, @"invalid operation: assignment to constant variable `i`");
}

#[test]
fn test_runtime_errors_abort_rendering() {
    let mut ctx = context!(items => vec![1, 2]);
    let err = render(
        "<% for (var i = 0; i < 3; i++) { %><% items[i].toFixed() %><% } %>",
        &mut ctx,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn test_deep_nesting_is_rejected() {
    let source = format!("<% {}1{} %>", "(".repeat(500), ")".repeat(500));
    let err = render_err(&source, context!());
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    insta::assert_snapshot!(err, @"syntax error: template exceeds maximum recursion limits");

    let source = format!("{}x{}", "<% if (a) { %>".repeat(200), "<% } %>".repeat(200));
    let err = render_err(&source, context!(a => true));
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
}

#[test]
fn test_long_operator_chains_are_rejected() {
    let source = format!("<% 0{} %>", "+1".repeat(1000));
    let err = render_err(&source, context!());
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    insta::assert_snapshot!(err, @"syntax error: template exceeds maximum recursion limits");

    let source = format!("<% a{} %>", ".b".repeat(1000));
    let err = render_err(&source, context!());
    assert_eq!(err.kind(), ErrorKind::SyntaxError);

    let source = format!("<% 0{} %>", "+1".repeat(100));
    assert_eq!(render(&source, &mut context!()).unwrap(), "100");
}

#[test]
fn test_error_source() {
    use std::error::Error as _;

    let err = render_err("<% missing %>", context!());
    assert!(err.source().is_none());
    assert_eq!(err.detail(), Some("`missing` is not defined"));
}
