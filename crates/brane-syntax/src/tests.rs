//! Parser tests.

use crate::ast::*;
use crate::parse;

fn parse_ok(source: &str) -> Program {
    let (program, errors) = parse(source);
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    program
}

fn only_function(program: &Program) -> &Function {
    let mut funcs = program.items.iter().filter_map(|item| match item {
        Item::Function(f) => Some(f),
        _ => None,
    });
    let f = funcs.next().expect("no function parsed");
    assert!(funcs.next().is_none());
    f
}

#[test]
fn function_signature() {
    let program = parse_ok("int add(int a, int b){ return a + b; }");
    let f = only_function(&program);
    assert_eq!(f.name.name, "add");
    assert_eq!(f.return_type.name, "int");
    assert_eq!(f.arguments.len(), 2);
    assert_eq!(f.arguments[0].ty.name, "int");
    assert_eq!(f.arguments[0].name.name, "a");
    assert!(!f.arguments[0].is_const);
    assert!(!f.arguments[0].is_ref);
}

#[test]
fn precedence_mul_over_add() {
    let program = parse_ok("int f(){ return 1 + 2 * 3; }");
    let f = only_function(&program);
    let StmtKind::Return(expr) = &f.body[0].kind else {
        panic!("expected return");
    };
    let ExprKind::Binary { op, right, .. } = &expr.kind else {
        panic!("expected binary, got {:?}", expr.kind);
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(
        right.kind,
        ExprKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn declaration_with_initializer() {
    let program = parse_ok("int f(){ int i = 0; return i; }");
    let f = only_function(&program);
    let StmtKind::Expr(expr) = &f.body[0].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Assign { dest, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(dest.kind, ExprKind::Decl(_)));
}

#[test]
fn bare_declaration_statement() {
    let program = parse_ok("int f(){ int i; return 0; }");
    let f = only_function(&program);
    assert!(matches!(&f.body[0].kind, StmtKind::Decl(d) if d.name.name == "i"));
}

#[test]
fn const_ref_qualifiers() {
    let program = parse_ok("void f(const int a, ref thing b){ }");
    let f = only_function(&program);
    assert!(f.arguments[0].is_const);
    assert!(f.arguments[1].is_ref);
    assert_eq!(f.arguments[1].ty.name, "thing");
}

#[test]
fn if_and_while() {
    let program = parse_ok("int f(int a, bool c){ if(c){ return a; } while(a < 10){ a = a + 1; } return a; }");
    let f = only_function(&program);
    assert!(matches!(f.body[0].kind, StmtKind::If { .. }));
    assert!(matches!(f.body[1].kind, StmtKind::While { .. }));
}

#[test]
fn comparison_does_not_chain() {
    let (_, errors) = parse("int f(int a){ return a < 1 < 2; }");
    assert!(!errors.is_empty());
}

#[test]
fn struct_definitions() {
    let program = parse_ok("struct S { char a; int b; } packed struct P { char a; }");
    let mut structs = program.items.iter().filter_map(|item| match item {
        Item::Struct(s) => Some(s),
        _ => None,
    });
    let s = structs.next().unwrap();
    assert_eq!(s.name.name, "S");
    assert!(!s.packed);
    assert_eq!(s.members.len(), 2);
    let p = structs.next().unwrap();
    assert!(p.packed);
}

#[test]
fn link_with_alias() {
    let program = parse_ok("link \"math\" as \"m\";");
    let Item::Link(link) = &program.items[0] else {
        panic!("expected link");
    };
    assert_eq!(link.library.value, "math");
    assert_eq!(link.alias.as_ref().unwrap().value, "m");
}

#[test]
fn member_access_and_library_call() {
    let program = parse_ok("float f(){ vec2 v = new vec2; v.x = 1.0f; delete v; return m.sqrt(4.0f); }");
    let f = only_function(&program);
    let StmtKind::Expr(assign) = &f.body[1].kind else {
        panic!("expected member assignment");
    };
    let ExprKind::Assign { dest, .. } = &assign.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(&dest.kind, ExprKind::Member { base, member }
        if base.name == "v" && member.name == "x"));

    let StmtKind::Return(ret) = &f.body[3].kind else {
        panic!("expected return");
    };
    assert!(matches!(&ret.kind, ExprKind::Call { namespace: Some(ns), name, .. }
        if ns.name == "m" && name.name == "sqrt"));
}

#[test]
fn cast_expression() {
    let program = parse_ok("float f(int a){ return a as float; }");
    let f = only_function(&program);
    let StmtKind::Return(expr) = &f.body[0].kind else {
        panic!("expected return");
    };
    assert!(matches!(&expr.kind, ExprKind::Cast { ty, .. } if ty.name == "float"));
}

#[test]
fn return_void() {
    let program = parse_ok("void f(){ return; }");
    let f = only_function(&program);
    assert!(matches!(f.body[0].kind, StmtKind::ReturnVoid));
}

#[test]
fn error_recovery_keeps_going() {
    let (program, errors) = parse("int f(){ return 1 +; } int g(){ return 2; }");
    assert!(!errors.is_empty());
    // g still parses after f's bad statement.
    let names: Vec<_> = program
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Function(f) => Some(f.name.name.as_str()),
            _ => None,
        })
        .collect();
    assert!(names.contains(&"g"));
}

#[test]
fn unknown_token_reported() {
    let (_, errors) = parse("int f(){ return 1 @ 2; }");
    assert!(errors
        .iter()
        .any(|e| matches!(e.kind, crate::ParseErrorKind::UnknownToken('@'))));
}
