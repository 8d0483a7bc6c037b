//! Every error kind is reachable, and failing statements do not stop the
//! rest of the compile from being diagnosed.

use brane_compiler::{compile_source, ErrorKind};

fn errors_of(source: &str) -> Vec<ErrorKind> {
    match compile_source(source, None) {
        Ok(_) => panic!("expected compile errors"),
        Err(errors) => errors.into_iter().map(|e| e.kind).collect(),
    }
}

fn has(errors: &[ErrorKind], pred: impl Fn(&ErrorKind) -> bool) -> bool {
    errors.iter().any(pred)
}

#[test]
fn undefined_identifier() {
    let errors = errors_of("int f() { return x; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::UndefinedIdentifier(n) if n == "x")));
}

#[test]
fn redeclaration_in_same_scope() {
    let errors = errors_of("int f(int a) { int a; return a; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::NameInUse(n) if n == "a")));
}

#[test]
fn redeclaration_of_outer_name_in_nested_scope() {
    // Declaration is rejected when the name exists at any level.
    let errors = errors_of("int f(int a) { { int a; } return a; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::NameInUse(n) if n == "a")));
}

#[test]
fn undefined_types() {
    let errors = errors_of("widget f() { return 0; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::UndefinedType(n) if n == "widget")));

    let errors = errors_of("int f() { widget w; return 0; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::UndefinedType(n) if n == "widget")));
}

#[test]
fn type_mismatches() {
    // bool + int has no unified numeric type.
    let errors = errors_of("int f(bool c) { return c + 1; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::TypeMismatch { .. })));

    // Conditions must be bool.
    let errors = errors_of("int f(int a) { if(a) { return 1; } return 0; }");
    assert!(has(&errors, |e| matches!(
        e,
        ErrorKind::TypeMismatch { expected, .. } if expected == "bool"
    )));

    // A void return in a non-void function.
    let errors = errors_of("int f() { return; }");
    assert!(has(&errors, |e| matches!(
        e,
        ErrorKind::TypeMismatch { found, .. } if found == "void"
    )));
}

#[test]
fn invalid_ref_qualifier() {
    let errors = errors_of("int f(ref int a) { return a; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::InvalidRefQualifier(_))));

    let errors = errors_of("int f() { ref int a; return 0; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::InvalidRefQualifier(_))));
}

#[test]
fn assign_to_const() {
    let errors = errors_of("int f(const int a) { a = 5; return a; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::AssignToConst(n) if n == "a")));
}

#[test]
fn missing_return_is_reported_exactly_once() {
    let errors = errors_of("int f(int a) { a = a + 1; }");
    let count = errors
        .iter()
        .filter(|e| matches!(e, ErrorKind::MissingReturn(n) if n == "f"))
        .count();
    assert_eq!(count, 1);
}

#[test]
fn void_function_may_fall_through_or_return_early() {
    assert!(compile_source("void f(int a) { a = a + 1; }", None).is_ok());
    assert!(compile_source("void f(int a) { if(a > 0) { return; } a = 0; }", None).is_ok());
}

#[test]
fn unknown_function() {
    let errors = errors_of("int f() { return g(1, true); }");
    assert!(has(&errors, |e| matches!(
        e,
        ErrorKind::UnknownFunction(sig) if sig == "g(int,bool)"
    )));
}

#[test]
fn unknown_library_alias() {
    let errors = errors_of("int f() { return m.g(1); }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::UnknownLibrary(n) if n == "m")));
}

#[test]
fn void_argument() {
    let source = r#"
        void noop() { return; }
        int f() { return g(noop()); }
    "#;
    let errors = errors_of(source);
    assert!(has(&errors, |e| matches!(e, ErrorKind::VoidArgument)));
}

#[test]
fn non_object_new_and_delete() {
    let errors = errors_of("int f() { new int; return 0; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::NonObjectNew(n) if n == "int")));

    let errors = errors_of("int f(int a) { delete a; return 0; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::NonObjectDelete(n) if n == "int")));
}

#[test]
fn link_without_linker() {
    let errors = errors_of("link \"math\";");
    assert!(has(&errors, |e| matches!(e, ErrorKind::LinkerUnset)));
}

#[test]
fn string_literals_are_unsupported_in_expressions() {
    let errors = errors_of("int f() { return \"hi\"; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::UnsupportedConstruct(_))));
}

#[test]
fn duplicate_struct_member() {
    let errors = errors_of("struct S { int a; float a; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::NameInUse(n) if n == "a")));
}

#[test]
fn duplicate_struct_name() {
    let errors = errors_of("struct S { int a; } struct S { int b; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::NameInUse(n) if n == "S")));
}

#[test]
fn unknown_token_surfaces_with_other_errors() {
    let errors = errors_of("int f() { return 1 @ 2; }");
    assert!(has(&errors, |e| matches!(e, ErrorKind::UnknownToken(_))));
}

#[test]
fn multiple_diagnostics_per_run() {
    let source = r#"
        int f() { return x; }
        int g() { return y; }
    "#;
    let errors = errors_of(source);
    let undefined = errors
        .iter()
        .filter(|e| matches!(e, ErrorKind::UndefinedIdentifier(_)))
        .count();
    assert_eq!(undefined, 2);
}
