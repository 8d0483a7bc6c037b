//! End-to-end tests: BraneScript source -> IR bytes -> VM execution.

use brane_compiler::{compile_source, Library, Linker, TypeDef};
use brane_ir::{Constant, IRScript, ValueStorage};
use brane_vm::{decode_function, Instr, Runtime, Value};

/// Compile, then push the script through its binary form so every test
/// also exercises serialization.
fn compile(source: &str) -> IRScript {
    compile_with(source, None)
}

fn compile_with(source: &str, linker: Option<&dyn Linker>) -> IRScript {
    let script = compile_source(source, linker).unwrap_or_else(|errors| {
        let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        panic!("compile errors: {:?}", rendered);
    });
    IRScript::from_bytes(&script.to_bytes()).expect("script survives serialization")
}

fn run(script: &IRScript, name: &str, args: &[Value]) -> Value {
    let mut rt = Runtime::load(script).expect("script loads");
    rt.call(name, args).expect("execution succeeds")
}

#[test]
fn test_if() {
    let script = compile(
        r#"
        int testIf(int a, int b, bool c)
        {
            if(c) { return a; }
            return b;
        }
        "#,
    );
    let args = |c| [Value::I32(32), Value::I32(64), Value::Bool(c)];
    assert_eq!(run(&script, "testIf(int,int,bool)", &args(true)), Value::I32(32));
    assert_eq!(run(&script, "testIf(int,int,bool)", &args(false)), Value::I32(64));
}

#[test]
fn test_if_else() {
    // An else is modeled as two ifs on c and !c.
    let script = compile(
        r#"
        int testIfElse(int a, int b, bool c)
        {
            if(c) { return a; }
            if(c == false) { return b; }
            return 0;
        }
        "#,
    );
    let args = |c| [Value::I32(32), Value::I32(64), Value::Bool(c)];
    assert_eq!(
        run(&script, "testIfElse(int,int,bool)", &args(true)),
        Value::I32(32)
    );
    assert_eq!(
        run(&script, "testIfElse(int,int,bool)", &args(false)),
        Value::I32(64)
    );
}

#[test]
fn test_while() {
    let script = compile(
        r#"
        int testWhile(int a, int b)
        {
            int i = 0;
            while(i < b) { i = i + a; }
            return i;
        }
        "#,
    );
    assert_eq!(
        run(&script, "testWhile(int,int)", &[Value::I32(2), Value::I32(10)]),
        Value::I32(10)
    );
    // Zero iterations.
    assert_eq!(
        run(&script, "testWhile(int,int)", &[Value::I32(2), Value::I32(0)]),
        Value::I32(0)
    );
}

#[test]
fn while_on_plain_bool_condition() {
    let script = compile(
        r#"
        int once(bool c, int a)
        {
            while(c) { c = false; a = a + 1; }
            return a;
        }
        "#,
    );
    assert_eq!(
        run(&script, "once(bool,int)", &[Value::Bool(true), Value::I32(5)]),
        Value::I32(6)
    );
    assert_eq!(
        run(&script, "once(bool,int)", &[Value::Bool(false), Value::I32(5)]),
        Value::I32(5)
    );
}

#[test]
fn constant_expression_folds_to_single_retv() {
    let script = compile("int seven() { return 1 + 2 * 3; }");
    let func = &script.local_functions[0];
    assert_eq!(func.constants, vec![Constant::I32(7)]);

    let loaded = decode_function(func).unwrap();
    assert_eq!(loaded.code.len(), 1);
    let Instr::RetV { src, .. } = &loaded.code[0] else {
        panic!("expected RETV, got {:?}", loaded.code[0]);
    };
    assert_eq!(src.storage, ValueStorage::Const);

    let mut rt = Runtime::load(&script).unwrap();
    assert_eq!(rt.call("seven()", &[]).unwrap(), Value::I32(7));
}

#[test]
fn arithmetic_and_nested_calls() {
    let script = compile(
        r#"
        int twice(int x) { return x * 2; }
        int quad(int x) { return twice(twice(x)); }
        "#,
    );
    assert_eq!(run(&script, "quad(int)", &[Value::I32(5)]), Value::I32(20));
}

#[test]
fn recursion() {
    let script = compile(
        r#"
        int fact(int n)
        {
            if(n <= 1) { return 1; }
            return n * fact(n - 1);
        }
        "#,
    );
    assert_eq!(run(&script, "fact(int)", &[Value::I32(0)]), Value::I32(1));
    assert_eq!(run(&script, "fact(int)", &[Value::I32(5)]), Value::I32(120));
    assert_eq!(
        run(&script, "fact(int)", &[Value::I32(10)]),
        Value::I32(3628800)
    );
}

#[test]
fn casts_at_runtime() {
    let script = compile(
        r#"
        float toFloat(int a) { return a as float; }
        long widen(int a) { return a as long; }
        int narrow(float f) { return f as int; }
        "#,
    );
    assert_eq!(
        run(&script, "toFloat(int)", &[Value::I32(3)]),
        Value::F32(3.0)
    );
    assert_eq!(
        run(&script, "widen(int)", &[Value::I32(-9)]),
        Value::I64(-9)
    );
    assert_eq!(
        run(&script, "narrow(float)", &[Value::F32(2.75)]),
        Value::I32(2)
    );
}

#[test]
fn implicit_return_cast() {
    // The return expression is wrapped in a cast to the declared type.
    let script = compile("float half(int a) { return a / 2; }");
    assert_eq!(run(&script, "half(int)", &[Value::I32(7)]), Value::F32(3.0));
}

#[test]
fn struct_layouts_reach_the_ir() {
    let script = compile(
        r#"
        struct S { char a; int b; float c; }
        packed struct P { char a; int b; float c; }
        "#,
    );
    let s = &script.local_structs[0];
    assert!(!s.packed);
    let offsets: Vec<u32> = s.members.iter().map(|m| m.offset).collect();
    assert_eq!(offsets, vec![0, 4, 8]);

    let p = &script.local_structs[1];
    assert!(p.packed);
    let offsets: Vec<u32> = p.members.iter().map(|m| m.offset).collect();
    assert_eq!(offsets, vec![0, 1, 5]);
}

#[test]
fn objects_store_and_load_members() {
    let script = compile(
        r#"
        struct vec2 { float x; float y; }

        float lengthSq(float x, float y)
        {
            vec2 v = new vec2;
            v.x = x;
            v.y = y;
            float r = v.x * v.x + v.y * v.y;
            delete v;
            return r;
        }
        "#,
    );
    let mut rt = Runtime::load(&script).unwrap();
    assert_eq!(
        rt.call("lengthSq(float,float)", &[Value::F32(3.0), Value::F32(4.0)])
            .unwrap(),
        Value::F32(25.0)
    );
    assert_eq!(rt.live_objects(), 0);
}

#[test]
fn scope_bindings_disappear_on_exit() {
    // Each block's `t` dies with the block, so the second declaration is
    // legal again.
    let script = compile(
        r#"
        int scoped(int a)
        {
            { int t = a + 1; a = t; }
            { int t = a * 2; a = t; }
            return a;
        }
        "#,
    );
    assert_eq!(run(&script, "scoped(int)", &[Value::I32(3)]), Value::I32(8));
}

#[test]
fn emission_is_deterministic() {
    let source = r#"
        struct S { char a; int b; }
        int work(int a, int b)
        {
            int acc = 0;
            while(acc < b) { acc = acc + a; }
            if(acc > 100) { return 100; }
            return acc;
        }
    "#;
    let first = compile_source(source, None).unwrap();
    let second = compile_source(source, None).unwrap();
    assert_eq!(first.to_bytes(), second.to_bytes());
}

// === External calls ===

struct MathLibrary;

impl Library for MathLibrary {
    fn function_return_type(&self, mangled: &str) -> Option<String> {
        match mangled {
            "sqrt(float)" => Some("float".to_string()),
            "max(int,int)" => Some("int".to_string()),
            _ => None,
        }
    }
}

struct TestLinker {
    math: MathLibrary,
}

impl Linker for TestLinker {
    fn get_type(&self, _name: &str) -> Option<TypeDef> {
        None
    }

    fn get_library(&self, name: &str) -> Option<&dyn Library> {
        (name == "math").then_some(&self.math as &dyn Library)
    }
}

#[test]
fn external_function_calls() {
    let linker = TestLinker { math: MathLibrary };
    let script = compile_with(
        r#"
        link "math" as "m";

        float root(float x) { return m.sqrt(x); }
        int clamp(int a, int b) { return m.max(a, b); }
        "#,
        Some(&linker),
    );
    assert_eq!(script.linked_libraries, vec!["math".to_string()]);

    let mut rt = Runtime::load(&script).unwrap();
    rt.register_extern("math", "sqrt(float)", |args| {
        let Value::F32(x) = args[0] else {
            return Value::F32(f32::NAN);
        };
        Value::F32(x.sqrt())
    });
    rt.register_extern("math", "max(int,int)", |args| {
        let (Value::I32(a), Value::I32(b)) = (args[0], args[1]) else {
            return Value::I32(0);
        };
        Value::I32(a.max(b))
    });

    assert_eq!(
        rt.call("root(float)", &[Value::F32(16.0)]).unwrap(),
        Value::F32(4.0)
    );
    assert_eq!(
        rt.call("clamp(int,int)", &[Value::I32(3), Value::I32(11)])
            .unwrap(),
        Value::I32(11)
    );
}

#[test]
fn library_without_alias_uses_its_own_name() {
    let linker = TestLinker { math: MathLibrary };
    let script = compile_with(
        r#"
        link "math";
        int pick(int a, int b) { return math.max(a, b); }
        "#,
        Some(&linker),
    );
    let mut rt = Runtime::load(&script).unwrap();
    rt.register_extern("math", "max(int,int)", |args| {
        let (Value::I32(a), Value::I32(b)) = (args[0], args[1]) else {
            return Value::I32(0);
        };
        Value::I32(a.max(b))
    });
    assert_eq!(
        rt.call("pick(int,int)", &[Value::I32(-2), Value::I32(-8)])
            .unwrap(),
        Value::I32(-2)
    );
}
