use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use skink::prelude::*;
use skink::Skink;

fn evaluate(source: &str) -> Result<Value, SkinkError> {
    Skink::with_output(Box::new(std::io::sink())).run(source, "<test>")
}

macro_rules! assert_value {
    ($source:expr, $expected:expr) => {
        let res = evaluate($source);
        assert!(res.is_ok(), "{:?}", res);
        assert_eq!(res.unwrap(), $expected);
    };
}

macro_rules! assert_int {
    ($source:expr, $expected:expr) => {
        assert_value!($source, Value::Int($expected));
    };
}

macro_rules! assert_long {
    ($source:expr, $expected:expr) => {
        assert_value!($source, Value::Long($expected));
    };
}

macro_rules! assert_double {
    ($source:expr, $expected:expr) => {
        assert_value!($source, Value::Double($expected));
    };
}

macro_rules! assert_boolean {
    ($source:expr, $expected:expr) => {
        assert_value!($source, Value::Boolean($expected));
    };
}

macro_rules! assert_string {
    ($source:expr, $expected:expr) => {
        assert_value!($source, Value::from($expected));
    };
}

macro_rules! assert_runtime_error {
    ($source:expr, $kind:ident) => {
        match evaluate($source) {
            Err(SkinkError::Runtime(e)) => assert_eq!(e.kind, RuntimeErrorKind::$kind, "{}", e.detail),
            other => panic!("expected a runtime error, got {:?}", other),
        }
    };
    ($source:expr, $kind:ident, $detail:expr) => {
        match evaluate($source) {
            Err(SkinkError::Runtime(e)) => {
                assert_eq!(e.kind, RuntimeErrorKind::$kind);
                assert_eq!(e.detail, $detail);
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }
    };
}

#[test]
fn int_literals_wrap() {
    assert_int!("4294967297", 1);
    assert_int!("2147483648", i32::MIN);
    assert_long!("9223372036854775808L", i64::MIN);
}

#[test]
fn arithmetic_wraps() {
    assert_int!("2147483647 + 1", i32::MIN);
    assert_int!("-2147483647 - 2", i32::MAX);
}

#[test]
fn numeric_promotion() {
    assert_int!("2 + 3", 5);
    assert_long!("2 + 3L", 5);
    assert_double!("2 + 3.0", 5.0);
    assert_double!("3L * 0.5", 1.5);
    assert_int!("7 / 2", 3);
    assert_int!("-7 % 3", 2);
    assert_int!("7 % -3", -2);
    assert_double!("-7.5 % 2.0", 0.5);
}

#[test]
fn float_division_by_zero() {
    assert!(matches!(evaluate("1.0 / 0.0"), Ok(Value::Double(v)) if v == f64::INFINITY));
    assert!(matches!(evaluate("-1.0 / 0.0"), Ok(Value::Double(v)) if v == f64::NEG_INFINITY));
    assert!(matches!(evaluate("0.0 / 0.0"), Ok(Value::Double(v)) if v.is_nan()));

    let value = evaluate("double x = 1.0 / 0.0\nx").unwrap();
    assert_eq!(value.to_string(), "Infinity");
}

#[test]
fn large_integral_doubles_keep_their_fraction() {
    assert_eq!(evaluate("10000000000000000.0").unwrap().to_string(), "10000000000000000.0");
    assert_eq!(evaluate("100000000000000000000.0").unwrap().to_string(), "100000000000000000000.0");
}

#[test]
fn integer_division_by_zero() {
    assert_runtime_error!("1 / 0", DivisionByZero);
    assert_runtime_error!("1L % 0", DivisionByZero);
}

#[test]
fn unary_operators() {
    assert_int!("-(2 + 3)", -5);
    assert_double!("+2.5", 2.5);
    assert_boolean!("not 0", true);
    assert_boolean!("not \"x\"", false);
    assert_runtime_error!("-\"x\"", IllegalOperation);
}

#[test]
fn strings() {
    assert_string!(r#" "Hello " + "World!" "#, "Hello World!");
    assert_string!(r#" "ab" * 2 "#, "abab");
    assert_string!(r#" "abc"[-1] "#, "c");
    assert_boolean!(r#" "apple" < "banana" "#, true);
    assert_int!(r#" len("héllo") "#, 5);
    assert_string!("str(2.0)", "2.0");
}

#[test]
fn lists() {
    let value = evaluate("list xs = {1, 2}\nxs + {3}").unwrap();
    assert_eq!(value.to_string(), "{1, 2, 3}");
    assert_int!("{10, 20, 30}[1]", 20);
    assert_value!("{10}[5]", Value::Nil);
    assert_runtime_error!("5[0]", IllegalOperation);
}

#[test]
fn repetition_is_bounded() {
    assert_runtime_error!(
        "\"ab\" * 9223372036854775807L",
        IllegalOperation,
        "repeat count too large"
    );
    assert_runtime_error!("{1, 2} * 9223372036854775807L", IllegalOperation, "repeat count too large");
    assert_string!("\"\" * 9223372036854775807L", "");
}

#[test]
fn comparisons() {
    assert_boolean!("1 < 2", true);
    assert_boolean!("2 <= 2L", true);
    assert_boolean!("3 > 2.5", true);
    assert_boolean!("1 >= 2", false);
    assert_runtime_error!("1 < \"2\"", IllegalOperation);
}

#[test]
fn equality_uses_display_form_and_kind() {
    assert_boolean!("1 == 1", true);
    assert_boolean!("1 == 1L", false);
    assert_boolean!("1 == 1.0", false);
    assert_boolean!("{1, 2} == {1, 2}", true);
    assert_boolean!("\"1\" != 1", true);
    assert_boolean!("nil == nil", true);
}

#[test]
fn logical_operators_short_circuit() {
    assert_boolean!("1 and 2", true);
    assert_boolean!("0 or nil", false);
    assert_boolean!("false and undefined_name", false);
    assert_boolean!("true or undefined_name", true);
}

#[test]
fn declaration_assignment_and_lookup() {
    assert_int!("int a = 2\na = a + 3\na", 5);
    assert_int!("int a = 0\nint b = 0\na = b = 7\na + b", 14);
    assert_runtime_error!("b = 1", UndefinedName, "'b' is not defined");
    assert_runtime_error!("missing + 1", UndefinedName);
}

#[test]
fn declared_types_are_enforced() {
    assert_runtime_error!("int a = \"s\"", IncompatibleTypes, "cannot convert string to int");
    assert_runtime_error!("int a = 1\na = 2L", IncompatibleTypes);
    assert_runtime_error!("whole a = 1", UndefinedName, "type 'whole' is not defined");
    assert_double!("number n = 1\nn = 2.5\nn", 2.5);
    assert_string!("object o = 1\no = \"now a string\"\no", "now a string");
}

#[test]
fn redeclaration() {
    assert_runtime_error!("int a = 1\nint a = 2", Redeclaration);
    assert_runtime_error!("int a = 1\nlong a = 2L", IncompatibleTypes);
}

#[test]
fn nested_scopes_shadow() {
    assert_int!("int a = 1\nif true { int a = 2 }\na", 1);
    assert_int!("int a = 1\nif true { int a = 2; a }", 2);
    assert_int!("int a = 1\nif true { a = 2 }\na", 2);
}

#[test]
fn if_expressions() {
    assert_value!("if false { 1 }", Value::Nil);
    assert_value!("if false { 1 } elif false { 2 }", Value::Nil);
    assert_int!("if false { 1 } elif true { 2 } else { 3 }", 2);
    assert_int!("if 0 { 1 }\nelse { 3 }", 3);
    assert_int!("int n = 0\nif true { n = n + 1 } else { n = n + 100 }\nn", 1);
}

#[test]
fn while_loops() {
    assert_value!("while false { 1 }", Value::Nil);
    assert_int!("int i = 0\nwhile i < 5 { i = i + 1 }", 5);
    assert_int!(
        "int i = 0\nint total = 0\nwhile i < 10 {\n i = i + 1\n if i % 2 == 0 { continue }\n if i > 7 { break }\n total = total + i\n}\ntotal",
        16
    );
}

#[test]
fn loop_bodies_get_a_fresh_scope_each_iteration() {
    assert_int!("int i = 0\nwhile i < 3 {\n int seen = i\n i = i + 1\n}\ni", 3);
}

#[test]
fn functions() {
    assert_int!("int add(int a, int b) {\n return a + b\n}\nadd(2, 3)", 5);
    assert_int!("int square(int x) = x * x\nsquare(7)", 49);
    assert_value!("void f() {\n 1\n}\nf()", Value::Nil);
    assert_int!("int fact(int n) {\n if n <= 1 { return 1 }\n return n * fact(n - 1)\n}\nfact(10)", 3628800);
    assert_long!("long fib(long n) = if n < 2 { n } else { fib(n - 1) + fib(n - 2) }\nfib(15L)", 610);
}

#[test]
fn return_skips_the_rest_of_the_body() {
    assert_int!("int n = 0\nint f() {\n return 1\n n = 99\n}\nf()\nn", 0);
}

#[test]
fn closures_outlive_their_defining_call() {
    let source = "func make() {\n int x = 42\n int get() = x\n return get\n}\nfunc g = make()\ng()";
    assert_int!(source, 42);
    assert_int!("func adder(int n) {\n int add(int x) = x + n\n return add\n}\nadder(5)(10)", 15);
}

#[test]
fn closures_see_the_defining_scope_not_the_caller() {
    let source = "int x = 1\nint get() = x\nint call() {\n int x = 2\n return get()\n}\ncall()";
    assert_int!(source, 1);
}

#[test]
fn call_errors() {
    assert_runtime_error!(
        "int f(int a, int b) = a\nf(1)",
        Arity,
        "1 too few arguments passed into 'f'"
    );
    assert_runtime_error!(
        "int f() = 1\nf(1, 2)",
        Arity,
        "2 too many arguments passed into 'f'"
    );
    assert_runtime_error!("int f(int a) = a\nf(1.5)", IncompatibleTypes);
    assert_runtime_error!("int f() = \"s\"\nf()", IncompatibleTypes);
    assert_runtime_error!("int a = 1\na()", IllegalOperation, "value of type int is not callable");
}

#[test]
fn recursion_limit() {
    assert_runtime_error!(
        "int down(int n) = down(n + 1)\ndown(0)",
        IllegalOperation,
        "maximum recursion depth exceeded"
    );
}

#[test]
fn deeply_nested_source_runs() {
    let source = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
    assert_int!(&source, 1);

    let source = vec!["1"; 5_000].join(" + ");
    assert_int!(&source, 5_000);
}

#[test]
fn stray_control_flow() {
    assert_runtime_error!("return 1", IllegalOperation, "'return' outside of a function");
    assert_runtime_error!("break", IllegalOperation, "'break' outside of a loop");
    assert_runtime_error!("void f() {\n continue\n}\nf()", IllegalOperation);
}

#[test]
fn namespaces() {
    assert_int!("namespace P {\n int x = 1\n int y = 2\n}\nP.x + P.y", 3);
    assert_int!("namespace P {\n int x = 1\n int get() = x\n}\nP.x = 10\nP.get()", 10);
    assert_int!("namespace P { }\nP.z = 5\nP[\"z\"]", 5);
    assert_value!("namespace P { }\nP.missing", Value::Nil);
    assert_string!("namespace A {\n namespace B {\n string s = \"deep\"\n }\n}\nA.B.s", "deep");
    assert_runtime_error!("namespace P { int x = 1 }\nP.x = \"s\"", IncompatibleTypes);
}

#[test]
fn namespace_display_keeps_definition_order() {
    let value = evaluate("namespace P {\n int b = 1\n string a = \"x\"\n}").unwrap();
    assert_eq!(value.to_string(), "{ b=1, a=\"x\" }");
}

#[test]
fn reopening_definitions() {
    assert_int!("namespace A { int x = 1 }\nnamespace A { int y = 2 }\nA.y", 2);
    assert_int!("int f() = 1\nint f() = 2\nf()", 2);
    assert_runtime_error!("int A = 1\nnamespace A { }", IncompatibleTypes);
}

#[test]
fn member_assignment_on_other_values_is_ignored() {
    let value = evaluate("list xs = {1}\nxs.size = 3\nxs").unwrap();
    assert_eq!(value.to_string(), "{1}");
    assert_int!("int n = 3\nn.field = 4", 4);
    assert_runtime_error!("int n = 3\nn.field", IllegalOperation);
}

/// A writer that can be read back after the session is done with it.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn natives_write_to_the_session_output() {
    let buffer = SharedBuffer::default();
    let mut skink = Skink::with_output(Box::new(buffer.clone()));

    skink.run("print(1)\nprintln(\" two\")\nprintln({\"a\", nil})", "<test>").unwrap();

    let output = String::from_utf8(buffer.0.borrow().clone()).unwrap();
    assert_eq!(output, "1 two\n{\"a\", nil}\n");
}

#[test]
fn syntax_errors_are_reported_before_running() {
    let buffer = SharedBuffer::default();
    let mut skink = Skink::with_output(Box::new(buffer.clone()));

    let err = skink.run("println(1)\nif true { 1", "<test>").unwrap_err();
    assert!(matches!(err, SkinkError::Syntax(_)));
    assert_eq!(err.detail(), "expected '}'");
    assert!(buffer.0.borrow().is_empty());
}
