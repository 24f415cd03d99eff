mod common;

#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use treelox as lox;

    use lox::interpreter::Interpreter;

    use crate::common;
    use crate::common::CaptureOutput;

    #[test]
    fn test_interpreter_01_print_forms() {
        let lines = common::run("print 3; print 2.5; print nil; print true; print \"hi\";");

        assert_eq!(lines, ["3", "2.5", "nil", "true", "hi"]);
    }

    #[test]
    fn test_interpreter_02_arithmetic_and_grouping() {
        assert_eq!(common::run("print (1 + 2) * 3 - 4 / 2;"), ["7"]);
        assert_eq!(common::run("print 10 / 4;"), ["2.5"]);
        assert_eq!(common::run("print -(1 + 2);"), ["-3"]);
        assert_eq!(common::run("print !nil; print !0;"), ["true", "false"]);
    }

    #[test]
    fn test_interpreter_03_counter_closure() {
        let lines = common::run(
            r#"
fun makeCounter() {
  var count = 0;
  fun tick() {
    count = count + 1;
    return count;
  }
  return tick;
}
var counter = makeCounter();
print counter();
print counter();
"#,
        );

        assert_eq!(lines, ["1", "2"]);
    }

    #[test]
    fn test_interpreter_04_fibonacci() {
        let lines = common::run(
            r#"
fun fib(n) {
  if (n < 2) return n;
  return fib(n - 1) + fib(n - 2);
}
print fib(10);
"#,
        );

        assert_eq!(lines, ["55"]);
    }

    #[test]
    fn test_interpreter_05_for_loop() {
        assert_eq!(
            common::run("for (var i = 0; i < 3; i = i + 1) print i;"),
            ["0", "1", "2"]
        );
    }

    #[test]
    fn test_interpreter_06_while_and_if() {
        let lines = common::run(
            r#"
var i = 0;
while (i < 5) {
  i = i + 1;
  if (i == 2) print "two";
  else if (i == 4) print i;
}
"#,
        );

        assert_eq!(lines, ["two", "4"]);
    }

    #[test]
    fn test_interpreter_07_logical_operators_return_operands() {
        let lines = common::run(
            "print \"hi\" or 2; print nil or \"fallback\"; print nil and 2; print 1 and \"right\";",
        );

        assert_eq!(lines, ["hi", "fallback", "nil", "right"]);
    }

    #[test]
    fn test_interpreter_08_truthiness() {
        // Only nil and false are falsy; 0 and "" are not.
        let lines = common::run(
            r#"
if (0) print "zero";
if ("") print "empty";
if (nil) print "nil"; else print "not nil";
"#,
        );

        assert_eq!(lines, ["zero", "empty", "not nil"]);
    }

    #[test]
    fn test_interpreter_09_string_concat_asymmetry() {
        assert_eq!(common::run("print \"a\" + 1;"), ["a1"]);
        assert_eq!(common::run("print \"n=\" + 2.5;"), ["n=2.5"]);

        // A number on the left does not coerce.
        let err = common::try_run("print 1 + \"a\";").expect_err("number + string");
        assert_eq!(
            err.to_string(),
            "Operands must be two numbers or two strings.\n[line 1]"
        );
    }

    #[test]
    fn test_interpreter_10_division_by_zero() {
        let err = common::try_run("print 1 / 0;").expect_err("division by zero");
        assert_eq!(err.to_string(), "Right operand must not be zero.\n[line 1]");

        // Zero on the left is an ordinary division.
        assert_eq!(common::run("print 0 / 1;"), ["0"]);
    }

    #[test]
    fn test_interpreter_11_comparison_type_fault() {
        let err = common::try_run("print 1 < \"2\";").expect_err("mixed comparison");
        assert_eq!(err.to_string(), "Operands must be numbers\n[line 1]");
    }

    #[test]
    fn test_interpreter_12_unary_minus_fault() {
        let err = common::try_run("print -\"a\";").expect_err("negated string");
        assert_eq!(err.to_string(), "Operand must be a number\n[line 1]");
    }

    #[test]
    fn test_interpreter_13_undefined_variable() {
        let err = common::try_run("print missing;").expect_err("undefined read");
        assert_eq!(err.to_string(), "Undefined variable 'missing'.\n[line 1]");

        let err = common::try_run("missing = 1;").expect_err("undefined assign");
        assert_eq!(err.to_string(), "Undefined variable 'missing'.\n[line 1]");
    }

    #[test]
    fn test_interpreter_14_equality() {
        let lines = common::run(
            r#"
class A {}
var x = A();
var y = A();
print x == x;
print x == y;
print 1 == 1;
print "a" == "b";
print nil == nil;
print 1 == "1";
"#,
        );

        assert_eq!(lines, ["true", "false", "true", "false", "true", "false"]);
    }

    #[test]
    fn test_interpreter_15_class_fields_and_init() {
        let lines = common::run(
            r#"
class Point {
  init(x, y) {
    this.x = x;
    this.y = y;
  }
}
var p = Point(1, 2);
print p.x + p.y;
"#,
        );

        assert_eq!(lines, ["3"]);
    }

    #[test]
    fn test_interpreter_16_methods_and_this() {
        let lines = common::run(
            r#"
class Person {
  init(name) { this.name = name; }
  greet() { return "hi " + this.name; }
}
print Person("Ada").greet();
"#,
        );

        assert_eq!(lines, ["hi Ada"]);
    }

    #[test]
    fn test_interpreter_17_bound_method_keeps_this() {
        let lines = common::run(
            r#"
class Person {
  init(name) { this.name = name; }
  greet() { return "hi " + this.name; }
}
var m = Person("Ada").greet;
print m();
"#,
        );

        assert_eq!(lines, ["hi Ada"]);
    }

    #[test]
    fn test_interpreter_18_fields_shadow_methods() {
        let lines = common::run(
            r#"
class A {
  f() { return "method"; }
}
var a = A();
print a.f();
a.f = "field";
print a.f;
"#,
        );

        assert_eq!(lines, ["method", "field"]);
    }

    #[test]
    fn test_interpreter_19_undefined_property() {
        let err = common::try_run("class A {} print A().missing;").expect_err("missing property");
        assert_eq!(err.to_string(), "Undefined property 'missing'.\n[line 1]");
    }

    #[test]
    fn test_interpreter_20_properties_require_instances() {
        let err = common::try_run("print 1.x;").expect_err("get on number");
        assert_eq!(err.to_string(), "Only instances have properties.\n[line 1]");

        let err = common::try_run("1.x = 2;").expect_err("set on number");
        assert_eq!(err.to_string(), "Only instances have fields.\n[line 1]");
    }

    #[test]
    fn test_interpreter_21_call_non_callable() {
        let err = common::try_run("\"str\"();").expect_err("called a string");
        assert_eq!(
            err.to_string(),
            "Can only call functions and classes.\n[line 1]"
        );
    }

    #[test]
    fn test_interpreter_22_arity() {
        let err =
            common::try_run("fun f(a, b) { return a + b; } f(1);").expect_err("missing argument");
        assert_eq!(err.to_string(), "Expected 2 arguments but got 1.\n[line 1]");

        // Class arity comes from `init`, or zero without one.
        let err = common::try_run("class A { init(x, y) {} } A(1);").expect_err("short init");
        assert_eq!(err.to_string(), "Expected 2 arguments but got 1.\n[line 1]");

        let err = common::try_run("class A {} A(1);").expect_err("argument to plain class");
        assert_eq!(err.to_string(), "Expected 0 arguments but got 1.\n[line 1]");
    }

    #[test]
    fn test_interpreter_23_return_unwinds_loops() {
        let lines = common::run(
            r#"
fun f() {
  var i = 0;
  while (true) {
    i = i + 1;
    if (i == 3) return i;
  }
}
print f();
"#,
        );

        assert_eq!(lines, ["3"]);
    }

    #[test]
    fn test_interpreter_24_init_returns_instance() {
        let lines = common::run(
            r#"
class A { init() { return; } }
var a = A();
print a.init();
"#,
        );

        assert_eq!(lines, ["A instance"]);
    }

    #[test]
    fn test_interpreter_25_inheritance_and_super() {
        let lines = common::run(
            r#"
class Base {
  describe() { return "base"; }
}
class Sub < Base {
  describe() { return super.describe() + "-sub"; }
}
print Sub().describe();
"#,
        );

        assert_eq!(lines, ["base-sub"]);

        // Methods inherit without an override too.
        assert_eq!(
            common::run("class A { f() { return \"a\"; } } class B < A {} print B().f();"),
            ["a"]
        );
    }

    #[test]
    fn test_interpreter_26_super_sees_subclass_state() {
        let lines = common::run(
            r#"
class Base {
  shout() { return this.word + "!"; }
}
class Sub < Base {
  init() { this.word = "B"; }
  shout() { return super.shout(); }
}
print Sub().shout();
"#,
        );

        assert_eq!(lines, ["B!"]);
    }

    #[test]
    fn test_interpreter_27_superclass_must_be_class() {
        let err = common::try_run("var N = 1; class B < N {}").expect_err("non-class superclause");
        assert_eq!(err.to_string(), "Superclass must be a class.\n[line 1]");
    }

    #[test]
    fn test_interpreter_28_closure_captures_lexical_scope() {
        // The later shadowing declaration must not change what `show` sees.
        let lines = common::run(
            r#"
var a = "global";
{
  fun show() { print a; }
  show();
  var a = "block";
  show();
}
"#,
        );

        assert_eq!(lines, ["global", "global"]);
    }

    #[test]
    fn test_interpreter_29_sibling_closures_share_environment() {
        let lines = common::run(
            r#"
var increment;
var current;
{
  var count = 0;
  fun up() { count = count + 1; }
  fun read() { return count; }
  increment = up;
  current = read;
}
increment();
increment();
print current();
"#,
        );

        assert_eq!(lines, ["2"]);
    }

    #[test]
    fn test_interpreter_30_environment_restored_after_fault() {
        let sink = Rc::new(RefCell::new(CaptureOutput::default()));
        let mut interpreter = Interpreter::with_output(sink.clone());

        let statements = common::parse_source("{ var x = 1; print 1 + \"a\"; }");
        interpreter.add_locals(common::resolve_source(&statements));
        interpreter
            .interpret(&statements)
            .expect_err("fault inside the block");

        // The session continues at the global scope.
        let statements = common::parse_source("var y = 2; print y;");
        interpreter.add_locals(common::resolve_source(&statements));
        interpreter.interpret(&statements).expect("clean statement");

        assert_eq!(sink.borrow().lines, ["2"]);

        // The faulting block's scope is gone.
        let statements = common::parse_source("print x;");
        interpreter.add_locals(common::resolve_source(&statements));
        let err = interpreter
            .interpret(&statements)
            .expect_err("block-local name must not leak");

        assert_eq!(err.to_string(), "Undefined variable 'x'.\n[line 1]");
    }

    #[test]
    fn test_interpreter_31_locals_merge_across_inputs() {
        let sink = Rc::new(RefCell::new(CaptureOutput::default()));
        let mut interpreter = Interpreter::with_output(sink.clone());

        // Two separately parsed and resolved inputs against one interpreter,
        // the way the REPL feeds it.
        let first = common::parse_source(
            "fun make() { var n = 0; fun tick() { n = n + 1; return n; } return tick; } var t = make();",
        );
        interpreter.add_locals(common::resolve_source(&first));
        interpreter.interpret(&first).expect("first input");

        let second = common::parse_source("print t(); print t();");
        interpreter.add_locals(common::resolve_source(&second));
        interpreter.interpret(&second).expect("second input");

        assert_eq!(sink.borrow().lines, ["1", "2"]);
    }

    #[test]
    fn test_interpreter_32_clock_native() {
        assert_eq!(common::run("print clock() >= 0;"), ["true"]);
        assert_eq!(common::run("print clock;"), ["<native fn clock>"]);
    }

    #[test]
    fn test_interpreter_33_display_of_callables() {
        let lines = common::run(
            r#"
fun f() {}
class A {}
print f;
print A;
print A();
"#,
        );

        assert_eq!(lines, ["<fn f>", "A", "A instance"]);
    }

    #[test]
    fn test_interpreter_34_arguments_evaluate_left_to_right() {
        let lines = common::run(
            r#"
fun say(x) { print x; return x; }
var r = say(1) + say(2);
print r;
"#,
        );

        assert_eq!(lines, ["1", "2", "3"]);
    }

    #[test]
    fn test_interpreter_35_var_defaults_to_nil() {
        assert_eq!(common::run("var x; print x;"), ["nil"]);
    }
}
