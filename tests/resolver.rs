mod common;

#[cfg(test)]
mod resolver_tests {
    use crate::common;

    #[test]
    fn test_resolver_01_self_initializer_read() {
        let errors = common::resolve_errors("{ var a = a; }");

        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("Can't read local variable in its own initializer."));
    }

    #[test]
    fn test_resolver_02_top_level_self_reference_is_global() {
        // At top level the name is global, so the initializer rule does not
        // apply and nothing lands in the distance table.
        let statements = common::parse_source("var a = a;");
        let locals = common::resolve_source(&statements);

        assert!(locals.is_empty());
    }

    #[test]
    fn test_resolver_03_duplicate_declaration() {
        let errors = common::resolve_errors("{ var a = 1; var a = 2; }");

        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("Already a variable with this name in this scope."));

        // Redeclaring a global is allowed.
        let statements = common::parse_source("var a = 1; var a = 2;");
        common::resolve_source(&statements);
    }

    #[test]
    fn test_resolver_04_return_rules() {
        let errors = common::resolve_errors("return 1;");
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("Can't return from top-level code."));

        let errors = common::resolve_errors("class A { init() { return 1; } }");
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("Can't return a value from an initializer."));

        // Value-less returns are fine anywhere inside a function.
        let statements = common::parse_source("class A { init() { return; } }");
        common::resolve_source(&statements);

        let statements = common::parse_source("fun f() { return 1; }");
        common::resolve_source(&statements);
    }

    #[test]
    fn test_resolver_05_this_and_super_rules() {
        let errors = common::resolve_errors("print this;");
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("Can't use 'this' outside of a class."));

        let errors = common::resolve_errors("fun f() { return this; }");
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("Can't use 'this' outside of a class."));

        let errors = common::resolve_errors("print super.f;");
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("Can't use 'super' outside of a class."));

        let errors = common::resolve_errors("class A { f() { return super.f(); } }");
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("Can't use 'super' in a class with no superclass."));
    }

    #[test]
    fn test_resolver_06_class_self_inheritance() {
        let errors = common::resolve_errors("class A < A {}");

        assert_eq!(errors.len(), 1);

        let rendered = errors[0].to_string();
        assert!(rendered.contains("A class can't inherit from itself."), "got: {}", rendered);
        assert!(rendered.contains(" at 'A'"), "got: {}", rendered);
    }

    #[test]
    fn test_resolver_07_accumulates_multiple_errors() {
        let errors = common::resolve_errors("return 1;\nprint this;");

        assert_eq!(errors.len(), 2);
        assert!(errors[0]
            .to_string()
            .contains("Can't return from top-level code."));
        assert!(errors[1]
            .to_string()
            .contains("Can't use 'this' outside of a class."));
    }

    #[test]
    fn test_resolver_08_distances_count_scope_hops() {
        let statements = common::parse_source(
            "var a = 1;\n{\n  var b = 2;\n  {\n    print b;\n    print a;\n    var c = 3;\n    print c;\n  }\n}",
        );
        let locals = common::resolve_source(&statements);

        // `b` is one scope out, `c` is in the same scope, `a` is global and
        // stays out of the table.
        let mut distances: Vec<usize> = locals.values().copied().collect();
        distances.sort_unstable();

        assert_eq!(distances, [0, 1]);
    }

    #[test]
    fn test_resolver_09_closure_distance() {
        let statements =
            common::parse_source("fun outer() {\n  var x = 1;\n  fun inner() {\n    print x;\n  }\n}");
        let locals = common::resolve_source(&statements);

        let distances: Vec<usize> = locals.values().copied().collect();

        assert_eq!(distances, [1]);
    }

    #[test]
    fn test_resolver_10_method_scope_distances() {
        let statements = common::parse_source(
            "class A {}\nclass B < A {\n  f() { return super.f; }\n  g() { return this; }\n}",
        );
        let locals = common::resolve_source(&statements);

        // `this` sits one hop out of the method body, `super` two.
        let mut distances: Vec<usize> = locals.values().copied().collect();
        distances.sort_unstable();

        assert_eq!(distances, [1, 2]);
    }

    #[test]
    fn test_resolver_11_idempotent() {
        let statements = common::parse_source("{ var a = 1; { print a; } }");

        let first = common::resolve_source(&statements);
        let second = common::resolve_source(&statements);

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
