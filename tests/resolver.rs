#[cfg(test)]
mod resolver_tests {
    use rox::error::Diagnostics;
    use rox::interpreter::Interpreter;
    use rox::parser::Parser;
    use rox::resolver::Resolver;
    use rox::scanner::scan_tokens;

    /// Scan, parse and resolve `source`, returning the rendered resolver
    /// diagnostics.  The source must be free of syntax errors.
    fn resolve(source: &str) -> Vec<String> {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens(source, &mut diagnostics);
        let statements = Parser::new(&tokens).parse(&mut diagnostics);
        assert!(
            diagnostics.is_empty(),
            "syntax errors: {:?}",
            diagnostics.messages()
        );

        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter).resolve(&statements, &mut diagnostics);

        diagnostics.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_valid_program_has_no_errors() {
        let source = r#"
            var a = 1;
            fun outer(x) {
                var y = x;
                fun inner() { return x + y + a; }
                return inner;
            }
            class Point {
                init(x) { this.x = x; }
                get() { return fun () { return this.x; }; }
            }
            for (var i = 0; i < 3; i = i + 1) { if (i == 1) break; }
        "#;

        assert!(resolve(source).is_empty());
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            resolve("{ var a = a; }"),
            ["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_global_self_reference_is_left_to_runtime() {
        assert!(resolve("var a = a;").is_empty());
    }

    #[test]
    fn test_outer_binding_in_initializer_is_fine() {
        // Only the innermost scope is checked.
        assert!(resolve("{ var a = 1; { var b = a; } }").is_empty());
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        assert_eq!(
            resolve("{ var a = 1;\n var a = 2; }"),
            ["[line 2] Error at 'a': Already a variable with this name in this scope."]
        );
        assert_eq!(
            resolve("fun f(a, a) {}"),
            ["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
        // Globals may be redeclared.
        assert!(resolve("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_top_level_return() {
        assert_eq!(
            resolve("return 1;"),
            ["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(
            resolve("break;"),
            ["[line 1] Error at 'break': Can't use 'break' outside of a loop."]
        );
        assert_eq!(
            resolve("if (true) { break; }"),
            ["[line 1] Error at 'break': Can't use 'break' outside of a loop."]
        );
    }

    #[test]
    fn test_break_does_not_cross_function_boundary() {
        assert_eq!(
            resolve("while (true) { fun f() { break; } }"),
            ["[line 1] Error at 'break': Can't use 'break' outside of a loop."]
        );
        assert!(resolve("fun f() { while (true) { break; } }").is_empty());
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            resolve("print this;"),
            ["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
        assert_eq!(
            resolve("fun f() { return this; }"),
            ["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
    }

    #[test]
    fn test_errors_accumulate_in_order() {
        assert_eq!(
            resolve("return;\nbreak;\n{ var b = b; }"),
            [
                "[line 1] Error at 'return': Can't return from top-level code.",
                "[line 2] Error at 'break': Can't use 'break' outside of a loop.",
                "[line 3] Error at 'b': Can't read local variable in its own initializer.",
            ]
        );
    }
}
