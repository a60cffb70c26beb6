#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use rox::lox::{Lox, Outcome};

    /// `Write` sink the test keeps a handle to after the session takes it.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn take(&self) -> String {
            String::from_utf8(std::mem::take(&mut *self.0.borrow_mut())).unwrap()
        }
    }

    fn session() -> (Lox, SharedBuf) {
        let out = SharedBuf::default();
        (Lox::with_output(Box::new(out.clone())), out)
    }

    /// Run a whole program, returning its output and outcome.
    fn run(source: &str) -> (String, Outcome) {
        let (mut lox, out) = session();
        let outcome = lox.run(source);
        (out.take(), outcome)
    }

    /// Run a program that must succeed and return its output.
    fn output(source: &str) -> String {
        let (printed, outcome) = run(source);
        let errors: Vec<String> = outcome.errors().map(|e| e.to_string()).collect();
        assert!(outcome.is_ok(), "unexpected errors: {:?}", errors);
        printed
    }

    /// Run `body` on a thread whose stack holds the deepest allowed recursion.
    fn with_interpreter_stack<F: FnOnce() + Send + 'static>(body: F) {
        std::thread::Builder::new()
            .stack_size(32 * 1024 * 1024)
            .spawn(body)
            .unwrap()
            .join()
            .unwrap();
    }

    fn runtime_error(source: &str) -> (String, String) {
        let (printed, outcome) = run(source);
        assert_eq!(outcome.exit_code(), 70);
        let error = outcome.runtime_error.expect("runtime error").to_string();
        (printed, error)
    }

    #[test]
    fn test_arithmetic_and_concatenation() {
        assert_eq!(output("print 1 + 2;"), "3\n");
        assert_eq!(output("print \"a\" + \"b\";"), "ab\n");
        assert_eq!(output("print \"x\" + 1;"), "x1\n");
        assert_eq!(output("print 1 + \"x\";"), "1x\n");
        assert_eq!(output("print 10 / 4 - 1 * 2;"), "0.5\n");
        assert_eq!(output("print -(3);"), "-3\n");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(output("print 3.0;"), "3\n");
        assert_eq!(output("print 3.5;"), "3.5\n");
        assert_eq!(output("print 0.1 + 0.2 > 0.3;"), "true\n");
        assert_eq!(output("print -0; print 0 * -1;"), "0\n0\n");
    }

    #[test]
    fn test_truthiness_and_equality() {
        assert_eq!(
            output("print !nil; print !0; print !\"\"; print nil == false; print 1 == 1; print \"a\" != \"a\";"),
            "true\nfalse\nfalse\nfalse\ntrue\nfalse\n"
        );
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(
            output("print nil or \"yes\"; print 1 and 2; print false and 1;"),
            "yes\n2\nfalse\n"
        );
    }

    #[test]
    fn test_ternary_and_comma() {
        assert_eq!(output("print true ? 1 : 2;"), "1\n");
        assert_eq!(output("print nil ? 1 : false ? 2 : 3;"), "3\n");
        assert_eq!(output("var a = (1, 2);\nprint a;"), "2\n");
    }

    #[test]
    fn test_left_to_right_evaluation() {
        let source = r#"
            fun trace(x) { print x; return x; }
            print trace(1) + trace(2);
            print trace("a") == trace("b");
        "#;

        assert_eq!(output(source), "1\n2\n3\na\nb\nfalse\n");
    }

    #[test]
    fn test_division_by_zero_aborts_unit() {
        let (printed, error) = runtime_error("print 1;\nprint 1 / 0;\nprint 2;");

        assert_eq!(printed, "1\n");
        assert_eq!(error, "Division by zero.\n[line 2]");
    }

    #[test]
    fn test_type_errors() {
        assert_eq!(
            runtime_error("print -\"a\";").1,
            "Operand of '-' must be a number.\n[line 1]"
        );
        assert_eq!(
            runtime_error("print 1 < \"a\";").1,
            "Operands of '<' must be numbers.\n[line 1]"
        );
        assert_eq!(
            runtime_error("print nil + 1;").1,
            "Operands of '+' must be two numbers or include a string.\n[line 1]"
        );
    }

    #[test]
    fn test_variables() {
        assert_eq!(
            output("var a = 1; { var a = 2; print a; } print a; a = 3; print a;"),
            "2\n1\n3\n"
        );
        assert_eq!(
            runtime_error("print nope;").1,
            "Undefined variable 'nope'.\n[line 1]"
        );
        assert_eq!(
            runtime_error("nope = 1;").1,
            "Undefined variable 'nope'.\n[line 1]"
        );
    }

    #[test]
    fn test_unassigned_variable() {
        assert_eq!(
            runtime_error("var a;\nprint a;").1,
            "Variable 'a' has not been assigned.\n[line 2]"
        );
        assert_eq!(output("var a; a = \"set\"; print a;"), "set\n");
        assert_eq!(
            runtime_error("{ var b; print b; }").1,
            "Variable 'b' has not been assigned.\n[line 1]"
        );
    }

    #[test]
    fn test_control_flow() {
        assert_eq!(
            output("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
        assert_eq!(
            output("var i = 0; while (i < 2) { print i; i = i + 1; } if (i == 2) print \"done\"; else print \"no\";"),
            "0\n1\ndone\n"
        );
    }

    #[test]
    fn test_nested_break_exits_inner_loop_only() {
        let source = r#"
            for (var i = 0; i < 3; i = i + 1) {
                for (var j = 0; j < 3; j = j + 1) {
                    if (j == 1) break;
                    print i * 10 + j;
                }
                if (i == 1) break;
            }
            print "after";
        "#;

        assert_eq!(output(source), "0\n10\nafter\n");
    }

    #[test]
    fn test_break_inside_block_in_while() {
        assert_eq!(
            output("var n = 0; while (true) { { n = n + 1; if (n > 2) break; } } print n;"),
            "3\n"
        );
    }

    #[test]
    fn test_functions_and_recursion() {
        let source = r#"
            fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
            print fib(10);
            fun noop() {}
            print noop();
            print fib;
            print clock;
        "#;

        assert_eq!(output(source), "55\nnil\n<fn fib>\n<native fn clock>\n");
    }

    #[test]
    fn test_return_unwinds_loops() {
        assert_eq!(
            output("fun f() { while (true) { for (;;) { return \"out\"; } } } print f();"),
            "out\n"
        );
    }

    #[test]
    fn test_closure_counters_are_independent() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a();
            print a();
            print b();
        "#;

        assert_eq!(output(source), "1\n2\n1\n");
    }

    #[test]
    fn test_closure_binding_is_static() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;

        assert_eq!(output(source), "global\nglobal\n");
    }

    #[test]
    fn test_anonymous_functions() {
        assert_eq!(
            output("var twice = fun (f, x) { return f(f(x)); }; print twice(fun (n) { return n * 2; }, 3); print fun () {};"),
            "12\n<fn>\n"
        );
    }

    #[test]
    fn test_call_errors() {
        assert_eq!(
            runtime_error("fun f(a) {}\nf(1, 2);").1,
            "Expected 1 arguments but got 2.\n[line 2]"
        );
        assert_eq!(
            runtime_error("\"str\"();").1,
            "Can only call functions and classes.\n[line 1]"
        );
    }

    #[test]
    fn test_classes() {
        let source = r#"
            class Point {
                init(x) { this.x = x; }
                getX() { return this.x; }
            }
            var p = Point(7);
            print p.getX();
            print p;
            print Point;
            var m = p.getX;
            p.x = 8;
            print m();
            print p.init(1) == p;
        "#;

        assert_eq!(output(source), "7\nPoint instance\nPoint\n8\ntrue\n");
    }

    #[test]
    fn test_init_arity_is_class_arity() {
        assert_eq!(
            runtime_error("class P { init(x) {} }\nP();").1,
            "Expected 1 arguments but got 0.\n[line 2]"
        );
        assert_eq!(
            runtime_error("class E {}\nE(1);").1,
            "Expected 0 arguments but got 1.\n[line 2]"
        );
    }

    #[test]
    fn test_early_return_in_init_yields_instance() {
        assert_eq!(
            output("class A { init() { this.v = 1; return; this.v = 2; } } print A().v;"),
            "1\n"
        );
    }

    #[test]
    fn test_fields_shadow_methods() {
        assert_eq!(
            output("class A { m() { return \"method\"; } } var a = A(); a.m = \"field\"; print a.m;"),
            "field\n"
        );
    }

    #[test]
    fn test_property_errors() {
        assert_eq!(
            runtime_error("class A {}\nprint A().missing;").1,
            "Undefined property 'missing'.\n[line 2]"
        );
        assert_eq!(
            runtime_error("var x = 1;\nprint x.y;").1,
            "Only instances have properties.\n[line 2]"
        );
        assert_eq!(
            runtime_error("var x = 1;\nx.y = 2;").1,
            "Only instances have fields.\n[line 2]"
        );
    }

    #[test]
    fn test_identity_equality() {
        assert_eq!(
            output("class A {} var a = A(); var b = A(); print a == a; print a == b; fun f() {} print f == f;"),
            "true\nfalse\ntrue\n"
        );
    }

    #[test]
    fn test_clock_is_a_number() {
        assert_eq!(output("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        let (printed, outcome) = run("print 1;\nprint ;");
        assert_eq!(printed, "");
        assert_eq!(outcome.exit_code(), 65);

        let (printed, outcome) = run("print 1;\nreturn 2;");
        assert_eq!(printed, "");
        assert_eq!(outcome.exit_code(), 65);
        assert_eq!(
            outcome.diagnostics.messages(),
            ["Can't return from top-level code."]
        );
    }

    #[test]
    fn test_session_keeps_globals_across_units() {
        let (mut lox, out) = session();

        assert!(lox.run("var a = 1;").is_ok());
        assert!(lox.run("{ var b = 2; fun f() { return b; } a = f; }").is_ok());
        assert!(lox.run("print a();").is_ok());
        assert_eq!(out.take(), "2\n");

        // An error in one unit leaves the next one clean.
        assert_eq!(lox.run("print ;").exit_code(), 65);
        assert_eq!(lox.run("print nope;").exit_code(), 70);

        let outcome = lox.run("{ var c = 3; print c + a(); }");
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(out.take(), "5\n");
    }

    #[test]
    fn test_runtime_error_restores_global_scope() {
        let (mut lox, out) = session();

        assert_eq!(lox.run("var x = \"global\"; { var x = \"inner\"; print 1 / 0; }").exit_code(), 70);
        assert!(lox.run("print x;").is_ok());
        assert_eq!(out.take(), "global\n");
    }

    #[test]
    fn test_runaway_recursion_is_a_runtime_error() {
        with_interpreter_stack(|| {
            let (mut lox, out) = session();

            let outcome = lox.run("fun f(n) { return f(n + 1); }\nf(0);");
            assert_eq!(outcome.exit_code(), 70);
            assert_eq!(
                outcome.runtime_error.unwrap().to_string(),
                "Stack overflow.\n[line 1]"
            );

            // The session survives and the call depth is back to zero.
            assert!(lox.run("print f;").is_ok());
            assert!(lox
                .run("fun g(n) { if (n == 0) return 0; return g(n - 1); } print g(900);")
                .is_ok());
            assert_eq!(out.take(), "<fn f>\n0\n");
        });
    }
}
