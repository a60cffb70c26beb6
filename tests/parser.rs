#[cfg(test)]
mod parser_tests {
    use rox::ast::{Expr, ExprId, Stmt};
    use rox::ast_printer::Ast;
    use rox::error::Diagnostics;
    use rox::parser::Parser;
    use rox::scanner::scan_tokens;

    fn parse(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens(source, &mut diagnostics);
        let statements = Parser::new(&tokens).parse(&mut diagnostics);

        (statements, diagnostics)
    }

    /// Parse cleanly and print every statement.
    fn printed(source: &str) -> Vec<String> {
        let (statements, diagnostics) = parse(source);
        assert!(
            diagnostics.is_empty(),
            "unexpected errors: {:?}",
            diagnostics.messages()
        );

        statements.iter().map(|s| Ast.print_stmt(s)).collect()
    }

    fn errors(source: &str) -> Vec<String> {
        let (_, diagnostics) = parse(source);
        diagnostics.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(printed("1 + 2 * 3;"), ["(; (+ 1.0 (* 2.0 3.0)))"]);
        assert_eq!(printed("1 - 2 - 3;"), ["(; (- (- 1.0 2.0) 3.0))"]);
        assert_eq!(printed("!-x == (y);"), ["(; (== (! (- x)) (group y)))"]);
        assert_eq!(
            printed("a or b and c;"),
            ["(; (or a (and b c)))"]
        );
    }

    #[test]
    fn test_comma_operator_is_lowest() {
        assert_eq!(printed("a = 1, b;"), ["(; (, (= a 1.0) b))"]);
    }

    #[test]
    fn test_ternary_nests_to_the_right() {
        assert_eq!(
            printed("a ? b : c ? d : e;"),
            ["(; (?: a b (?: c d e)))"]
        );
        // The middle operand is a full expression.
        assert_eq!(printed("a ? b, c : d;"), ["(; (?: a (, b c) d))"]);
    }

    #[test]
    fn test_ternary_requires_colon() {
        assert_eq!(
            errors("a ? b;"),
            ["[line 1] Error at ';': Expect ':' in ternary expression."]
        );
    }

    #[test]
    fn test_calls_and_properties_chain() {
        assert_eq!(printed("a.b(c, d).e;"), ["(; (. (call (. a b) c d) e))"]);
        assert_eq!(printed("a.b = 1;"), ["(; (= (. a b) 1.0))"]);
    }

    #[test]
    fn test_for_desugars_to_while() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            ["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );
        assert_eq!(printed("for (;;) break;"), ["(while true (break))"]);
    }

    #[test]
    fn test_declarations() {
        assert_eq!(printed("var a;"), ["(var a)"]);
        assert_eq!(
            printed("fun add(a, b) { return a + b; }"),
            ["(fun add (a b) (return (+ a b)))"]
        );
        assert_eq!(
            printed("var f = fun (a) { return a; };"),
            ["(var f (fun (a) (return a)))"]
        );
        assert_eq!(
            printed("class P { init(x) { this.x = x; } get() { return this.x; } }"),
            ["(class P (init (x) (; (= (. this x) x))) (get () (return (. this x))))"]
        );
    }

    #[test]
    fn test_control_flow_statements() {
        assert_eq!(
            printed("if (a) print 1; else { print 2; }"),
            ["(if a (print 1.0) (block (print 2.0)))"]
        );
        assert_eq!(
            printed("while (true) { break; }"),
            ["(while true (block (break)))"]
        );
    }

    #[test]
    fn test_invalid_assignment_target_keeps_statement() {
        let (statements, diagnostics) = parse("a + b = c; print 1;");

        assert_eq!(
            diagnostics.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            ["[line 1] Error at '=': Invalid assignment target."]
        );
        assert_eq!(statements.len(), 2);
        assert!(matches!(statements[0], Stmt::Expression(_)));
    }

    #[test]
    fn test_leading_binary_operator() {
        assert_eq!(
            errors("== 3;"),
            ["[line 1] Error at '==': Binary operator '==' without left operand."]
        );
        assert_eq!(
            errors("* 3;"),
            ["[line 1] Error at '*': Binary operator '*' without left operand."]
        );
        // Unary minus is not an error.
        assert!(errors("-3;").is_empty());
    }

    #[test]
    fn test_recovery_leaves_placeholders() {
        let (statements, diagnostics) = parse("print ;\nvar = 2;\nprint 3;");

        assert_eq!(
            diagnostics.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            [
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at '=': Expect variable name.",
            ]
        );
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0], Stmt::Empty);
        assert_eq!(statements[1], Stmt::Empty);
        assert_eq!(Ast.print_stmt(&statements[2]), "(print 3.0)");
    }

    #[test]
    fn test_error_at_end() {
        assert_eq!(
            errors("print 1"),
            ["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn test_super_is_reserved() {
        assert_eq!(
            errors("super.x;"),
            ["[line 1] Error at 'super': 'super' is reserved and not supported."]
        );
    }

    #[test]
    fn test_too_many_arguments_is_reported_not_fatal() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let (statements, diagnostics) = parse(&source);

        assert_eq!(
            diagnostics.messages(),
            ["Can't have more than 255 arguments."]
        );
        match &statements[0] {
            Stmt::Expression(Expr::Call { arguments, .. }) => assert_eq!(arguments.len(), 256),
            other => panic!("expected a call, got {:?}", other),
        }
    }

    #[test]
    fn test_too_many_parameters_is_reported_not_fatal() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}\nprint 1;", params.join(", "));

        let (statements, diagnostics) = parse(&source);

        assert_eq!(
            diagnostics.messages(),
            ["Can't have more than 255 parameters."]
        );
        assert_eq!(statements.len(), 2);
        match &statements[0] {
            Stmt::Function(decl) => assert_eq!(decl.function.params.len(), 256),
            other => panic!("expected a function declaration, got {:?}", other),
        }
        assert_eq!(Ast.print_stmt(&statements[1]), "(print 1.0)");
    }

    #[test]
    fn test_reparse_is_identical() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens("var a = 1; { fun f() { return a; } print f(); }", &mut diagnostics);

        let first = Parser::new(&tokens).parse(&mut diagnostics);
        let second = Parser::new(&tokens).parse(&mut diagnostics);

        assert!(diagnostics.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_ids_continue_from_first_id() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens("a = b;", &mut diagnostics);

        let mut parser = Parser::new(&tokens).with_first_id(10);
        let statements = parser.parse(&mut diagnostics);

        // `a` becomes the Assign node and keeps its id; `b` gets the next.
        assert_eq!(parser.next_id(), 12);
        match &statements[0] {
            Stmt::Expression(Expr::Assign { id, value, .. }) => {
                assert_eq!(*id, ExprId(10));
                assert!(matches!(**value, Expr::Variable { id: ExprId(11), .. }));
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
    }
}
