// Parser for loop-language source files.
//
// Parses a token stream (from the lexer) into the uniform `Node` tree of
// `ast.rs`. Uses chumsky combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics; parsing continues.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: AST plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Option<Node>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a source string. Lexes then parses.
///
/// Returns an AST (if parsing succeeded) plus any errors.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = program_parser(source);
    let (program, parse_errors) = parser.parse(stream).into_output_errors();

    // Merge lex errors + parse errors.
    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        program,
        errors: all_errors,
    }
}

// ── Main parser builder ──
//
// All grammar rules are built inside `program_parser` so that the `source`
// reference is captured once and shared by all combinators.

fn program_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Node, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    // ── Identifier / number ──

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        source[span.start()..span.end()].to_string()
    });

    let number = select! { Token::Number(n) => n };

    // ── Array reference: IDENT '[' (IDENT | NUMBER) ']' ──

    let index = ident
        .clone()
        .map(Index::Var)
        .or(number.clone().map(Index::Literal));

    let array_ref = ident
        .clone()
        .then(index.delimited_by(just(Token::LBracket), just(Token::RBracket)))
        .map(|(array, index)| ArrayRef { array, index });

    // ── Expression: ref '+' (ref | NUMBER) | ref | NUMBER ──

    let plus_rhs = array_ref
        .clone()
        .map(Operand::Array)
        .or(number.clone().map(Operand::Number));

    let expr = choice((
        array_ref
            .clone()
            .then_ignore(just(Token::Plus))
            .then(plus_rhs)
            .map_with(|(left, right), e| {
                Node::leaf(
                    NodeKind::Plus,
                    NodeValue::Plus(PlusValue { left, right }),
                    e.span(),
                )
            }),
        array_ref
            .clone()
            .map_with(|r, e| Node::leaf(NodeKind::Array, NodeValue::Array(r), e.span())),
        number
            .clone()
            .map_with(|n, e| Node::leaf(NodeKind::Number, NodeValue::Number(n), e.span())),
    ));

    // ── Assignment: target '=' expr ';' ──

    let target = array_ref
        .clone()
        .map(AssignTarget::Array)
        .or(ident.clone().map(AssignTarget::Scalar));

    let assignment = target
        .then_ignore(just(Token::Equals))
        .then(expr)
        .then_ignore(just(Token::Semicolon))
        .map_with(|(target, expr), e| {
            Node::new(
                NodeKind::Assign,
                vec![expr],
                Some(NodeValue::Assign(target)),
                e.span(),
            )
        });

    // ── Declaration: 'int' IDENT ('[' NUMBER ']')? ';' ──

    let size = number.clone().try_map(|n, span| {
        if n > 0 {
            Ok(n)
        } else {
            Err(Rich::custom(span, "array size must be positive"))
        }
    });

    let declaration = just(Token::Int)
        .ignore_then(ident.clone())
        .then(
            size.delimited_by(just(Token::LBracket), just(Token::RBracket))
                .or_not(),
        )
        .then_ignore(just(Token::Semicolon))
        .map_with(|(id, size), e| {
            Node::leaf(NodeKind::Decl, NodeValue::Decl(DeclValue { id, size }), e.span())
        });

    // ── Loop header clauses ──

    let for_init = just(Token::Int)
        .or_not()
        .ignore_then(ident.clone())
        .then_ignore(just(Token::Equals))
        .then(number.clone())
        .map_with(|(var, start), e| {
            Node::leaf(
                NodeKind::ForInit,
                NodeValue::ForInit(ForInitValue { var, start }),
                e.span(),
            )
        });

    let cond_op = select! {
        Token::Le => CondOp::Le,
        Token::Lt => CondOp::Lt,
    };

    let for_cond = ident
        .clone()
        .then(cond_op)
        .then(number.clone())
        .map_with(|((var, op), end), e| {
            Node::leaf(
                NodeKind::ForCond,
                NodeValue::ForCond(ForCondValue { var, op, end }),
                e.span(),
            )
        });

    let step = choice((
        just(Token::PlusPlus).to(None),
        just(Token::PlusEqual).ignore_then(number).map(Some),
    ));

    let for_incr = ident.clone().then(step).map_with(|(var, step), e| {
        Node::leaf(
            NodeKind::ForIncr,
            NodeValue::ForIncr(ForIncrValue { var, step }),
            e.span(),
        )
    });

    let header = for_init
        .then_ignore(just(Token::Semicolon))
        .then(for_cond)
        .then_ignore(just(Token::Semicolon))
        .then(for_incr)
        .delimited_by(just(Token::LParen), just(Token::RParen));

    // ── Statements (loops nest, so the rule is recursive) ──

    let statement = recursive(|statement| {
        let body = statement
            .repeated()
            .collect::<Vec<_>>()
            .map_with(|stmts, e| Node::new(NodeKind::Statements, stmts, None, e.span()))
            .delimited_by(just(Token::LBrace), just(Token::RBrace));

        let for_loop = just(Token::For)
            .ignore_then(header)
            .then(body)
            .try_map(|(((init, cond), _incr), body), span| {
                // The increment clause is parsed for validity only; the loop
                // always advances by one in the IR.
                let Some(NodeValue::ForInit(init)) = init.value else {
                    return Err(Rich::custom(span, "malformed loop initializer"));
                };
                let Some(NodeValue::ForCond(cond)) = cond.value else {
                    return Err(Rich::custom(span, "malformed loop condition"));
                };
                let value = ForValue {
                    var: init.var,
                    start: init.start,
                    end: cond.end,
                    cond_op: cond.op,
                };
                Ok(Node::new(
                    NodeKind::For,
                    vec![body],
                    Some(NodeValue::For(value)),
                    span,
                ))
            });

        choice((declaration, for_loop, assignment))
    });

    // ── Program ──

    statement
        .repeated()
        .collect::<Vec<_>>()
        .map_with(|statements, e| {
            let span: SimpleSpan = e.span();
            let body = Node::new(NodeKind::Statements, statements, None, span);
            Node::new(NodeKind::Program, vec![body], None, span)
        })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Node {
        let result = parse(source);
        assert!(
            result.errors.is_empty(),
            "unexpected errors: {:#?}",
            result.errors
        );
        result.program.expect("expected program")
    }

    /// Statements directly under the program root.
    fn top_statements(program: &Node) -> &[Node] {
        assert_eq!(program.kind, NodeKind::Program);
        assert_eq!(program.children.len(), 1);
        let stmts = &program.children[0];
        assert_eq!(stmts.kind, NodeKind::Statements);
        &stmts.children
    }

    #[test]
    fn empty_program() {
        let prog = parse_ok("");
        assert!(top_statements(&prog).is_empty());
    }

    #[test]
    fn array_declaration() {
        let prog = parse_ok("int a[100];");
        let stmts = top_statements(&prog);
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].kind, NodeKind::Decl);
        assert_eq!(
            stmts[0].value,
            Some(NodeValue::Decl(DeclValue {
                id: "a".into(),
                size: Some(100),
            }))
        );
    }

    #[test]
    fn scalar_declaration() {
        let prog = parse_ok("int x;");
        let stmts = top_statements(&prog);
        assert_eq!(
            stmts[0].value,
            Some(NodeValue::Decl(DeclValue {
                id: "x".into(),
                size: None,
            }))
        );
    }

    #[test]
    fn zero_size_rejected() {
        let result = parse("int a[0];");
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn for_loop_header() {
        let prog = parse_ok("for (int i = 0; i <= 99; i++) { a[i] = 1; }");
        let stmts = top_statements(&prog);
        assert_eq!(stmts.len(), 1);
        let for_node = &stmts[0];
        assert_eq!(for_node.kind, NodeKind::For);
        assert_eq!(
            for_node.value,
            Some(NodeValue::For(ForValue {
                var: "i".into(),
                start: 0,
                end: 99,
                cond_op: CondOp::Le,
            }))
        );
        assert_eq!(for_node.children.len(), 1);
        assert_eq!(for_node.children[0].kind, NodeKind::Statements);
        assert_eq!(for_node.children[0].children.len(), 1);
    }

    #[test]
    fn for_loop_without_int_and_with_step() {
        let prog = parse_ok("for (j = 2; j < 10; j += 3) { }");
        let stmts = top_statements(&prog);
        assert_eq!(
            stmts[0].value,
            Some(NodeValue::For(ForValue {
                var: "j".into(),
                start: 2,
                end: 10,
                cond_op: CondOp::Lt,
            }))
        );
        assert!(stmts[0].children[0].children.is_empty());
    }

    #[test]
    fn assignment_shapes() {
        let prog = parse_ok(
            "a[i] = b[i] + c[i];\n\
             a[i] = b[i] + 1;\n\
             x = b[0];\n\
             y = 7;",
        );
        let stmts = top_statements(&prog);
        assert_eq!(stmts.len(), 4);
        assert!(stmts.iter().all(|s| s.kind == NodeKind::Assign));

        let kinds: Vec<NodeKind> = stmts.iter().map(|s| s.children[0].kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Plus,
                NodeKind::Plus,
                NodeKind::Array,
                NodeKind::Number
            ]
        );

        assert!(matches!(
            &stmts[0].value,
            Some(NodeValue::Assign(AssignTarget::Array(r))) if r.array == "a"
        ));
        assert!(matches!(
            &stmts[2].value,
            Some(NodeValue::Assign(AssignTarget::Scalar(name))) if name == "x"
        ));
        assert!(matches!(
            &stmts[1].children[0].value,
            Some(NodeValue::Plus(PlusValue { right: Operand::Number(1), .. }))
        ));
    }

    #[test]
    fn nested_loops_parse() {
        let prog = parse_ok(
            "for (int i = 0; i < 4; i++) {\n\
               for (int j = 0; j < 4; j++) { a[j] = 0; }\n\
             }",
        );
        let stmts = top_statements(&prog);
        let outer_body = &stmts[0].children[0];
        assert_eq!(outer_body.children.len(), 1);
        assert_eq!(outer_body.children[0].kind, NodeKind::For);
    }

    #[test]
    fn missing_semicolon_is_error() {
        let result = parse("a[i] = 1");
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn lex_errors_are_reported() {
        let result = parse("int a[4]; $");
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn chained_addition_is_rejected() {
        let result = parse("a[i] = b[i] + c[i] + d[i];");
        assert!(!result.errors.is_empty());
    }
}
