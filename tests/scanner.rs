#[cfg(test)]
mod scanner_tests {
    use treelox as lox;

    use lox::scanner::*;
    use lox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        // `classy` and `superb` must not match the keyword prefixes.
        assert_token_sequence(
            "var classy = superb; class fun return this super",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::EQUAL, "="),
                (TokenType::IDENTIFIER, "superb"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::CLASS, "class"),
                (TokenType::FUN, "fun"),
                (TokenType::RETURN, "return"),
                (TokenType::THIS, "this"),
                (TokenType::SUPER, "super"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_numbers() {
        // A trailing dot is not part of the number; neither is a leading one.
        assert_token_sequence(
            "123 123.456 .456 123.",
            &[
                (TokenType::NUMBER(0.0), "123"),
                (TokenType::NUMBER(0.0), "123.456"),
                (TokenType::DOT, "."),
                (TokenType::NUMBER(0.0), "456"),
                (TokenType::NUMBER(0.0), "123"),
                (TokenType::DOT, "."),
                (TokenType::EOF, ""),
            ],
        );

        // Discriminant equality above ignores payloads, so check one here.
        let tokens: Vec<_> = Scanner::new("123.456")
            .filter_map(Result::ok)
            .collect();
        let TokenType::NUMBER(value) = tokens[0].token_type else {
            panic!("expected a number token, got {:?}", tokens[0].token_type);
        };

        assert_eq!(value, 123.456);
    }

    #[test]
    fn test_scanner_05_string_payload_and_lines() {
        let tokens: Vec<_> = Scanner::new("\"hello\nworld\"\nfoo")
            .filter_map(Result::ok)
            .collect();

        // Lexeme keeps the quotes, payload drops them.
        assert_eq!(tokens[0].lexeme, "\"hello\nworld\"");
        let TokenType::STRING(ref payload) = tokens[0].token_type else {
            panic!("expected a string token, got {:?}", tokens[0].token_type);
        };
        assert_eq!(payload, "hello\nworld");

        // The newline inside the string counts toward line numbering.
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].token_type, TokenType::IDENTIFIER);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_06_comments_and_whitespace() {
        let tokens: Vec<_> = Scanner::new("// nothing here\n42 / 2 // trailing\n")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].token_type, TokenType::NUMBER(0.0));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].token_type, TokenType::SLASH);
        assert_eq!(tokens[2].token_type, TokenType::NUMBER(0.0));
        assert_eq!(tokens[3].token_type, TokenType::EOF);
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // We expect this sequence:
        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            let rendered = err.to_string();
            assert!(
                rendered.contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                rendered
            );
        }

        // Helper function
        fn assert_token_matches(
            result: &Result<Token, lox::error::LoxError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(
                        token.token_type, expected_type,
                        "Expected token type {:?}, got {:?}",
                        expected_type, token.token_type
                    );
                    assert_eq!(
                        token.lexeme, expected_lexeme,
                        "Expected lexeme '{}', got '{}'",
                        expected_lexeme, token.lexeme
                    );
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn test_scanner_07_unterminated_string() {
        let results: Vec<_> = Scanner::new("var s = \"oops").collect();

        let last_before_eof = &results[results.len() - 2];
        let err = last_before_eof
            .as_ref()
            .expect_err("unterminated string should error");

        assert_eq!(err.to_string(), "[line 1] Error: Unterminated string.");
    }

    #[test]
    fn test_scanner_08_single_eof_then_none() {
        let mut scanner = Scanner::new("");

        let first = scanner.next().expect("empty source still yields EOF");
        assert_eq!(first.expect("EOF is not an error").token_type, TokenType::EOF);

        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
