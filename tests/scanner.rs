use skink::prelude::*;

fn scan(source: &str) -> Vec<Token> {
    Scanner::new(source, "<test>").scan_tokens().expect("failed to scan the source")
}

fn token_types(source: &str) -> Vec<TokenType> {
    scan(source).iter().map(|t| t.token_type).collect()
}

fn scan_error(source: &str) -> LexError {
    Scanner::new(source, "<test>").scan_tokens().expect_err("source should not scan")
}

fn number(token: &Token) -> Number {
    match token.literal {
        Some(Literal::Number(n)) => n,
        ref other => panic!("expected a number literal, got {other:?}"),
    }
}

#[test]
fn scanner_works() {
    let input = "2 and 3";
    let tokens = scan(input);
    assert_eq!(tokens.len(), 4);
}

#[test]
fn number_kinds() {
    let tokens = scan("1 2L 3l 3.5 .5 5. 4294967297");
    let numbers: Vec<Number> = tokens[..7].iter().map(number).collect();

    assert_eq!(
        numbers,
        vec![
            Number::Int(1),
            Number::Long(2),
            Number::Long(3),
            Number::Double(3.5),
            Number::Double(0.5),
            Number::Double(5.0),
            Number::Int(1),
        ]
    );
    assert_eq!(tokens[1].token_type, TokenType::Long);
    assert_eq!(tokens[3].token_type, TokenType::Double);
}

#[test]
fn dot_after_number_before_a_name_is_member_access() {
    assert_eq!(
        token_types("1.x"),
        vec![TokenType::Int, TokenType::Dot, TokenType::Identifier, TokenType::EOF]
    );
}

#[test]
fn identifiers_and_keywords() {
    assert_eq!(
        token_types("$a _b c1 while elif namespace not"),
        vec![
            TokenType::Identifier,
            TokenType::Identifier,
            TokenType::Identifier,
            TokenType::While,
            TokenType::Elif,
            TokenType::Namespace,
            TokenType::Not,
            TokenType::EOF,
        ]
    );
}

#[test]
fn operators() {
    assert_eq!(
        token_types("== != <= >= < > = % [ ]"),
        vec![
            TokenType::EqualEqual,
            TokenType::BangEqual,
            TokenType::LessEqual,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::Greater,
            TokenType::Equal,
            TokenType::Percent,
            TokenType::LeftBracket,
            TokenType::RightBracket,
            TokenType::EOF,
        ]
    );
}

#[test]
fn newlines_and_semicolons_separate_statements() {
    assert_eq!(
        token_types("a\nb;c\r\n"),
        vec![
            TokenType::Identifier,
            TokenType::Newline,
            TokenType::Identifier,
            TokenType::Newline,
            TokenType::Identifier,
            TokenType::Newline,
            TokenType::EOF,
        ]
    );
}

#[test]
fn block_comments_are_skipped() {
    assert_eq!(
        token_types("1 /* two\nlines */ 2"),
        vec![TokenType::Int, TokenType::Int, TokenType::EOF]
    );
}

#[test]
fn string_escapes() {
    let tokens = scan(r#""a\n\t\"b\\""#);
    assert_eq!(tokens[0].literal, Some(Literal::Str("a\n\t\"b\\".to_owned())));
}

#[test]
fn tokens_carry_positions() {
    let tokens = scan("a\n  bc");
    let bc = &tokens[2];
    assert_eq!(bc.line(), 2);
    assert_eq!(bc.span.start.column, 2);
    assert_eq!(bc.span.end.column, 4);
    assert_eq!(bc.span.text(), "bc");
}

#[test]
fn eof_carries_the_final_position() {
    let tokens = scan("ab");
    let eof = tokens.last().unwrap();
    assert_eq!(eof.token_type, TokenType::EOF);
    assert_eq!(eof.span.start.offset, 2);
}

#[test]
fn bang_needs_equal() {
    let err = scan_error("a ! b");
    assert_eq!(err.kind, LexErrorKind::ExpectedCharacter);
    assert_eq!(err.span.start.column, 2);
}

#[test]
fn illegal_character() {
    let err = scan_error("1 + #");
    assert_eq!(err.kind, LexErrorKind::IllegalCharacter);
    assert_eq!(err.detail, "'#'");
}

#[test]
fn unterminated_literals() {
    assert_eq!(scan_error("\"abc").kind, LexErrorKind::UnterminatedLiteral);
    assert_eq!(scan_error("\"abc\\").kind, LexErrorKind::UnterminatedLiteral);
    assert_eq!(scan_error("/* abc").kind, LexErrorKind::UnterminatedLiteral);
}
