use std::rc::Rc;

use crate::prelude::*;
use crate::stack::ensure_sufficient_stack;

type ParseResult = Result<Node, SyntaxError>;

/// Recursive descent parser. Statement forms that start with a type name
/// (`int a = 1`, `int f(int x) = x`) are told apart from plain expressions
/// by looking at most three tokens ahead; the parser never rewinds.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::EOF) {
            let span = match tokens.last() {
                Some(token) => Span::new(token.span.end.clone(), token.span.end.clone()),
                None => {
                    let position = Position::start("", "<input>");
                    Span::new(position.clone(), position)
                }
            };
            tokens.push(Token::new(TokenType::EOF, "", None, span));
        }

        Self { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> ParseResult {
        let program = self.statements(TokenType::EOF)?;
        tracing::debug!(statements = block_len(&program), "parsed program");
        Ok(program)
    }

    /// Statements separated by newlines or ';', up to (not including) `end`.
    fn statements(&mut self, end: TokenType) -> ParseResult {
        let start = self.peek().span.clone();
        let mut statements = vec![];

        self.skip_separators();
        while !self.check(end) && !self.is_at_end() {
            statements.push(self.statement()?);

            // A missing closer is reported by whoever expects it.
            if !self.check(end) && !self.is_at_end() && !self.match_tt(&[TokenType::Newline]) {
                return Err(self.error(self.peek(), "expected newline or ';'"));
            }
            self.skip_separators();
        }

        let span = match statements.last() {
            Some(last) => start.to(&last.span),
            None => start,
        };
        Ok(Node::new(NodeKind::Block(statements), span))
    }

    fn statement(&mut self) -> ParseResult {
        let keyword = self.peek().clone();

        match keyword.token_type {
            TokenType::Return => {
                self.advance();
                if self.ends_statement() {
                    return Ok(Node::new(NodeKind::Return(None), keyword.span));
                }
                let value = self.expression()?;
                let span = keyword.span.to(&value.span);
                Ok(Node::new(NodeKind::Return(Some(value.boxed())), span))
            }
            TokenType::Break => {
                self.advance();
                Ok(Node::new(NodeKind::Break, keyword.span))
            }
            TokenType::Continue => {
                self.advance();
                Ok(Node::new(NodeKind::Continue, keyword.span))
            }
            _ => self.expression(),
        }
    }

    fn ends_statement(&self) -> bool {
        matches!(
            self.peek().token_type,
            TokenType::Newline | TokenType::RightBrace | TokenType::EOF
        )
    }

    /// Every nested construct (parentheses, arguments, blocks) comes back
    /// through here, so this is where the stack is grown.
    fn expression(&mut self) -> ParseResult {
        ensure_sufficient_stack(|| {
            if self.check(TokenType::Identifier)
                && self.peek_at(1).token_type == TokenType::Identifier
            {
                return match self.peek_at(2).token_type {
                    TokenType::LeftParen => self.function_definition(),
                    TokenType::Equal => self.declaration(),
                    _ => Err(self.error(self.peek_at(2), "expected '=' or '('")),
                };
            }

            self.assignment()
        })
    }

    fn declaration(&mut self) -> ParseResult {
        let type_token = self.advance();
        let name = self.advance();
        self.consume(TokenType::Equal, "expected '='")?;

        let value = self.expression()?;
        let span = type_token.span.to(&value.span);
        Ok(Node::new(
            NodeKind::Declare { type_name: type_token.lexeme, name: name.lexeme, value: value.boxed() },
            span,
        ))
    }

    fn function_definition(&mut self) -> ParseResult {
        let return_type = self.advance();
        let name = self.advance();
        self.consume(TokenType::LeftParen, "expected '('")?;

        let mut params = vec![];
        if !self.check(TokenType::RightParen) {
            loop {
                let type_token = self.consume(TokenType::Identifier, "expected parameter type")?;
                let param_name = self.consume(TokenType::Identifier, "expected parameter name")?;
                params.push(Param {
                    type_name: type_token.lexeme,
                    name: param_name.lexeme,
                    span: type_token.span.to(&param_name.span),
                });

                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "expected ',' or ')'")?;

        let (body, auto_return) = if self.check(TokenType::LeftBrace) {
            (self.block()?, false)
        } else if self.match_tt(&[TokenType::Equal]) {
            self.skip_separators();
            (self.expression()?, true)
        } else {
            return Err(self.error(self.peek(), "expected '{' or '='"));
        };

        let span = return_type.span.to(&body.span);
        Ok(Node::new(
            NodeKind::FunctionDef {
                name: name.lexeme,
                params,
                return_type: return_type.lexeme,
                body: Rc::new(body),
                auto_return,
            },
            span,
        ))
    }

    fn assignment(&mut self) -> ParseResult {
        let target = self.or_expr()?;

        if self.match_tt(&[TokenType::Equal]) {
            if !target.is_assignable() {
                return Err(SyntaxError::new("invalid assignment target", target.span.clone()));
            }

            // Right associative: `a = b = c` is `a = (b = c)`.
            let value = self.expression()?;
            let span = target.span.to(&value.span);
            return Ok(Node::new(
                NodeKind::Assign { target: target.boxed(), value: value.boxed() },
                span,
            ));
        }

        Ok(target)
    }

    fn or_expr(&mut self) -> ParseResult {
        let mut expr = self.comparison()?;

        while self.match_tt(&[TokenType::And, TokenType::Or]) {
            let operator = self.binary_operator();
            let right = self.comparison()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult {
        if self.match_tt(&[TokenType::Not]) {
            let keyword = self.previous().clone();
            let operand = ensure_sufficient_stack(|| self.comparison())?;
            let span = keyword.span.to(&operand.span);
            return Ok(Node::new(
                NodeKind::Unary { operator: UnaryOperator::Not, operand: operand.boxed() },
                span,
            ));
        }

        let mut expr = self.arith()?;

        while self.match_tt(&[
            TokenType::EqualEqual,
            TokenType::BangEqual,
            TokenType::Less,
            TokenType::LessEqual,
            TokenType::Greater,
            TokenType::GreaterEqual,
        ]) {
            let operator = self.binary_operator();
            let right = self.arith()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn arith(&mut self) -> ParseResult {
        let mut expr = self.term()?;

        while self.match_tt(&[TokenType::Plus, TokenType::Minus]) {
            let operator = self.binary_operator();
            let right = self.term()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> ParseResult {
        let mut expr = self.unary()?;

        while self.match_tt(&[TokenType::Star, TokenType::Slash, TokenType::Percent]) {
            let operator = self.binary_operator();
            let right = self.unary()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult {
        if self.match_tt(&[TokenType::Minus, TokenType::Plus]) {
            let token = self.previous().clone();
            let operator = if token.token_type == TokenType::Minus {
                UnaryOperator::Negate
            } else {
                UnaryOperator::Plus
            };
            let operand = ensure_sufficient_stack(|| self.unary())?;
            let span = token.span.to(&operand.span);
            return Ok(Node::new(NodeKind::Unary { operator, operand: operand.boxed() }, span));
        }

        self.postfix()
    }

    /// Any chain of `.name`, `[index]` and `(arguments)` after a primary.
    fn postfix(&mut self) -> ParseResult {
        let mut expr = self.primary()?;

        loop {
            if self.match_tt(&[TokenType::Dot]) {
                let name = self.consume(TokenType::Identifier, "expected identifier after '.'")?;
                let span = expr.span.to(&name.span);
                expr = Node::new(
                    NodeKind::KeyAccess { object: expr.boxed(), key: Key::Name(name.lexeme) },
                    span,
                );
            } else if self.match_tt(&[TokenType::LeftBracket]) {
                self.skip_separators();
                let index = self.expression()?;
                self.skip_separators();
                let close = self.consume(TokenType::RightBracket, "expected ']'")?;
                let span = expr.span.to(&close.span);
                expr = Node::new(
                    NodeKind::KeyAccess { object: expr.boxed(), key: Key::Index(index.boxed()) },
                    span,
                );
            } else if self.match_tt(&[TokenType::LeftParen]) {
                let (arguments, close) = self.items(TokenType::RightParen, "expected ',' or ')'")?;
                let span = expr.span.to(&close.span);
                expr = Node::new(NodeKind::Call { callee: expr.boxed(), arguments }, span);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Comma separated expressions up to `close`. Newlines are allowed
    /// anywhere between the items.
    fn items(&mut self, close: TokenType, message: &str) -> Result<(Vec<Node>, Token), SyntaxError> {
        let mut items = vec![];

        self.skip_separators();
        if !self.check(close) {
            loop {
                items.push(self.expression()?);
                self.skip_separators();
                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
                self.skip_separators();
            }
        }

        let close = self.consume(close, message)?;
        Ok((items, close))
    }

    fn primary(&mut self) -> ParseResult {
        let token = self.peek().clone();

        match token.token_type {
            TokenType::Int | TokenType::Long | TokenType::Double => {
                self.advance();
                match token.literal {
                    Some(Literal::Number(n)) => Ok(Node::new(NodeKind::Number(n), token.span)),
                    _ => Err(self.error(&token, "expected a number literal")),
                }
            }
            TokenType::StringLiteral => {
                self.advance();
                match token.literal {
                    Some(Literal::Str(ref s)) => {
                        Ok(Node::new(NodeKind::Str(s.as_str().into()), token.span))
                    }
                    _ => Err(self.error(&token, "expected a string literal")),
                }
            }
            TokenType::Identifier => {
                self.advance();
                Ok(Node::new(NodeKind::Identifier(token.lexeme), token.span))
            }
            TokenType::LeftParen => {
                self.advance();
                self.skip_separators();
                let mut expr = self.expression()?;
                self.skip_separators();
                let close = self.consume(TokenType::RightParen, "expected ')'")?;
                expr.span = token.span.to(&close.span);
                Ok(expr)
            }
            TokenType::LeftBrace => {
                self.advance();
                let (items, close) = self.items(TokenType::RightBrace, "expected ',' or '}'")?;
                Ok(Node::new(NodeKind::List(items), token.span.to(&close.span)))
            }
            TokenType::If => self.if_expression(),
            TokenType::While => self.while_expression(),
            TokenType::Namespace => self.namespace_expression(),
            _ => Err(self.error(&token, "expected expression")),
        }
    }

    fn if_expression(&mut self) -> ParseResult {
        let keyword = self.advance();
        let mut cases = vec![];

        let condition = self.expression()?;
        let body = self.block()?;
        let mut end = body.span.clone();
        cases.push((condition, body));

        while self.check_past_separators(TokenType::Elif) {
            self.skip_separators();
            self.advance();
            let condition = self.expression()?;
            let body = self.block()?;
            end = body.span.clone();
            cases.push((condition, body));
        }

        let else_body = if self.check_past_separators(TokenType::Else) {
            self.skip_separators();
            self.advance();
            let body = if self.check(TokenType::LeftBrace) { self.block()? } else { self.statement()? };
            end = body.span.clone();
            Some(body.boxed())
        } else {
            None
        };

        Ok(Node::new(NodeKind::If { cases, else_body }, keyword.span.to(&end)))
    }

    fn while_expression(&mut self) -> ParseResult {
        let keyword = self.advance();
        let condition = self.expression()?;
        let body = self.block()?;

        let span = keyword.span.to(&body.span);
        Ok(Node::new(NodeKind::While { condition: condition.boxed(), body: body.boxed() }, span))
    }

    fn namespace_expression(&mut self) -> ParseResult {
        let keyword = self.advance();
        let name = self.consume(TokenType::Identifier, "expected namespace name")?;
        let body = self.block()?;

        let span = keyword.span.to(&body.span);
        Ok(Node::new(NodeKind::Namespace { name: name.lexeme, body: body.boxed() }, span))
    }

    /// `{ statements }`
    fn block(&mut self) -> ParseResult {
        let open = self.consume(TokenType::LeftBrace, "expected '{'")?;
        let mut body = self.statements(TokenType::RightBrace)?;
        let close = self.consume(TokenType::RightBrace, "expected '}'")?;

        body.span = open.span.to(&close.span);
        Ok(body)
    }

    fn binary_operator(&self) -> BinaryOperator {
        // Callers only get here after matching one of the operator tokens.
        BinaryOperator::from_token(self.previous().token_type).unwrap_or(BinaryOperator::Add)
    }

    fn error(&self, token: &Token, message: &str) -> SyntaxError {
        SyntaxError::new(message, token.span.clone())
    }

    /// Return the next token if its `token_type` matches the given type as input.
    /// Otherwise, fail with `message` pointing at the offending token.
    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<Token, SyntaxError> {
        if self.check(token_type) {
            return Ok(self.advance());
        }

        Err(self.error(self.peek(), message))
    }

    fn match_tt(&mut self, types: &[TokenType]) -> bool {
        for tt in types {
            if self.check(*tt) {
                self.advance();
                return true;
            }
        }

        false
    }

    fn skip_separators(&mut self) {
        while self.check(TokenType::Newline) {
            self.advance();
        }
    }

    /// Whether `token_type` is next once any separators are skipped.
    fn check_past_separators(&self, token_type: TokenType) -> bool {
        let mut offset = 0;
        while self.peek_at(offset).token_type == TokenType::Newline {
            offset += 1;
        }
        self.peek_at(offset).token_type == token_type
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    /// Look `offset` tokens ahead; past the end this is the EOF token.
    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.current + offset).min(last)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
}

fn binary(left: Node, operator: BinaryOperator, right: Node) -> Node {
    let span = left.span.to(&right.span);
    Node::new(NodeKind::Binary { left: left.boxed(), operator, right: right.boxed() }, span)
}

fn block_len(node: &Node) -> usize {
    match node.kind {
        NodeKind::Block(ref statements) => statements.len(),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(source: &str) -> Result<Node, SyntaxError> {
        let tokens = Scanner::new(source, "<test>").scan_tokens().unwrap();
        Parser::new(tokens).parse()
    }

    fn sexpr(source: &str) -> String {
        AstPrinter::to_string(&parse(source).unwrap())
    }

    #[test]
    fn precedence() {
        assert_eq!(sexpr("1 + 2 * 3"), "(block (+ 1 (* 2 3)))");
        assert_eq!(sexpr("(1 + 2) * 3 % 4"), "(block (% (* (+ 1 2) 3) 4))");
        assert_eq!(sexpr("-a - -b"), "(block (- (- a) (- b)))");
        assert_eq!(sexpr("not a == b and c"), "(block (and (not (== a b)) c))");
        assert_eq!(sexpr("a or b and c"), "(block (and (or a b) c))");
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(sexpr("a = b = 3"), "(block (= a (= b 3)))");
        assert_eq!(sexpr("ns.x = 1"), "(block (= (. ns x) 1))");
        assert_eq!(sexpr("xs[0] = 1"), "(block (= ([] xs 0) 1))");
    }

    #[test]
    fn declarations_and_definitions() {
        assert_eq!(sexpr("int a = 2"), "(block (declare int a 2))");
        assert_eq!(sexpr("int sq(int x) = x * x"), "(block (fn int sq (int x) = (* x x)))");
        assert_eq!(
            sexpr("void f(int a, string b) {\n return\n}"),
            "(block (fn void f (int a) (string b) (block (return))))"
        );
    }

    #[test]
    fn postfix_chains() {
        assert_eq!(sexpr("make()(1)"), "(block (call (call make) 1))");
        assert_eq!(sexpr("a.b[2].c(x, y)"), "(block (call (. ([] (. a b) 2) c) x y))");
    }

    #[test]
    fn control_flow() {
        assert_eq!(
            sexpr("if a { 1 }\nelif b { 2 } else { 3 }"),
            "(block (if (a (block 1)) (b (block 2)) (else (block 3))))"
        );
        assert_eq!(sexpr("if a { 1 } else b = 2"), "(block (if (a (block 1)) (else (= b 2))))");
        assert_eq!(
            sexpr("while i < 3 { i = i + 1; break }"),
            "(block (while (< i 3) (block (= i (+ i 1)) break)))"
        );
        assert_eq!(sexpr("namespace A { int x = 1 }"), "(block (namespace A (block (declare int x 1))))");
    }

    #[test]
    fn lists_span_lines() {
        assert_eq!(sexpr("{\n1,\n2\n}"), "(block (list 1 2))");
        assert_eq!(sexpr("{}"), "(block (list))");
    }

    #[test]
    fn separators_and_empty_statements() {
        assert_eq!(sexpr("\n;a;;\n\nb;\n"), "(block a b)");
        assert_eq!(sexpr(""), "(block)");
    }

    #[test]
    fn missing_brace_is_reported_at_the_offending_token() {
        let err = parse("if a { 1").unwrap_err();
        assert_eq!(err.detail, "expected '}'");
        assert_eq!(err.span.start.column, 8);
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = parse("1 2").unwrap_err();
        assert_eq!(err.detail, "expected newline or ';'");
        assert_eq!(err.span.text(), "2");
    }

    #[test]
    fn two_identifiers_need_a_declaration_or_definition() {
        let err = parse("int a + 1").unwrap_err();
        assert_eq!(err.detail, "expected '=' or '('");
    }

    #[test]
    fn invalid_assignment_target() {
        let err = parse("1 + 2 = 3").unwrap_err();
        assert_eq!(err.detail, "invalid assignment target");
        assert_eq!(err.span.text(), "1 + 2");
    }

    #[test]
    fn deep_nesting_does_not_exhaust_the_stack() {
        let source = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert_eq!(sexpr(&source), "(block 1)");

        let source = format!("{}1", "-".repeat(20_000));
        assert!(parse(&source).is_ok());

        let source = format!("{}1", "not ".repeat(20_000));
        assert!(parse(&source).is_ok());
    }

    #[test]
    fn long_operator_chains_are_dropped_iteratively() {
        let source = vec!["1"; 200_000].join(" + ");
        let program = parse(&source).unwrap();
        assert_eq!(block_len(&program), 1);
        drop(program);
    }

    #[test]
    fn unexpected_token_in_expression() {
        let err = parse("a = )").unwrap_err();
        assert_eq!(err.detail, "expected expression");
    }
}
