use crate::prelude::*;

#[derive(Debug)]
pub struct Scanner {
    source_chars: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    start_position: Position,
    position: Position,
}

impl Scanner {
    pub fn new(source: &str, file: &str) -> Self {
        let position = Position::start(source, file);
        Self {
            source_chars: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            start_position: position.clone(),
            position,
        }
    }

    /// Scan the whole source. The first illegal character aborts the scan.
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, LexError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_position = self.position.clone();
            self.scan_token()?;
        }

        self.start = self.current;
        self.start_position = self.position.clone();
        self.add_token(TokenType::EOF);

        // Take our temporary tokens out. It will be replaced by the default()
        // value for the vector
        Ok(std::mem::take(&mut self.tokens))
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source_chars.len()
    }

    fn scan_token(&mut self) -> Result<(), LexError> {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '[' => self.add_token(TokenType::LeftBracket),
            ']' => self.add_token(TokenType::RightBracket),
            ',' => self.add_token(TokenType::Comma),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            '*' => self.add_token(TokenType::Star),
            '%' => self.add_token(TokenType::Percent),
            ';' | '\n' => self.add_token(TokenType::Newline),
            '.' => {
                if self.peek().is_ascii_digit() {
                    self.number()?;
                } else {
                    self.add_token(TokenType::Dot);
                }
            }
            '!' => {
                if self.match_next('=') {
                    self.add_token(TokenType::BangEqual);
                } else {
                    return Err(self.error(LexErrorKind::ExpectedCharacter, "'=' (after '!')"));
                }
            }
            '=' => {
                let token_type = if self.match_next('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }
            '<' => {
                let token_type = if self.match_next('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }
            '>' => {
                let token_type = if self.match_next('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }
            '/' => {
                if self.match_next('*') {
                    self.block_comment()?;
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '"' => self.string()?,
            '0'..='9' => self.number()?,
            c if is_identifier_start(c) => self.identifier(),
            c => return Err(self.error(LexErrorKind::IllegalCharacter, &format!("'{c}'"))),
        }

        Ok(())
    }

    fn error(&self, kind: LexErrorKind, detail: &str) -> LexError {
        LexError {
            kind,
            detail: detail.to_owned(),
            span: Span::new(self.start_position.clone(), self.position.clone()),
        }
    }

    fn advance(&mut self) -> char {
        let c = self.source_chars.get(self.current).copied().unwrap_or('\0');
        self.current += 1;
        self.position.advance(c);
        c
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_token_with_literal(token_type, None);
    }

    fn source_substring(&self, start: usize, end: usize) -> String {
        self.source_chars.get(start..end).map(|s| s.iter().collect()).unwrap_or_default()
    }

    fn add_token_with_literal(&mut self, token_type: TokenType, literal: Option<Literal>) {
        let text = self.source_substring(self.start, self.current);
        let span = Span::new(self.start_position.clone(), self.position.clone());
        self.tokens.push(Token::new(token_type, &text, literal, span));
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == expected && !self.is_at_end() {
            self.advance();
            return true;
        }

        false
    }

    fn peek(&self) -> char {
        self.source_chars.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source_chars.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn block_comment(&mut self) -> Result<(), LexError> {
        while !self.is_at_end() {
            if self.advance() == '*' && self.match_next('/') {
                return Ok(());
            }
        }

        Err(self.error(LexErrorKind::UnterminatedLiteral, "unterminated comment"))
    }

    fn string(&mut self) -> Result<(), LexError> {
        let mut value = String::new();

        loop {
            if self.is_at_end() {
                return Err(self.error(LexErrorKind::UnterminatedLiteral, "unterminated string"));
            }

            match self.advance() {
                '"' => break,
                '\\' => {
                    if self.is_at_end() {
                        return Err(
                            self.error(LexErrorKind::UnterminatedLiteral, "unterminated string")
                        );
                    }
                    let escaped = match self.advance() {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    };
                    value.push(escaped);
                }
                c => value.push(c),
            }
        }

        self.add_token_with_literal(TokenType::StringLiteral, Some(Literal::Str(value)));
        Ok(())
    }

    /// Digits with at most one '.', then an optional `L`/`l` suffix.
    ///
    /// A '.' directly followed by an identifier is left alone so that
    /// `ns.field` style access after a number still scans as a dot.
    fn number(&mut self) -> Result<(), LexError> {
        let mut seen_dot = self.source_chars.get(self.start) == Some(&'.');

        loop {
            let c = self.peek();
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.'
                && !seen_dot
                && (!is_identifier_start(self.peek_next()) || matches!(self.peek_next(), 'L' | 'l'))
            {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let digits = self.source_substring(self.start, self.current);
        let long = matches!(self.peek(), 'L' | 'l');
        if long {
            self.advance();
        }

        let number = if seen_dot {
            let mut text = digits;
            if text.starts_with('.') {
                text.insert(0, '0');
            }
            if text.ends_with('.') {
                text.push('0');
            }
            let value = text.parse::<f64>().map_err(|_| {
                self.error(LexErrorKind::IllegalCharacter, &format!("malformed number '{text}'"))
            })?;
            Number::Double(value)
        } else {
            Number::from_digits(&digits, long)
        };

        let token_type = match number {
            Number::Int(_) => TokenType::Int,
            Number::Long(_) => TokenType::Long,
            Number::Double(_) => TokenType::Double,
        };
        self.add_token_with_literal(token_type, Some(Literal::Number(number)));
        Ok(())
    }

    fn identifier(&mut self) {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let text = self.source_substring(self.start, self.current);
        let token_type = get_keyword(&text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_alpha_numeric(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn get_keyword(text: &str) -> Option<TokenType> {
    match text {
        "and" => Some(TokenType::And),
        "break" => Some(TokenType::Break),
        "continue" => Some(TokenType::Continue),
        "elif" => Some(TokenType::Elif),
        "else" => Some(TokenType::Else),
        "if" => Some(TokenType::If),
        "namespace" => Some(TokenType::Namespace),
        "not" => Some(TokenType::Not),
        "or" => Some(TokenType::Or),
        "return" => Some(TokenType::Return),
        "while" => Some(TokenType::While),
        _ => None,
    }
}
