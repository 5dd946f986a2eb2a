//! Lexer (tokenizer) for generator-language source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Block structure is significant whitespace: the lexer emits [`Token::Newline`]
//! at the end of every logical line and [`Token::Indent`] / [`Token::Dedent`]
//! when the leading whitespace grows or shrinks (see [`super::indent`]).

use super::ast::SourceLocation;
use super::indent::{IndentChange, IndentTracker};
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate line and column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    IntLiteral(i64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    StringLiteral(String, SourceLocation),

    // Identifiers
    Ident(String, SourceLocation),

    // Keywords
    Def(SourceLocation),
    If(SourceLocation),
    Elif(SourceLocation),
    Else(SourceLocation),
    While(SourceLocation),
    For(SourceLocation),
    In(SourceLocation),
    Try(SourceLocation),
    Except(SourceLocation),
    Finally(SourceLocation),
    Raise(SourceLocation),
    Return(SourceLocation),
    Yield(SourceLocation),
    From(SourceLocation),
    Pass(SourceLocation),
    Break(SourceLocation),
    Continue(SourceLocation),
    And(SourceLocation),
    Or(SourceLocation),
    Not(SourceLocation),
    Is(SourceLocation),
    As(SourceLocation),
    None(SourceLocation),
    True(SourceLocation),
    False(SourceLocation),

    // Arithmetic
    Plus(SourceLocation),       // +
    Minus(SourceLocation),      // -
    Star(SourceLocation),       // *
    StarStar(SourceLocation),   // **
    Slash(SourceLocation),      // /
    SlashSlash(SourceLocation), // //
    Percent(SourceLocation),    // %

    // Comparison
    EqEq(SourceLocation),  // ==
    NotEq(SourceLocation), // !=
    Lt(SourceLocation),    // <
    Le(SourceLocation),    // <=
    Gt(SourceLocation),    // >
    Ge(SourceLocation),    // >=

    // Assignment
    Eq(SourceLocation),           // =
    PlusEq(SourceLocation),       // +=
    MinusEq(SourceLocation),      // -=
    StarEq(SourceLocation),       // *=
    StarStarEq(SourceLocation),   // **=
    SlashEq(SourceLocation),      // /=
    SlashSlashEq(SourceLocation), // //=
    PercentEq(SourceLocation),    // %=

    // Punctuation
    Dot(SourceLocation),      // .
    Colon(SourceLocation),    // :
    Comma(SourceLocation),    // ,
    LParen(SourceLocation),   // (
    RParen(SourceLocation),   // )
    LBracket(SourceLocation), // [
    RBracket(SourceLocation), // ]

    // Layout
    Newline(SourceLocation),
    Indent(SourceLocation),
    Dedent(SourceLocation),

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::IntLiteral(_, loc)
            | Token::FloatLiteral(_, loc)
            | Token::StringLiteral(_, loc)
            | Token::Ident(_, loc)
            | Token::Def(loc)
            | Token::If(loc)
            | Token::Elif(loc)
            | Token::Else(loc)
            | Token::While(loc)
            | Token::For(loc)
            | Token::In(loc)
            | Token::Try(loc)
            | Token::Except(loc)
            | Token::Finally(loc)
            | Token::Raise(loc)
            | Token::Return(loc)
            | Token::Yield(loc)
            | Token::From(loc)
            | Token::Pass(loc)
            | Token::Break(loc)
            | Token::Continue(loc)
            | Token::And(loc)
            | Token::Or(loc)
            | Token::Not(loc)
            | Token::Is(loc)
            | Token::As(loc)
            | Token::None(loc)
            | Token::True(loc)
            | Token::False(loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::StarStar(loc)
            | Token::Slash(loc)
            | Token::SlashSlash(loc)
            | Token::Percent(loc)
            | Token::EqEq(loc)
            | Token::NotEq(loc)
            | Token::Lt(loc)
            | Token::Le(loc)
            | Token::Gt(loc)
            | Token::Ge(loc)
            | Token::Eq(loc)
            | Token::PlusEq(loc)
            | Token::MinusEq(loc)
            | Token::StarEq(loc)
            | Token::StarStarEq(loc)
            | Token::SlashEq(loc)
            | Token::SlashSlashEq(loc)
            | Token::PercentEq(loc)
            | Token::Dot(loc)
            | Token::Colon(loc)
            | Token::Comma(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Newline(loc)
            | Token::Indent(loc)
            | Token::Dedent(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IntLiteral(n, _) => write!(f, "int literal {}", n),
            Token::FloatLiteral(n, _) => write!(f, "float literal {}", n),
            Token::StringLiteral(s, _) => write!(f, "string literal {:?}", s),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Def(_) => write!(f, "'def'"),
            Token::If(_) => write!(f, "'if'"),
            Token::Elif(_) => write!(f, "'elif'"),
            Token::Else(_) => write!(f, "'else'"),
            Token::While(_) => write!(f, "'while'"),
            Token::For(_) => write!(f, "'for'"),
            Token::In(_) => write!(f, "'in'"),
            Token::Try(_) => write!(f, "'try'"),
            Token::Except(_) => write!(f, "'except'"),
            Token::Finally(_) => write!(f, "'finally'"),
            Token::Raise(_) => write!(f, "'raise'"),
            Token::Return(_) => write!(f, "'return'"),
            Token::Yield(_) => write!(f, "'yield'"),
            Token::From(_) => write!(f, "'from'"),
            Token::Pass(_) => write!(f, "'pass'"),
            Token::Break(_) => write!(f, "'break'"),
            Token::Continue(_) => write!(f, "'continue'"),
            Token::And(_) => write!(f, "'and'"),
            Token::Or(_) => write!(f, "'or'"),
            Token::Not(_) => write!(f, "'not'"),
            Token::Is(_) => write!(f, "'is'"),
            Token::As(_) => write!(f, "'as'"),
            Token::None(_) => write!(f, "'None'"),
            Token::True(_) => write!(f, "'True'"),
            Token::False(_) => write!(f, "'False'"),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::StarStar(_) => write!(f, "'**'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::SlashSlash(_) => write!(f, "'//'"),
            Token::Percent(_) => write!(f, "'%'"),
            Token::EqEq(_) => write!(f, "'=='"),
            Token::NotEq(_) => write!(f, "'!='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::Eq(_) => write!(f, "'='"),
            Token::PlusEq(_) => write!(f, "'+='"),
            Token::MinusEq(_) => write!(f, "'-='"),
            Token::StarEq(_) => write!(f, "'*='"),
            Token::StarStarEq(_) => write!(f, "'**='"),
            Token::SlashEq(_) => write!(f, "'/='"),
            Token::SlashSlashEq(_) => write!(f, "'//='"),
            Token::PercentEq(_) => write!(f, "'%='"),
            Token::Dot(_) => write!(f, "'.'"),
            Token::Colon(_) => write!(f, "':'"),
            Token::Comma(_) => write!(f, "','"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::Newline(_) => write!(f, "end of line"),
            Token::Indent(_) => write!(f, "indent"),
            Token::Dedent(_) => write!(f, "dedent"),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Lexer error type
#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Lexer for generator-language source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    indent: IndentTracker,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            indent: IndentTracker::new(),
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            if self.indent.tracking() && !self.indent.line_has_content() {
                if !self.start_logical_line(&mut tokens)? {
                    continue;
                }
            }

            self.skip_inline_whitespace_and_comments()?;

            match self.peek() {
                None => {
                    let loc = self.current_location();
                    if self.indent.line_has_content() {
                        tokens.push(Token::Newline(loc));
                    }
                    for _ in 0..self.indent.close_all() {
                        tokens.push(Token::Dedent(loc));
                    }
                    tokens.push(Token::Eof(loc));
                    break;
                }
                Some('\n') => {
                    let loc = self.current_location();
                    self.advance();
                    if self.indent.tracking() {
                        if self.indent.line_has_content() {
                            tokens.push(Token::Newline(loc));
                        }
                        self.indent.end_line();
                    }
                }
                Some(_) => {
                    let token = self.next_token()?;
                    self.indent.mark_content();
                    tokens.push(token);
                }
            }
        }

        Ok(tokens)
    }

    /// Measure the indentation of a fresh line and emit layout tokens.
    ///
    /// Returns `false` when the line was blank or comment-only and has been
    /// consumed entirely.
    fn start_logical_line(
        &mut self,
        tokens: &mut Vec<Token>,
    ) -> Result<bool, LexError> {
        let start = self.position;
        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\x0c')) {
            self.advance();
        }
        let width = IndentTracker::measure(&self.input[start..self.position]);

        match self.peek() {
            None => return Ok(true),
            Some('\n') | Some('#') | Some('\r') => {
                self.skip_to_line_end();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                return Ok(false);
            }
            Some(_) => {}
        }

        let loc = self.current_location();
        let change = self.indent.change_to(width).map_err(|msg| LexError {
            message: msg.to_string(),
            location: loc,
        })?;
        match change {
            IndentChange::Same => {}
            IndentChange::Indent => tokens.push(Token::Indent(loc)),
            IndentChange::Dedent(count) => {
                for _ in 0..count {
                    tokens.push(Token::Dedent(loc));
                }
            }
        }
        self.indent.mark_content();
        Ok(true)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        match ch {
            '"' | '\'' => self.string_literal(ch, loc),
            '0'..='9' => self.number_literal(ch, loc),
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.identifier_or_keyword(ch, loc)),

            '+' => Ok(self.with_eq(loc, Token::Plus, Token::PlusEq)),
            '-' => Ok(self.with_eq(loc, Token::Minus, Token::MinusEq)),
            '%' => Ok(self.with_eq(loc, Token::Percent, Token::PercentEq)),
            '*' => {
                if self.peek() == Some('*') {
                    self.advance();
                    Ok(self.with_eq(loc, Token::StarStar, Token::StarStarEq))
                } else {
                    Ok(self.with_eq(loc, Token::Star, Token::StarEq))
                }
            }
            '/' => {
                if self.peek() == Some('/') {
                    self.advance();
                    Ok(self.with_eq(loc, Token::SlashSlash, Token::SlashSlashEq))
                } else {
                    Ok(self.with_eq(loc, Token::Slash, Token::SlashEq))
                }
            }
            '=' => Ok(self.with_eq(loc, Token::Eq, Token::EqEq)),
            '<' => Ok(self.with_eq(loc, Token::Lt, Token::Le)),
            '>' => Ok(self.with_eq(loc, Token::Gt, Token::Ge)),
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::NotEq(loc))
                } else {
                    Err(LexError {
                        message: "Unexpected character: '!'".to_string(),
                        location: loc,
                    })
                }
            }
            '.' => Ok(Token::Dot(loc)),
            ':' => Ok(Token::Colon(loc)),
            ',' => Ok(Token::Comma(loc)),
            '(' => {
                self.indent.open_bracket();
                Ok(Token::LParen(loc))
            }
            ')' => {
                self.indent.close_bracket();
                Ok(Token::RParen(loc))
            }
            '[' => {
                self.indent.open_bracket();
                Ok(Token::LBracket(loc))
            }
            ']' => {
                self.indent.close_bracket();
                Ok(Token::RBracket(loc))
            }

            _ => Err(LexError {
                message: format!("Unexpected character: '{}'", ch),
                location: loc,
            }),
        }
    }

    /// Pick the `=`-suffixed form of an operator when the next char is `=`
    fn with_eq(
        &mut self,
        loc: SourceLocation,
        plain: fn(SourceLocation) -> Token,
        eq: fn(SourceLocation) -> Token,
    ) -> Token {
        if self.peek() == Some('=') {
            self.advance();
            eq(loc)
        } else {
            plain(loc)
        }
    }

    /// Parse string literal (single or double quoted)
    fn string_literal(
        &mut self,
        quote: char,
        loc: SourceLocation,
    ) -> Result<Token, LexError> {
        let mut string = String::new();

        while let Some(ch) = self.peek() {
            if ch == quote {
                self.advance(); // consume closing quote
                return Ok(Token::StringLiteral(string, loc));
            }
            if ch == '\n' {
                break;
            }

            if ch == '\\' {
                self.advance();
                let escaped = self.advance().ok_or_else(|| LexError {
                    message: "Unexpected end of file in string literal"
                        .to_string(),
                    location: self.current_location(),
                })?;

                let unescaped = match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    '0' => '\0',
                    _ => {
                        return Err(LexError {
                            message: format!(
                                "Unknown escape sequence: \\{}",
                                escaped
                            ),
                            location: self.current_location(),
                        });
                    }
                };
                string.push(unescaped);
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(LexError {
            message: "Unterminated string literal".to_string(),
            location: loc,
        })
    }

    /// Parse numeric literal (integer or decimal float)
    fn number_literal(
        &mut self,
        first_digit: char,
        loc: SourceLocation,
    ) -> Result<Token, LexError> {
        let mut num_str = String::new();
        num_str.push(first_digit);
        let mut is_float = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else if ch == '_' {
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_ahead(1).map_or(true, |c| c.is_ascii_digit())
            {
                is_float = true;
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if is_float {
            let value = num_str.parse::<f64>().map_err(|_| LexError {
                message: format!("Invalid float literal: {}", num_str),
                location: loc,
            })?;
            return Ok(Token::FloatLiteral(value, loc));
        }

        let value = num_str.parse::<i64>().map_err(|_| LexError {
            message: format!("Invalid integer literal: {}", num_str),
            location: loc,
        })?;

        Ok(Token::IntLiteral(value, loc))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "def" => Token::Def(loc),
            "if" => Token::If(loc),
            "elif" => Token::Elif(loc),
            "else" => Token::Else(loc),
            "while" => Token::While(loc),
            "for" => Token::For(loc),
            "in" => Token::In(loc),
            "try" => Token::Try(loc),
            "except" => Token::Except(loc),
            "finally" => Token::Finally(loc),
            "raise" => Token::Raise(loc),
            "return" => Token::Return(loc),
            "yield" => Token::Yield(loc),
            "from" => Token::From(loc),
            "pass" => Token::Pass(loc),
            "break" => Token::Break(loc),
            "continue" => Token::Continue(loc),
            "and" => Token::And(loc),
            "or" => Token::Or(loc),
            "not" => Token::Not(loc),
            "is" => Token::Is(loc),
            "as" => Token::As(loc),
            "None" => Token::None(loc),
            "True" => Token::True(loc),
            "False" => Token::False(loc),
            _ => Token::Ident(ident, loc),
        }
    }

    /// Skip spaces, comments and backslash line continuations
    fn skip_inline_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\x0c') => {
                    self.advance();
                }
                Some('\n') if !self.indent.tracking() => {
                    self.advance();
                }
                Some('#') => self.skip_to_line_end(),
                Some('\\') => {
                    let loc = self.current_location();
                    self.advance();
                    if self.peek() == Some('\r') {
                        self.advance();
                    }
                    if self.advance() != Some('\n') {
                        return Err(LexError {
                            message: "Unexpected character after line continuation"
                                .to_string(),
                            location: loc,
                        });
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip to (but not past) the end of the current line
    fn skip_to_line_end(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().unwrap()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = lex("x = 1 + 2.5\n");

        assert!(matches!(tokens[0], Token::Ident(ref s, _) if s == "x"));
        assert!(matches!(tokens[1], Token::Eq(_)));
        assert!(matches!(tokens[2], Token::IntLiteral(1, _)));
        assert!(matches!(tokens[3], Token::Plus(_)));
        assert!(matches!(tokens[4], Token::FloatLiteral(f, _) if f == 2.5));
        assert!(matches!(tokens[5], Token::Newline(_)));
        assert!(matches!(tokens[6], Token::Eof(_)));
    }

    #[test]
    fn test_operators() {
        let tokens = lex("** **= // //= += <= != ==");

        assert!(matches!(tokens[0], Token::StarStar(_)));
        assert!(matches!(tokens[1], Token::StarStarEq(_)));
        assert!(matches!(tokens[2], Token::SlashSlash(_)));
        assert!(matches!(tokens[3], Token::SlashSlashEq(_)));
        assert!(matches!(tokens[4], Token::PlusEq(_)));
        assert!(matches!(tokens[5], Token::Le(_)));
        assert!(matches!(tokens[6], Token::NotEq(_)));
        assert!(matches!(tokens[7], Token::EqEq(_)));
    }

    #[test]
    fn test_indent_and_dedent() {
        let tokens = lex("def f():\n    yield 1\n\n    # note\nx = 2\n");

        let kinds: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            kinds,
            vec![
                "'def'",
                "identifier 'f'",
                "'('",
                "')'",
                "':'",
                "end of line",
                "indent",
                "'yield'",
                "int literal 1",
                "end of line",
                "dedent",
                "identifier 'x'",
                "'='",
                "int literal 2",
                "end of line",
                "end of file",
            ]
        );
    }

    #[test]
    fn test_brackets_join_lines() {
        let tokens = lex("print(1,\n      2)\n");

        assert!(!tokens[..tokens.len() - 2]
            .iter()
            .any(|t| matches!(t, Token::Newline(_) | Token::Indent(_))));
    }

    #[test]
    fn test_eof_closes_blocks() {
        let tokens = lex("while True:\n    pass");
        let n = tokens.len();

        assert!(matches!(tokens[n - 3], Token::Newline(_)));
        assert!(matches!(tokens[n - 2], Token::Dedent(_)));
        assert!(matches!(tokens[n - 1], Token::Eof(_)));
    }

    #[test]
    fn test_string_literal() {
        let tokens = lex(r#"'fizz' "a\nb""#);

        assert!(matches!(tokens[0], Token::StringLiteral(ref s, _) if s == "fizz"));
        assert!(matches!(tokens[1], Token::StringLiteral(ref s, _) if s == "a\nb"));
    }

    #[test]
    fn test_inconsistent_dedent_is_error() {
        let err = Lexer::new("if x:\n    a = 1\n  b = 2\n")
            .tokenize()
            .unwrap_err();
        assert_eq!(err.location.line, 3);
    }
}
