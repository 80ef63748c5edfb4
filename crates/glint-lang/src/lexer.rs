use std::fmt;

use crate::ast::Qualifier;

/// Source location for error reporting. `start`/`end` are byte offsets,
/// `line`/`column` are 1-based and describe `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// The span running from the start of `self` to the end of `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            end: other.end.max(self.start),
            ..self
        }
    }

    /// An empty span at the start of `self`.
    pub fn empty_start(self) -> Span {
        Span { end: self.start, ..self }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` lies inside the span (the end is inclusive so a cursor
    /// placed right after a token still hits it).
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Token kinds in GLSL.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Struct,
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Discard,
    Precision,
    Qualifier(Qualifier),

    /// A built-in type keyword such as `float`, `vec3` or `sampler2D`.
    TypeName(String),

    // Literals
    Identifier(String),
    /// Signed integer literal, stored as its 32-bit pattern.
    IntLiteral(u32),
    UintLiteral(u32),
    FloatLiteral(f64),
    DoubleLiteral(f64),
    BoolLiteral(bool),

    // Punctuation
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Question,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Bang,
    Tilde,
    Shl,
    Shr,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    EqEq,
    NotEq,
    Amp,
    Caret,
    Pipe,
    AmpAmp,
    CaretCaret,
    PipePipe,
    Equals,
    PlusEquals,
    MinusEquals,
    StarEquals,
    SlashEquals,
    PercentEquals,
    ShlEquals,
    ShrEquals,
    AmpEquals,
    CaretEquals,
    PipeEquals,

    // Special
    /// A preprocessor line, without the leading `#`.
    Directive(String),
    /// Input the lexer could not classify; carries the reason.
    Error(String),
    Eof,
}

impl TokenKind {
    /// Tokens that carry no syntax for the parser.
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Directive(_))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Struct => write!(f, "struct"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::For => write!(f, "for"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Do => write!(f, "do"),
            TokenKind::Switch => write!(f, "switch"),
            TokenKind::Case => write!(f, "case"),
            TokenKind::Default => write!(f, "default"),
            TokenKind::Break => write!(f, "break"),
            TokenKind::Continue => write!(f, "continue"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::Discard => write!(f, "discard"),
            TokenKind::Precision => write!(f, "precision"),
            TokenKind::Qualifier(q) => write!(f, "{}", q),
            TokenKind::TypeName(s) => write!(f, "{}", s),
            TokenKind::Identifier(s) => write!(f, "{}", s),
            TokenKind::IntLiteral(n) => write!(f, "{}", *n as i32),
            TokenKind::UintLiteral(n) => write!(f, "{}u", n),
            TokenKind::FloatLiteral(n) => write!(f, "{:?}", n),
            TokenKind::DoubleLiteral(n) => write!(f, "{:?}lf", n),
            TokenKind::BoolLiteral(b) => write!(f, "{}", b),
            TokenKind::LeftBrace => write!(f, "{{"),
            TokenKind::RightBrace => write!(f, "}}"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::LeftBracket => write!(f, "["),
            TokenKind::RightBracket => write!(f, "]"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Question => write!(f, "?"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::PlusPlus => write!(f, "++"),
            TokenKind::MinusMinus => write!(f, "--"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Tilde => write!(f, "~"),
            TokenKind::Shl => write!(f, "<<"),
            TokenKind::Shr => write!(f, ">>"),
            TokenKind::Less => write!(f, "<"),
            TokenKind::Greater => write!(f, ">"),
            TokenKind::LessEq => write!(f, "<="),
            TokenKind::GreaterEq => write!(f, ">="),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Amp => write!(f, "&"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::AmpAmp => write!(f, "&&"),
            TokenKind::CaretCaret => write!(f, "^^"),
            TokenKind::PipePipe => write!(f, "||"),
            TokenKind::Equals => write!(f, "="),
            TokenKind::PlusEquals => write!(f, "+="),
            TokenKind::MinusEquals => write!(f, "-="),
            TokenKind::StarEquals => write!(f, "*="),
            TokenKind::SlashEquals => write!(f, "/="),
            TokenKind::PercentEquals => write!(f, "%="),
            TokenKind::ShlEquals => write!(f, "<<="),
            TokenKind::ShrEquals => write!(f, ">>="),
            TokenKind::AmpEquals => write!(f, "&="),
            TokenKind::CaretEquals => write!(f, "^="),
            TokenKind::PipeEquals => write!(f, "|="),
            TokenKind::Directive(d) => write!(f, "#{}", d),
            TokenKind::Error(_) => write!(f, "invalid token"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token with its kind, lexeme and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}

/// The GLSL lexer (tokenizer). Never fails: unrecognized input becomes
/// [`TokenKind::Error`] tokens.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire source into a Vec of tokens ending with `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skips whitespace and comments. Returns an error token for an
    /// unterminated block comment.
    fn skip_trivia(&mut self) -> Option<Token> {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_nth(1) == Some('/') => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_nth(1) == Some('*') => {
                    let (start, line, column) = (self.pos, self.line, self.column);
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(ch) = self.advance() {
                        if ch == '*' && self.eat('/') {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        let span = Span::new(start, self.pos, line, column);
                        return Some(Token::new(
                            TokenKind::Error("unterminated block comment".into()),
                            &self.source[start..self.pos],
                            span,
                        ));
                    }
                }
                _ => return None,
            }
        }
    }

    fn next_token(&mut self) -> Token {
        if let Some(error) = self.skip_trivia() {
            return error;
        }

        let start = self.pos;
        let line = self.line;
        let column = self.column;

        let ch = match self.peek() {
            Some(ch) => ch,
            None => {
                return Token::new(TokenKind::Eof, "", Span::new(start, start, line, column));
            }
        };

        let kind = match ch {
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            ':' => self.single(TokenKind::Colon),
            '?' => self.single(TokenKind::Question),
            '~' => self.single(TokenKind::Tilde),
            '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            '.' => self.single(TokenKind::Dot),
            '+' => {
                self.advance();
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusEquals
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                self.advance();
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusEquals
                } else {
                    TokenKind::Minus
                }
            }
            '*' => self.with_equals(TokenKind::Star, TokenKind::StarEquals),
            '/' => self.with_equals(TokenKind::Slash, TokenKind::SlashEquals),
            '%' => self.with_equals(TokenKind::Percent, TokenKind::PercentEquals),
            '!' => self.with_equals(TokenKind::Bang, TokenKind::NotEq),
            '=' => self.with_equals(TokenKind::Equals, TokenKind::EqEq),
            '<' => {
                self.advance();
                if self.eat('<') {
                    if self.eat('=') {
                        TokenKind::ShlEquals
                    } else {
                        TokenKind::Shl
                    }
                } else if self.eat('=') {
                    TokenKind::LessEq
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                self.advance();
                if self.eat('>') {
                    if self.eat('=') {
                        TokenKind::ShrEquals
                    } else {
                        TokenKind::Shr
                    }
                } else if self.eat('=') {
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }
            '&' => {
                self.advance();
                if self.eat('&') {
                    TokenKind::AmpAmp
                } else if self.eat('=') {
                    TokenKind::AmpEquals
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                self.advance();
                if self.eat('|') {
                    TokenKind::PipePipe
                } else if self.eat('=') {
                    TokenKind::PipeEquals
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => {
                self.advance();
                if self.eat('^') {
                    TokenKind::CaretCaret
                } else if self.eat('=') {
                    TokenKind::CaretEquals
                } else {
                    TokenKind::Caret
                }
            }
            '#' => {
                self.advance();
                self.read_directive()
            }
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let ident = self.read_while(|c| c.is_ascii_alphanumeric() || c == '_');
                keyword_or_identifier(ident)
            }
            other => {
                self.advance();
                TokenKind::Error(format!("unexpected character '{}'", other))
            }
        };

        let span = Span::new(start, self.pos, line, column);
        Token::new(kind, &self.source[start..self.pos], span)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn with_equals(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        self.advance();
        if self.eat('=') {
            with_eq
        } else {
            plain
        }
    }

    /// Reads the rest of a preprocessor line, honouring `\` continuations.
    fn read_directive(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            if ch == '\\' && matches!(self.peek_nth(1), Some('\n') | Some('\r')) {
                self.advance();
                self.eat('\r');
                self.eat('\n');
                text.push(' ');
                continue;
            }
            text.push(ch);
            self.advance();
        }
        TokenKind::Directive(text.trim().to_string())
    }

    fn read_number(&mut self) -> TokenKind {
        if self.peek() == Some('0') && matches!(self.peek_nth(1), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            let digits = self.read_while(|c| c.is_ascii_hexdigit());
            let unsigned = self.eat('u') || self.eat('U');
            if let Some(error) = self.reject_suffix() {
                return error;
            }
            if digits.is_empty() {
                return TokenKind::Error("hexadecimal literal has no digits".into());
            }
            return integer_kind(u64::from_str_radix(&digits, 16).ok(), unsigned);
        }

        let mut text = self.read_while(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            self.advance();
            text.push('.');
            text.push_str(&self.read_while(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = matches!(self.peek_nth(1), Some('+') | Some('-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if sign {
                    if let Some(s) = self.advance() {
                        text.push(s);
                    }
                }
                text.push_str(&self.read_while(|c| c.is_ascii_digit()));
            }
        }

        if is_float || matches!(self.peek(), Some('f') | Some('F') | Some('l') | Some('L')) {
            let double = if self.eat('f') || self.eat('F') {
                false
            } else if matches!(
                (self.peek(), self.peek_nth(1)),
                (Some('l'), Some('f')) | (Some('L'), Some('F'))
            ) {
                self.advance();
                self.advance();
                true
            } else {
                false
            };
            if let Some(error) = self.reject_suffix() {
                return error;
            }
            return match text.parse::<f64>() {
                Ok(value) if double => TokenKind::DoubleLiteral(value),
                Ok(value) => TokenKind::FloatLiteral(value),
                Err(_) => TokenKind::Error(format!("invalid floating-point literal '{}'", text)),
            };
        }

        let unsigned = self.eat('u') || self.eat('U');
        if let Some(error) = self.reject_suffix() {
            return error;
        }
        if text.len() > 1 && text.starts_with('0') {
            if text.chars().any(|c| c > '7') {
                return TokenKind::Error(format!("invalid octal literal '{}'", text));
            }
            return integer_kind(u64::from_str_radix(&text, 8).ok(), unsigned);
        }
        integer_kind(text.parse::<u64>().ok(), unsigned)
    }

    /// Consumes identifier characters glued to a numeric literal.
    fn reject_suffix(&mut self) -> Option<TokenKind> {
        if self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            let suffix = self.read_while(|c| c.is_ascii_alphanumeric() || c == '_');
            return Some(TokenKind::Error(format!(
                "invalid suffix '{}' on numeric literal",
                suffix
            )));
        }
        None
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut result = String::new();
        while let Some(ch) = self.peek() {
            if predicate(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }
}

fn integer_kind(value: Option<u64>, unsigned: bool) -> TokenKind {
    match value {
        Some(v) if v <= u32::MAX as u64 => {
            if unsigned {
                TokenKind::UintLiteral(v as u32)
            } else {
                TokenKind::IntLiteral(v as u32)
            }
        }
        _ => TokenKind::Error("integer literal is out of range".into()),
    }
}

fn keyword_or_identifier(ident: String) -> TokenKind {
    match ident.as_str() {
        "struct" => TokenKind::Struct,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "return" => TokenKind::Return,
        "discard" => TokenKind::Discard,
        "precision" => TokenKind::Precision,
        "true" => TokenKind::BoolLiteral(true),
        "false" => TokenKind::BoolLiteral(false),
        _ => {
            if let Some(q) = Qualifier::from_keyword(&ident) {
                TokenKind::Qualifier(q)
            } else if crate::types::is_builtin_type_name(&ident) {
                TokenKind::TypeName(ident)
            } else {
                TokenKind::Identifier(ident)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        lexer.tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_qualifiers() {
        let tokens = tokenize("struct if return uniform const");
        assert_eq!(tokens[0], TokenKind::Struct);
        assert_eq!(tokens[1], TokenKind::If);
        assert_eq!(tokens[2], TokenKind::Return);
        assert_eq!(tokens[3], TokenKind::Qualifier(Qualifier::Uniform));
        assert_eq!(tokens[4], TokenKind::Qualifier(Qualifier::Const));
    }

    #[test]
    fn test_type_names() {
        let tokens = tokenize("vec3 dmat2x3 sampler2DShadow myType");
        assert_eq!(tokens[0], TokenKind::TypeName("vec3".into()));
        assert_eq!(tokens[1], TokenKind::TypeName("dmat2x3".into()));
        assert_eq!(tokens[2], TokenKind::TypeName("sampler2DShadow".into()));
        assert_eq!(tokens[3], TokenKind::Identifier("myType".into()));
    }

    #[test]
    fn test_number_literals() {
        let tokens = tokenize("42 7u 0x1F 017 3.14 2.0f 1.5lf .5 1e3 4.");
        assert_eq!(tokens[0], TokenKind::IntLiteral(42));
        assert_eq!(tokens[1], TokenKind::UintLiteral(7));
        assert_eq!(tokens[2], TokenKind::IntLiteral(31));
        assert_eq!(tokens[3], TokenKind::IntLiteral(15));
        assert_eq!(tokens[4], TokenKind::FloatLiteral(3.14));
        assert_eq!(tokens[5], TokenKind::FloatLiteral(2.0));
        assert_eq!(tokens[6], TokenKind::DoubleLiteral(1.5));
        assert_eq!(tokens[7], TokenKind::FloatLiteral(0.5));
        assert_eq!(tokens[8], TokenKind::FloatLiteral(1000.0));
        assert_eq!(tokens[9], TokenKind::FloatLiteral(4.0));
    }

    #[test]
    fn test_bad_numbers_are_error_tokens() {
        let tokens = tokenize("0x 09 1abc 99999999999");
        assert!(tokens[..4].iter().all(|t| matches!(t, TokenKind::Error(_))));
        assert_eq!(tokens[4], TokenKind::Eof);
    }

    #[test]
    fn test_operators() {
        let tokens = tokenize("++ -= <<= >> <= == != && ^^ || |= ?");
        assert_eq!(
            tokens[..12],
            [
                TokenKind::PlusPlus,
                TokenKind::MinusEquals,
                TokenKind::ShlEquals,
                TokenKind::Shr,
                TokenKind::LessEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::AmpAmp,
                TokenKind::CaretCaret,
                TokenKind::PipePipe,
                TokenKind::PipeEquals,
                TokenKind::Question,
            ]
        );
    }

    #[test]
    fn test_swizzle_is_plain_identifier() {
        let tokens = tokenize("color.rgb");
        assert_eq!(tokens[0], TokenKind::Identifier("color".into()));
        assert_eq!(tokens[1], TokenKind::Dot);
        assert_eq!(tokens[2], TokenKind::Identifier("rgb".into()));
    }

    #[test]
    fn test_comments_skipped_offsets_kept() {
        let mut lexer = Lexer::new("a /* x\n y */ b // tail\nc");
        let tokens = lexer.tokenize();
        assert_eq!(tokens[0].text, "a");
        assert_eq!(tokens[1].text, "b");
        assert_eq!(tokens[1].span.start, 13);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[2].text, "c");
        assert_eq!(tokens[2].span.line, 3);
        assert_eq!(tokens[2].span.column, 1);
    }

    #[test]
    fn test_directive() {
        let tokens = tokenize("#version 450 core\n#define X \\\n 1\nfloat");
        assert_eq!(tokens[0], TokenKind::Directive("version 450 core".into()));
        assert_eq!(tokens[1], TokenKind::Directive("define X   1".into()));
        assert_eq!(tokens[2], TokenKind::TypeName("float".into()));
    }

    #[test]
    fn test_invalid_char_is_error_token() {
        let mut lexer = Lexer::new("a § b");
        let tokens = lexer.tokenize();
        assert!(matches!(tokens[1].kind, TokenKind::Error(_)));
        assert_eq!(tokens[1].text, "§");
        assert_eq!(tokens[2].kind, TokenKind::Identifier("b".into()));
        assert_eq!(tokens[2].span.start, 5);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let tokens = tokenize("a /* never closed");
        assert!(matches!(tokens[1], TokenKind::Error(_)));
        assert_eq!(tokens[2], TokenKind::Eof);
    }

    #[test]
    fn test_restartable() {
        let src = "vec3 c = vec3(1.0);";
        let first = Lexer::new(src).tokenize();
        let second = Lexer::new(src).tokenize();
        assert_eq!(first, second);
    }
}
