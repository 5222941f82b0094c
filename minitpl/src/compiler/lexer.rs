use std::borrow::Cow;

use crate::compiler::tokens::Token;
use crate::error::{Error, ErrorKind};
use crate::utils::{is_js_whitespace, js_trim, unescape};

const FRAGMENT_START: &str = "<%";
const FRAGMENT_END: &str = "%>";

/// Strips formatting whitespace from a template source.
///
/// Every newline and carriage return is deleted and every run of two or
/// more whitespace characters is removed entirely (it is not collapsed to a
/// single space).  A newline is removed on its own before it can start a
/// whitespace run, which means `"a\n b"` keeps its space while `"a \nb"`
/// does not.
pub fn normalize(source: &str) -> String {
    let mut rv = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            continue;
        }
        if is_js_whitespace(c) && chars.peek().map_or(false, |&x| is_js_whitespace(x)) {
            while chars.next_if(|&x| is_js_whitespace(x)).is_some() {}
            continue;
        }
        if c != '\r' {
            rv.push(c);
        }
    }
    rv
}

/// A piece of a (normalized) template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'s> {
    /// Text that is emitted as-is.
    Literal(&'s str),
    /// The trimmed interior of a `<% ... %>` fragment.
    Fragment(&'s str),
}

/// Splits a template into literal text and fragments.
///
/// The scanner keeps a single cursor (the end of the last fragment).  Text
/// between the cursor and the next fragment becomes a literal.  After the
/// last fragment the remaining text is only emitted if it is longer than a
/// single UTF-16 code unit: a template that ends in exactly one character
/// after its last fragment loses that character.
pub struct Scanner<'s> {
    source: &'s str,
    last_index: usize,
    pending: Option<Segment<'s>>,
    done: bool,
}

impl<'s> Scanner<'s> {
    /// Creates a scanner over an already normalized source.
    pub fn new(source: &'s str) -> Scanner<'s> {
        Scanner {
            source,
            last_index: 0,
            pending: None,
            done: false,
        }
    }

    /// Finds the next fragment at or after `offset`.
    ///
    /// Returns the start and end offsets of the whole fragment together
    /// with its trimmed interior.
    fn find_fragment(&self, mut offset: usize) -> Option<(usize, usize, &'s str)> {
        loop {
            let start = offset + some!(self.source[offset..].find(FRAGMENT_START));
            let interior_start = start + FRAGMENT_START.len();
            let interior_end =
                interior_start + some!(self.source[interior_start..].find(FRAGMENT_END));
            let interior = js_trim(&self.source[interior_start..interior_end]);
            // fragments never span line terminators
            if interior.contains(['\u{2028}', '\u{2029}']) {
                offset = start + 1;
                continue;
            }
            return Some((start, interior_end + FRAGMENT_END.len(), interior));
        }
    }

    fn tail(&mut self) -> Option<Segment<'s>> {
        self.done = true;
        let rest = &self.source[self.last_index..];
        if rest.encode_utf16().nth(1).is_some() {
            Some(Segment::Literal(rest))
        } else {
            None
        }
    }
}

impl<'s> Iterator for Scanner<'s> {
    type Item = Segment<'s>;

    fn next(&mut self) -> Option<Segment<'s>> {
        if let Some(pending) = self.pending.take() {
            return Some(pending);
        }
        if self.done {
            return None;
        }
        match self.find_fragment(self.last_index) {
            Some((start, end, interior)) => {
                let lead = &self.source[self.last_index..start];
                self.last_index = end;
                if lead.is_empty() {
                    Some(Segment::Fragment(interior))
                } else {
                    self.pending = Some(Segment::Fragment(interior));
                    Some(Segment::Literal(lead))
                }
            }
            None => self.tail(),
        }
    }
}

/// Utility function to scan a normalized template into segments.
pub fn scan(source: &str) -> Scanner<'_> {
    Scanner::new(source)
}

#[cfg(feature = "unicode")]
fn lex_identifier(s: &str) -> usize {
    s.chars()
        .enumerate()
        .map_while(|(idx, c)| {
            let cont = if c == '_' || c == '$' {
                true
            } else if idx == 0 {
                unicode_ident::is_xid_start(c)
            } else {
                unicode_ident::is_xid_continue(c)
            };
            cont.then(|| c.len_utf8())
        })
        .sum::<usize>()
}

#[cfg(not(feature = "unicode"))]
fn lex_identifier(s: &str) -> usize {
    s.as_bytes()
        .iter()
        .enumerate()
        .take_while(|&(idx, &c)| {
            if c == b'_' || c == b'$' {
                true
            } else if idx == 0 {
                c.is_ascii_alphabetic()
            } else {
                c.is_ascii_alphanumeric()
            }
        })
        .count()
}

/// Tokenizes the interior of a fragment.
pub struct Tokenizer<'s> {
    rest: &'s str,
}

impl<'s> Tokenizer<'s> {
    /// Creates a new tokenizer.
    pub fn new(input: &'s str) -> Tokenizer<'s> {
        Tokenizer { rest: input }
    }

    fn advance(&mut self, bytes: usize) -> &'s str {
        let (skipped, new_rest) = self.rest.split_at(bytes);
        self.rest = new_rest;
        skipped
    }

    #[inline]
    fn rest_bytes(&self) -> &'s [u8] {
        self.rest.as_bytes()
    }

    #[inline]
    fn syntax_error(&self, msg: &'static str) -> Error {
        Error::new(ErrorKind::SyntaxError, msg)
    }

    /// Produces the next token from the tokenizer.
    pub fn next_token(&mut self) -> Result<Option<Token<'s>>, Error> {
        self.rest = self.rest.trim_start_matches(is_js_whitespace);
        if self.rest.is_empty() {
            return Ok(None);
        }

        // three character operators
        let op = match self.rest_bytes().get(..3) {
            Some(b"===") => Some(Token::StrictEq),
            Some(b"!==") => Some(Token::StrictNe),
            _ => None,
        };
        if let Some(op) = op {
            self.advance(3);
            return Ok(Some(op));
        }

        // two character operators
        let op = match self.rest_bytes().get(..2) {
            Some(b"==") => Some(Token::Eq),
            Some(b"!=") => Some(Token::Ne),
            Some(b">=") => Some(Token::Gte),
            Some(b"<=") => Some(Token::Lte),
            Some(b"&&") => Some(Token::And),
            Some(b"||") => Some(Token::Or),
            Some(b"??") => Some(Token::Nullish),
            Some(b"++") => Some(Token::Increment),
            Some(b"--") => Some(Token::Decrement),
            Some(b"+=") => Some(Token::PlusAssign),
            Some(b"-=") => Some(Token::MinusAssign),
            Some(b"*=") => Some(Token::MulAssign),
            Some(b"/=") => Some(Token::DivAssign),
            Some(b"%=") => Some(Token::ModAssign),
            _ => None,
        };
        if let Some(op) = op {
            self.advance(2);
            return Ok(Some(op));
        }

        // single character operators (and strings)
        let op = match self.rest_bytes()[0] {
            b'+' => Some(Token::Plus),
            b'-' => Some(Token::Minus),
            b'*' => Some(Token::Mul),
            b'/' => Some(Token::Div),
            b'%' => Some(Token::Mod),
            b'!' => Some(Token::Bang),
            b'?' => Some(Token::Question),
            b':' => Some(Token::Colon),
            b'.' if self
                .rest_bytes()
                .get(1)
                .map_or(false, |c| c.is_ascii_digit()) =>
            {
                return self.eat_number().map(Some);
            }
            b'.' => Some(Token::Dot),
            b',' => Some(Token::Comma),
            b';' => Some(Token::Semicolon),
            b'=' => Some(Token::Assign),
            b'>' => Some(Token::Gt),
            b'<' => Some(Token::Lt),
            b'(' => Some(Token::ParenOpen),
            b')' => Some(Token::ParenClose),
            b'[' => Some(Token::BracketOpen),
            b']' => Some(Token::BracketClose),
            b'{' => Some(Token::BraceOpen),
            b'}' => Some(Token::BraceClose),
            b'\'' => return self.eat_string(b'\'').map(Some),
            b'"' => return self.eat_string(b'"').map(Some),
            c if c.is_ascii_digit() => return self.eat_number().map(Some),
            _ => None,
        };
        if let Some(op) = op {
            self.advance(1);
            Ok(Some(op))
        } else {
            self.eat_identifier().map(Some)
        }
    }

    fn eat_number(&mut self) -> Result<Token<'s>, Error> {
        #[derive(Copy, Clone)]
        enum State {
            RadixInteger, // 0x10
            Integer,      // 123
            Fraction,     // .123
            Exponent,     // E | e
            ExponentSign, // +|-
        }

        let radix = match self.rest_bytes().get(..2) {
            Some(b"0b" | b"0B") => 2,
            Some(b"0o" | b"0O") => 8,
            Some(b"0x" | b"0X") => 16,
            _ => 10,
        };

        let mut state = if radix == 10 {
            State::Integer
        } else {
            self.advance(2);
            State::RadixInteger
        };

        let mut num_len = self
            .rest_bytes()
            .iter()
            .take_while(|&c| c.is_ascii_digit())
            .count();
        let mut has_underscore = false;
        for c in self.rest_bytes()[num_len..].iter().copied() {
            state = match (c, state) {
                (b'.', State::Integer) => State::Fraction,
                (b'E' | b'e', State::Integer | State::Fraction) => State::Exponent,
                (b'+' | b'-', State::Exponent) => State::ExponentSign,
                (b'0'..=b'9', State::Exponent) => State::ExponentSign,
                (b'0'..=b'9', state) => state,
                (b'a'..=b'f' | b'A'..=b'F', State::RadixInteger) if radix == 16 => state,
                (b'_', _) => {
                    has_underscore = true;
                    state
                }
                _ => break,
            };
            num_len += 1;
        }

        let mut num = Cow::Borrowed(self.advance(num_len));
        if has_underscore {
            if num.ends_with('_') {
                return Err(self.syntax_error("'_' may not occur at end of number"));
            }
            num = Cow::Owned(num.replace('_', ""));
        }

        if radix == 10 {
            num.parse()
                .map(Token::Number)
                .map_err(|_| self.syntax_error("invalid number"))
        } else {
            if num.is_empty() {
                return Err(self.syntax_error("invalid integer"));
            }
            // accumulated as a double so long literals lose precision instead of failing
            let mut value = 0.0;
            for c in num.chars() {
                match c.to_digit(radix) {
                    Some(digit) => value = value * radix as f64 + digit as f64,
                    None => return Err(self.syntax_error("invalid integer")),
                }
            }
            Ok(Token::Number(value))
        }
    }

    fn eat_identifier(&mut self) -> Result<Token<'s>, Error> {
        let ident_len = lex_identifier(self.rest);
        if ident_len > 0 {
            Ok(Token::Ident(self.advance(ident_len)))
        } else {
            Err(self.syntax_error("unexpected character"))
        }
    }

    fn eat_string(&mut self, delim: u8) -> Result<Token<'s>, Error> {
        let mut escaped = false;
        let mut has_escapes = false;
        let str_len = self
            .rest_bytes()
            .iter()
            .skip(1)
            .take_while(|&&c| match (escaped, c) {
                (true, _) => {
                    escaped = false;
                    true
                }
                (_, b'\\') => {
                    escaped = true;
                    has_escapes = true;
                    true
                }
                (_, c) if c == delim => false,
                _ => true,
            })
            .count();
        if escaped || self.rest_bytes().get(str_len + 1) != Some(&delim) {
            return Err(self.syntax_error("unexpected end of string"));
        }
        let s = self.advance(str_len + 2);
        Ok(if has_escapes {
            Token::String(ok!(unescape(&s[1..s.len() - 1])))
        } else {
            Token::Str(&s[1..s.len() - 1])
        })
    }
}

/// Tokenizes a fragment into a list of tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, Error> {
    let mut tokenizer = Tokenizer::new(input);
    let mut rv = Vec::new();
    while let Some(token) = ok!(tokenizer.next_token()) {
        rv.push(token);
    }
    Ok(rv)
}
