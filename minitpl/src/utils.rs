use std::borrow::Cow;
use std::char::decode_utf16;
use std::fmt::Write;
use std::iter::once;
use std::str::Chars;

use crate::error::{Error, ErrorKind};
use crate::value::Value;

/// The context key under which the escaper is made available to templates.
pub const ESCAPER_KEY: &str = "escapeHTML";

/// Is this character whitespace in the sense of a JavaScript `\s` class?
///
/// This is not the same as [`char::is_whitespace`]: the byte order mark
/// counts as whitespace, `U+0085` does not.
pub fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\x0b'
            | '\x0c'
            | '\r'
            | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
                | '\u{2028}'
                | '\u{2029}'
                | '\u{202f}'
                | '\u{205f}'
                | '\u{3000}'
                | '\u{feff}'
    )
}

/// Trims JavaScript whitespace from both ends of a string.
pub fn js_trim(s: &str) -> &str {
    s.trim_matches(is_js_whitespace)
}

#[inline(always)]
fn needs_escaping(c: char) -> bool {
    matches!(c, '"' | '&' | '\'' | '<' | '>')
}

/// HTML escapes a string with numeric character references.
///
/// The characters `"`, `&`, `'`, `<` and `>` are replaced by `&#<code>;`
/// where `<code>` is the decimal code point of the character.  Everything
/// else is left untouched.  If there is nothing to escape the input is
/// handed back borrowed.
///
/// ```
/// assert_eq!(minitpl::escape_html("<b>"), "&#60;b&#62;");
/// ```
pub fn escape_html(s: &str) -> Cow<'_, str> {
    let first = match s.find(needs_escaping) {
        Some(idx) => idx,
        None => return Cow::Borrowed(s),
    };

    let mut rv = String::with_capacity(s.len() + 8);
    rv.push_str(&s[..first]);
    for c in s[first..].chars() {
        if needs_escaping(c) {
            // a space is never in the escape set, this remap is kept for
            // output compatibility should the set ever grow.
            let code = match c as u32 {
                0x20 => 0xa0,
                code => code,
            };
            let _ = write!(rv, "&#{code};");
        } else {
            rv.push(c);
        }
    }
    Cow::Owned(rv)
}

/// Applies [`escape_html`] to a value.
///
/// Values that are not strings are returned unchanged.  The conversion to
/// text happens later when the value is written to the output.
pub fn escape_value(value: Value) -> Value {
    match value.as_str().map(escape_html) {
        Some(Cow::Owned(escaped)) => Value::from(escaped),
        _ => value,
    }
}

/// The escaper as it's exposed to templates under [`ESCAPER_KEY`].
pub(crate) fn escaper_function() -> Value {
    Value::from_function(ESCAPER_KEY, |args: &[Value]| {
        Ok(escape_value(args.first().cloned().unwrap_or_default()))
    })
}

struct Unescaper {
    out: String,
    pending_surrogate: u16,
}

impl Unescaper {
    fn unescape(mut self, s: &str) -> Result<String, Error> {
        let mut char_iter = s.chars();

        while let Some(c) = char_iter.next() {
            if c == '\\' {
                match char_iter.next() {
                    None => return Err(ErrorKind::BadEscape.into()),
                    Some(d) => match d {
                        'b' => ok!(self.push_char('\x08')),
                        'f' => ok!(self.push_char('\x0C')),
                        'n' => ok!(self.push_char('\n')),
                        'r' => ok!(self.push_char('\r')),
                        't' => ok!(self.push_char('\t')),
                        'v' => ok!(self.push_char('\x0B')),
                        '0' if !char_iter.as_str().starts_with(|x: char| x.is_ascii_digit()) => {
                            ok!(self.push_char('\0'))
                        }
                        '0'..='9' => {
                            return Err(Error::new(
                                ErrorKind::BadEscape,
                                "octal escape sequences are not allowed",
                            ))
                        }
                        'x' => {
                            let val = ok!(parse_hex(&mut char_iter, 2));
                            ok!(self.push_u16(val as u16));
                        }
                        'u' if char_iter.as_str().starts_with('{') => {
                            char_iter.next();
                            let hexnum = char_iter
                                .by_ref()
                                .take_while(|&x| x != '}')
                                .collect::<String>();
                            let c = parse_hex_digits(&hexnum).and_then(char::from_u32);
                            match c {
                                Some(c) => ok!(self.push_char(c)),
                                None => return Err(ErrorKind::BadEscape.into()),
                            }
                        }
                        'u' => {
                            let val = ok!(parse_hex(&mut char_iter, 4));
                            ok!(self.push_u16(val as u16));
                        }
                        // any other escaped character stands for itself
                        other => ok!(self.push_char(other)),
                    },
                }
            } else {
                ok!(self.push_char(c));
            }
        }

        if self.pending_surrogate != 0 {
            Err(ErrorKind::BadEscape.into())
        } else {
            Ok(self.out)
        }
    }

    fn push_u16(&mut self, c: u16) -> Result<(), Error> {
        match (self.pending_surrogate, (0xD800..=0xDFFF).contains(&c)) {
            (0, false) => match decode_utf16(once(c)).next() {
                Some(Ok(c)) => self.out.push(c),
                _ => return Err(ErrorKind::BadEscape.into()),
            },
            (_, false) => return Err(ErrorKind::BadEscape.into()),
            (0, true) => self.pending_surrogate = c,
            (prev, true) => match decode_utf16(once(prev).chain(once(c))).next() {
                Some(Ok(c)) => {
                    self.out.push(c);
                    self.pending_surrogate = 0;
                }
                _ => return Err(ErrorKind::BadEscape.into()),
            },
        }
        Ok(())
    }

    fn push_char(&mut self, c: char) -> Result<(), Error> {
        if self.pending_surrogate != 0 {
            Err(ErrorKind::BadEscape.into())
        } else {
            self.out.push(c);
            Ok(())
        }
    }
}

fn parse_hex(chars: &mut Chars, len: usize) -> Result<u32, Error> {
    let hexnum = chars.take(len).collect::<String>();
    if hexnum.len() != len {
        return Err(ErrorKind::BadEscape.into());
    }
    parse_hex_digits(&hexnum).ok_or_else(|| ErrorKind::BadEscape.into())
}

/// Parses hex digits into a code point.
///
/// Unlike `from_str_radix` this rejects signs and empty input.
fn parse_hex_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(s, 16).ok()
}

/// Un-escape the body of a string literal, following JavaScript rules.
pub fn unescape(s: &str) -> Result<String, Error> {
    Unescaper {
        out: String::new(),
        pending_surrogate: 0,
    }
    .unescape(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_html_escape() {
        let input = "<>&\"'/";
        let output = escape_html(input);
        assert_eq!(output, "&#60;&#62;&#38;&#34;&#39;/");
    }

    #[test]
    fn test_html_escape_borrows_safe_text() {
        let input = "nothing to see here / ä";
        assert!(matches!(escape_html(input), Cow::Borrowed(x) if std::ptr::eq(x, input)));
    }

    #[test]
    fn test_html_escape_keeps_spaces() {
        assert_eq!(escape_html("a < b"), "a &#60; b");
    }

    #[test]
    fn test_escape_value_passes_non_strings() {
        assert_eq!(escape_value(Value::from(42)), Value::from(42));
        assert_eq!(escape_value(Value::from(true)), Value::from(true));
        assert!(escape_value(Value::UNDEFINED).is_undefined());
        assert_eq!(escape_value(Value::from("&")), Value::from("&#38;"));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"foo\u2603bar").unwrap(), "foo\u{2603}bar");
        assert_eq!(unescape(r"\t\b\f\r\n\v\\\/").unwrap(), "\t\x08\x0c\r\n\x0b\\/");
        assert_eq!(unescape("foobarbaz").unwrap(), "foobarbaz");
        assert_eq!(unescape(r"\ud83d\udca9").unwrap(), "💩");
        assert_eq!(unescape(r"\u{1F4A9}").unwrap(), "💩");
        assert_eq!(unescape(r"\x41\q\'").unwrap(), "Aq'");
        assert_eq!(unescape(r"a\0b").unwrap(), "a\0b");
    }

    #[test]
    fn test_unescape_errors() {
        assert_eq!(unescape(r"\ud83d").unwrap_err().kind(), ErrorKind::BadEscape);
        assert_eq!(unescape(r"\x4").unwrap_err().kind(), ErrorKind::BadEscape);
        assert_eq!(unescape(r"\1").unwrap_err().kind(), ErrorKind::BadEscape);
        assert_eq!(unescape("\\").unwrap_err().kind(), ErrorKind::BadEscape);
        assert_eq!(unescape(r"\x+1").unwrap_err().kind(), ErrorKind::BadEscape);
        assert_eq!(unescape(r"\u+041").unwrap_err().kind(), ErrorKind::BadEscape);
        assert_eq!(unescape(r"\u{+41}").unwrap_err().kind(), ErrorKind::BadEscape);
        assert_eq!(unescape(r"\u{}").unwrap_err().kind(), ErrorKind::BadEscape);
    }

    #[test]
    fn test_is_js_whitespace() {
        assert!(is_js_whitespace('\u{feff}'));
        assert!(is_js_whitespace('\u{a0}'));
        assert!(!is_js_whitespace('\u{85}'));
        assert!(!is_js_whitespace('x'));
        assert_eq!(js_trim("\u{3000} a b \t"), "a b");
    }
}
