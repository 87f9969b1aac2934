// ── Presentation-format tokenizer ──
//
// Splits one logical line of zone-file text into tokens. Quoted strings
// keep their unescaped bytes, comments start at an unquoted `;`, and
// parentheses are reported as separate tokens so callers can join
// multi-line records.

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Word(String),
    Quoted(Vec<u8>),
    OpenParen,
    CloseParen,
}

impl Token {
    /// Text of a bare word or lossy text of a quoted string.
    pub(crate) fn text(&self) -> String {
        match self {
            Self::Word(w) => w.clone(),
            Self::Quoted(b) => String::from_utf8_lossy(b).into_owned(),
            Self::OpenParen => "(".into(),
            Self::CloseParen => ")".into(),
        }
    }

    pub(crate) fn as_word(&self) -> Option<&str> {
        match self {
            Self::Word(w) => Some(w),
            _ => None,
        }
    }
}

/// Tokenize a single physical line.
pub(crate) fn tokenize(line: &str) -> Result<Vec<Token>, CoreError> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b';' => break,
            b'(' => {
                tokens.push(Token::OpenParen);
                i += 1;
            }
            b')' => {
                tokens.push(Token::CloseParen);
                i += 1;
            }
            b'"' => {
                let (value, next) = read_quoted(bytes, i + 1)?;
                tokens.push(Token::Quoted(value));
                i = next;
            }
            _ => {
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n' | b';' | b'(' | b')' | b'"') {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                let end = i.min(bytes.len());
                tokens.push(Token::Word(line[start..end].to_owned()));
            }
        }
    }

    Ok(tokens)
}

fn read_quoted(bytes: &[u8], mut i: usize) -> Result<(Vec<u8>, usize), CoreError> {
    let mut out = Vec::new();
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Ok((out, i + 1)),
            b'\\' => {
                let (byte, next) = read_escape(bytes, i + 1)?;
                out.push(byte);
                i = next;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Err(CoreError::validation("unterminated quoted string"))
}

/// Decode `\X` or `\DDD` starting right after the backslash.
fn read_escape(bytes: &[u8], i: usize) -> Result<(u8, usize), CoreError> {
    let digits: Vec<u8> = bytes
        .iter()
        .skip(i)
        .take(3)
        .copied()
        .take_while(u8::is_ascii_digit)
        .collect();
    if digits.len() == 3 {
        let value = digits
            .iter()
            .fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'));
        let byte = u8::try_from(value)
            .map_err(|_| CoreError::validation(format!("escape \\{value} out of range")))?;
        return Ok((byte, i + 3));
    }
    bytes
        .get(i)
        .map(|b| (*b, i + 1))
        .ok_or_else(|| CoreError::validation("dangling escape at end of line"))
}

/// Quote a character string for presentation, escaping as needed.
pub(crate) fn quote(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\{b:03}")),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn splits_words_and_quotes() {
        let tokens = tokenize(r#"www 300 IN TXT "hello world" "x\"y""#).unwrap();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[4], Token::Quoted(b"hello world".to_vec()));
        assert_eq!(tokens[5], Token::Quoted(b"x\"y".to_vec()));
    }

    #[test]
    fn stops_at_comment() {
        let tokens = tokenize("@ IN A 1.2.3.4 ; apex").unwrap();
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn reports_parentheses() {
        let tokens = tokenize("@ SOA ns. host. (1 2").unwrap();
        assert!(tokens.contains(&Token::OpenParen));
    }

    #[test]
    fn decodes_decimal_escapes() {
        let tokens = tokenize(r#""a\065b""#).unwrap();
        assert_eq!(tokens[0], Token::Quoted(b"aAb".to_vec()));
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert!(tokenize("\"open").is_err());
    }

    #[test]
    fn quote_escapes_specials() {
        assert_eq!(quote(b"a\"b\\c\x01"), r#""a\"b\\c\001""#);
    }
}
