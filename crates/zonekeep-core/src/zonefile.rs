// ── Zone file reading and writing ──
//
// Master-file syntax: `$ORIGIN`, `$TTL`, `@`, relative owners, omitted
// owner/TTL/class and parenthesized records spanning several lines.
// `$INCLUDE` is refused since zone text never comes from a trusted path.

use std::fmt::Write as _;

use crate::error::CoreError;
use crate::model::presentation::{self, Token};
use crate::model::{Record, fqdn};

/// Parse zone-file text into records.
///
/// `origin` seeds `$ORIGIN`; `default_ttl` applies until a `$TTL`
/// directive or an explicit TTL is seen.
pub fn parse_zone(text: &str, origin: Option<&str>, default_ttl: u32) -> Result<Vec<Record>, CoreError> {
    let mut parser = ZoneParser {
        origin: origin.map(fqdn),
        ttl: default_ttl,
        last_owner: None,
        records: Vec::new(),
    };

    let mut pending: Vec<Token> = Vec::new();
    let mut depth = 0usize;
    let mut continued_owner = false;
    let mut start_line = 0;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let tokens = presentation::tokenize(line).map_err(|e| at_line(line_no, &e))?;
        if depth == 0 {
            if tokens.is_empty() {
                continue;
            }
            start_line = line_no;
            continued_owner = line.starts_with([' ', '\t']);
        }
        for token in tokens {
            match token {
                Token::OpenParen => depth += 1,
                Token::CloseParen => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| at_line(line_no, &CoreError::validation("unbalanced ')'")))?;
                }
                other => pending.push(other),
            }
        }
        if depth == 0 && !pending.is_empty() {
            let tokens = std::mem::take(&mut pending);
            parser
                .entry(&tokens, continued_owner)
                .map_err(|e| at_line(start_line, &e))?;
        }
    }

    if depth > 0 {
        return Err(at_line(start_line, &CoreError::validation("unterminated '('")));
    }
    Ok(parser.records)
}

/// Render records as zone-file text, one canonical line each.
pub fn write_zone(records: &[Record], origin: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "$ORIGIN {}", fqdn(origin));
    for record in records {
        let _ = writeln!(out, "{record}");
    }
    out
}

struct ZoneParser {
    origin: Option<String>,
    ttl: u32,
    last_owner: Option<String>,
    records: Vec<Record>,
}

impl ZoneParser {
    fn entry(&mut self, tokens: &[Token], continued_owner: bool) -> Result<(), CoreError> {
        if let Some(directive) = tokens.first().and_then(Token::as_word) {
            if directive.starts_with('$') {
                return self.directive(directive, &tokens[1..]);
            }
        }

        let owner = if continued_owner {
            let owner = self
                .last_owner
                .as_deref()
                .ok_or_else(|| CoreError::validation("record without owner name"))?;
            Some(owner)
        } else {
            None
        };
        let record = Record::from_tokens(tokens, self.origin.as_deref(), owner, self.ttl)?;
        self.last_owner = Some(record.name.clone());
        self.records.push(record);
        Ok(())
    }

    fn directive(&mut self, name: &str, args: &[Token]) -> Result<(), CoreError> {
        let arg = args
            .first()
            .and_then(Token::as_word)
            .ok_or_else(|| CoreError::validation(format!("{name} needs an argument")))?;
        match name.to_ascii_uppercase().as_str() {
            "$ORIGIN" => {
                let origin = if arg.ends_with('.') {
                    arg.to_owned()
                } else {
                    match &self.origin {
                        Some(current) => crate::model::join_name(arg, current),
                        None => fqdn(arg),
                    }
                };
                self.origin = Some(origin);
            }
            "$TTL" => {
                self.ttl = arg
                    .parse()
                    .map_err(|_| CoreError::validation(format!("invalid $TTL {arg:?}")))?;
            }
            other => {
                return Err(CoreError::validation(format!(
                    "unsupported directive {other}"
                )));
            }
        }
        Ok(())
    }
}

fn at_line(line: usize, err: &CoreError) -> CoreError {
    let message = match err {
        CoreError::ValidationFailed { message } => message.clone(),
        other => other.to_string(),
    };
    CoreError::validation(format!("line {line}: {message}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Rdata, RecordType};
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
$ORIGIN example.com.
$TTL 3600
@   IN SOA ns1 hostmaster (
        2024010101 ; serial
        7200 3600 1209600 300 )
    IN NS ns1
    IN NS ns2.example.net.
www 300 CNAME @
mail IN A 192.0.2.25
     IN AAAA 2001:db8::25
@ TXT "v=spf1 " "mx -all"
"#;

    #[test]
    fn parses_master_file_syntax() {
        let records = parse_zone(SAMPLE, None, 0).unwrap();
        assert_eq!(records.len(), 7);

        let Rdata::Soa(soa) = &records[0].rdata else {
            panic!("expected SOA first");
        };
        assert_eq!(soa.mname, "ns1.example.com.");
        assert_eq!(soa.serial, 2_024_010_101);
        assert_eq!(records[0].ttl, 3600);

        assert_eq!(records[1].name, "example.com.");
        assert_eq!(records[1].rdata, Rdata::Ns("ns1.example.com.".into()));
        assert_eq!(records[3].ttl, 300);
        assert_eq!(records[3].rdata, Rdata::Cname("example.com.".into()));
        assert_eq!(records[5].name, "mail.example.com.");
        assert_eq!(records[5].rtype(), RecordType::AAAA);
        assert_eq!(records[6].txt_payload(), Some("v=spf1 mx -all"));
    }

    #[test]
    fn origin_argument_resolves_relative_names() {
        let records = parse_zone("www 60 IN A 192.0.2.1", Some("example.org"), 0).unwrap();
        assert_eq!(records[0].name, "www.example.org.");
    }

    #[test]
    fn reports_line_numbers() {
        let err = parse_zone("\n\nwww IN A not-an-ip", Some("example.com."), 300).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        assert!(parse_zone("@ SOA a. b. ( 1 2 3 4 5", Some("example.com."), 300).is_err());
        assert!(parse_zone("@ A 192.0.2.1 )", Some("example.com."), 300).is_err());
    }

    #[test]
    fn refuses_include() {
        let err = parse_zone("$INCLUDE /etc/passwd", None, 0).unwrap_err();
        assert!(err.to_string().contains("unsupported directive"));
    }

    #[test]
    fn written_zone_parses_back() {
        let records = parse_zone(SAMPLE, None, 0).unwrap();
        let text = write_zone(&records, "example.com");
        let again = parse_zone(&text, None, 0).unwrap();
        assert_eq!(again, records);
    }
}
