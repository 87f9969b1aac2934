// ── DNS resource records ──
//
// Records are compared through their canonical one-line presentation.
// TXT and SPF payloads are held as a single joined string and are only
// split into 255-octet character strings when emitted.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::identifier::HexBlob;
use super::presentation::{self, Token};
use crate::error::CoreError;

/// Maximum length of one TXT character string.
pub const TXT_SEGMENT_LEN: usize = 255;

// ── RecordType ──────────────────────────────────────────────────────

/// Resource record type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordType(pub u16);

macro_rules! record_types {
    ($( $(#[$doc:meta])* ($name:ident => $code:literal, $mnemonic:literal) )*) => {
        impl RecordType {
            $(
                $(#[$doc])*
                pub const $name: Self = Self($code);
            )*

            /// Registered mnemonic, if this type has one.
            pub fn mnemonic(self) -> Option<&'static str> {
                match self.0 {
                    $( $code => Some($mnemonic), )*
                    _ => None,
                }
            }

            fn from_mnemonic(s: &str) -> Option<Self> {
                $( if s.eq_ignore_ascii_case($mnemonic) { return Some(Self($code)); } )*
                None
            }
        }
    };
}

record_types! {
    /// A host address.
    (A => 1, "A")
    /// An authoritative name server.
    (NS => 2, "NS")
    /// The canonical name for an alias.
    (CNAME => 5, "CNAME")
    /// Marks the start of a zone of authority.
    (SOA => 6, "SOA")
    (PTR => 12, "PTR")
    (HINFO => 13, "HINFO")
    /// Mail exchange.
    (MX => 15, "MX")
    (TXT => 16, "TXT")
    (AAAA => 28, "AAAA")
    (LOC => 29, "LOC")
    (SRV => 33, "SRV")
    (NAPTR => 35, "NAPTR")
    (DS => 43, "DS")
    (SSHFP => 44, "SSHFP")
    (RRSIG => 46, "RRSIG")
    (NSEC => 47, "NSEC")
    (DNSKEY => 48, "DNSKEY")
    (NSEC3 => 50, "NSEC3")
    (NSEC3PARAM => 51, "NSEC3PARAM")
    (TLSA => 52, "TLSA")
    (CDS => 59, "CDS")
    (CDNSKEY => 60, "CDNSKEY")
    (OPENPGPKEY => 61, "OPENPGPKEY")
    (SVCB => 64, "SVCB")
    (HTTPS => 65, "HTTPS")
    /// Sender Policy Framework (obsolete type, still served by some zones).
    (SPF => 99, "SPF")
    /// Certification Authority Authorization.
    (CAA => 257, "CAA")
}

impl RecordType {
    /// Types whose presence is maintained by a signing provider.
    ///
    /// `DS` only counts at the zone apex; a DS at a delegation point is
    /// user data.
    pub fn is_dnssec_maintenance(self, owner: &str, origin: &str) -> bool {
        match self {
            Self::RRSIG
            | Self::NSEC
            | Self::NSEC3
            | Self::NSEC3PARAM
            | Self::DNSKEY
            | Self::CDS
            | Self::CDNSKEY => true,
            Self::DS => names_equal(owner, origin),
            _ => false,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(m) => f.write_str(m),
            None => write!(f, "TYPE{}", self.0),
        }
    }
}

impl FromStr for RecordType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(t) = Self::from_mnemonic(s) {
            return Ok(t);
        }
        s.get(..4)
            .filter(|p| p.eq_ignore_ascii_case("TYPE"))
            .and_then(|_| s[4..].parse::<u16>().ok())
            .map(Self)
            .ok_or_else(|| CoreError::validation(format!("unknown record type {s:?}")))
    }
}

impl Serialize for RecordType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── RecordClass ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordClass(pub u16);

impl RecordClass {
    pub const IN: Self = Self(1);
    pub const CH: Self = Self(3);
    pub const HS: Self = Self(4);
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::IN => f.write_str("IN"),
            Self::CH => f.write_str("CH"),
            Self::HS => f.write_str("HS"),
            Self(other) => write!(f, "CLASS{other}"),
        }
    }
}

impl FromStr for RecordClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::IN),
            "CH" => Ok(Self::CH),
            "HS" => Ok(Self::HS),
            other => other
                .strip_prefix("CLASS")
                .and_then(|n| n.parse().ok())
                .map(Self)
                .ok_or_else(|| CoreError::validation(format!("unknown class {s:?}"))),
        }
    }
}

// ── Rdata ───────────────────────────────────────────────────────────

/// Type-specific record data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rdata {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(String),
    Cname(String),
    Ptr(String),
    Mx {
        preference: u16,
        exchange: String,
    },
    /// Full TXT payload; segmentation happens on emission.
    Txt(String),
    Spf(String),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Caa {
        flags: u8,
        tag: String,
        value: String,
    },
    Soa(Soa),
    /// A type without typed support, kept in presentation form.
    Other { rtype: RecordType, text: String },
    /// RFC 3597 generic encoding.
    Unknown { rtype: RecordType, data: HexBlob },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soa {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl Rdata {
    pub fn rtype(&self) -> RecordType {
        match self {
            Self::A(_) => RecordType::A,
            Self::Aaaa(_) => RecordType::AAAA,
            Self::Ns(_) => RecordType::NS,
            Self::Cname(_) => RecordType::CNAME,
            Self::Ptr(_) => RecordType::PTR,
            Self::Mx { .. } => RecordType::MX,
            Self::Txt(_) => RecordType::TXT,
            Self::Spf(_) => RecordType::SPF,
            Self::Srv { .. } => RecordType::SRV,
            Self::Caa { .. } => RecordType::CAA,
            Self::Soa(_) => RecordType::SOA,
            Self::Other { rtype, .. } | Self::Unknown { rtype, .. } => *rtype,
        }
    }

    /// Parse rdata tokens for `rtype`. Relative names resolve against `origin`.
    pub(crate) fn parse(
        rtype: RecordType,
        tokens: &[Token],
        origin: Option<&str>,
    ) -> Result<Self, CoreError> {
        if tokens.first().and_then(Token::as_word) == Some("\\#") {
            return parse_generic(rtype, &tokens[1..]);
        }

        let word = |idx: usize| -> Result<String, CoreError> {
            tokens
                .get(idx)
                .map(Token::text)
                .ok_or_else(|| CoreError::validation(format!("{rtype} record is missing fields")))
        };
        let name = |idx: usize| -> Result<String, CoreError> { Ok(absolute_name(&word(idx)?, origin)) };

        let rdata = match rtype {
            RecordType::A => Self::A(parse_field(&word(0)?, "IPv4 address")?),
            RecordType::AAAA => Self::Aaaa(parse_field(&word(0)?, "IPv6 address")?),
            RecordType::NS => Self::Ns(name(0)?),
            RecordType::CNAME => Self::Cname(name(0)?),
            RecordType::PTR => Self::Ptr(name(0)?),
            RecordType::MX => Self::Mx {
                preference: parse_field(&word(0)?, "MX preference")?,
                exchange: name(1)?,
            },
            RecordType::TXT => Self::Txt(join_character_strings(tokens)),
            RecordType::SPF => Self::Spf(join_character_strings(tokens)),
            RecordType::SRV => Self::Srv {
                priority: parse_field(&word(0)?, "SRV priority")?,
                weight: parse_field(&word(1)?, "SRV weight")?,
                port: parse_field(&word(2)?, "SRV port")?,
                target: name(3)?,
            },
            RecordType::CAA => Self::Caa {
                flags: parse_field(&word(0)?, "CAA flags")?,
                tag: word(1)?,
                value: word(2)?,
            },
            RecordType::SOA => Self::Soa(Soa {
                mname: name(0)?,
                rname: name(1)?,
                serial: parse_field(&word(2)?, "SOA serial")?,
                refresh: parse_field(&word(3)?, "SOA refresh")?,
                retry: parse_field(&word(4)?, "SOA retry")?,
                expire: parse_field(&word(5)?, "SOA expire")?,
                minimum: parse_field(&word(6)?, "SOA minimum")?,
            }),
            other => Self::Other {
                rtype: other,
                text: tokens
                    .iter()
                    .map(|t| match t {
                        Token::Quoted(b) => presentation::quote(b),
                        other => other.text(),
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            },
        };
        Ok(rdata)
    }

    fn lowercase_names(&mut self) {
        match self {
            Self::Ns(n) | Self::Cname(n) | Self::Ptr(n) => *n = n.to_ascii_lowercase(),
            Self::Mx { exchange, .. } => *exchange = exchange.to_ascii_lowercase(),
            Self::Srv { target, .. } => *target = target.to_ascii_lowercase(),
            Self::Soa(soa) => {
                soa.mname = soa.mname.to_ascii_lowercase();
                soa.rname = soa.rname.to_ascii_lowercase();
            }
            _ => {}
        }
    }
}

impl fmt::Display for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(ip) => write!(f, "{ip}"),
            Self::Aaaa(ip) => write!(f, "{ip}"),
            Self::Ns(n) | Self::Cname(n) | Self::Ptr(n) => f.write_str(n),
            Self::Mx {
                preference,
                exchange,
            } => write!(f, "{preference} {exchange}"),
            Self::Txt(payload) | Self::Spf(payload) => {
                let segments = txt_segments(payload);
                if segments.is_empty() {
                    return f.write_str("\"\"");
                }
                let quoted: Vec<String> = segments.iter().map(|s| presentation::quote(s)).collect();
                f.write_str(&quoted.join(" "))
            }
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{priority} {weight} {port} {target}"),
            Self::Caa { flags, tag, value } => {
                write!(f, "{flags} {tag} {}", presentation::quote(value.as_bytes()))
            }
            Self::Soa(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            Self::Other { text, .. } => f.write_str(text),
            Self::Unknown { data, .. } => {
                if data.is_empty() {
                    f.write_str("\\# 0")
                } else {
                    write!(f, "\\# {} {data}", data.len())
                }
            }
        }
    }
}

fn parse_field<T: FromStr>(s: &str, what: &str) -> Result<T, CoreError> {
    s.parse()
        .map_err(|_| CoreError::validation(format!("invalid {what}: {s:?}")))
}

fn parse_generic(rtype: RecordType, tokens: &[Token]) -> Result<Rdata, CoreError> {
    let len: usize = tokens
        .first()
        .map(Token::text)
        .ok_or_else(|| CoreError::validation("generic rdata is missing its length"))
        .and_then(|l| parse_field(&l, "generic rdata length"))?;
    let hex: String = tokens[1..].iter().map(Token::text).collect();
    let data: HexBlob = hex.parse()?;
    if data.len() != len {
        return Err(CoreError::validation(format!(
            "generic rdata declares {len} octets but carries {}",
            data.len()
        )));
    }
    Ok(Rdata::Unknown { rtype, data })
}

fn join_character_strings(tokens: &[Token]) -> String {
    let bytes: Vec<u8> = tokens
        .iter()
        .flat_map(|t| match t {
            Token::Quoted(b) => b.clone(),
            other => other.text().into_bytes(),
        })
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

// ── TXT segmentation ────────────────────────────────────────────────

/// Split a TXT payload into character strings of at most 255 octets.
///
/// The empty payload yields no segments.
pub fn txt_segments(payload: &str) -> Vec<&[u8]> {
    payload.as_bytes().chunks(TXT_SEGMENT_LEN).collect()
}

/// Join character strings back into a single payload.
pub fn join_txt_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments.iter().map(AsRef::as_ref).collect()
}

// ── Name helpers ────────────────────────────────────────────────────

/// Normalize a domain name to fully qualified form with a single trailing dot.
pub fn fqdn(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('.');
    format!("{trimmed}.")
}

/// Case-insensitive comparison of two names, ignoring the trailing dot.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// Label of `name` relative to `origin`: `""` for the apex, `None` when
/// `name` lies outside the zone.
pub fn relative_name(name: &str, origin: &str) -> Option<String> {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    let origin = origin.trim_end_matches('.').to_ascii_lowercase();
    if name == origin {
        return Some(String::new());
    }
    if origin.is_empty() {
        return Some(name);
    }
    name.strip_suffix(&origin)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .map(str::to_owned)
}

/// Absolute name of `subdomain` under `origin` (`@` and `""` mean the apex).
pub fn join_name(subdomain: &str, origin: &str) -> String {
    let origin = fqdn(origin);
    match subdomain.trim_end_matches('.') {
        "" | "@" => origin,
        sub if origin == "." => format!("{sub}."),
        sub => format!("{sub}.{origin}"),
    }
}

fn absolute_name(name: &str, origin: Option<&str>) -> String {
    if name == "@" {
        return origin.map_or_else(|| ".".into(), fqdn);
    }
    if name.ends_with('.') {
        return name.to_owned();
    }
    match origin {
        Some(origin) => join_name(name, origin),
        None => fqdn(name),
    }
}

// ── Record ──────────────────────────────────────────────────────────

/// A DNS resource record.
#[derive(Debug, Clone)]
pub struct Record {
    /// Fully qualified owner name.
    pub name: String,
    pub class: RecordClass,
    pub ttl: u32,
    pub rdata: Rdata,
}

impl Record {
    pub fn new(name: &str, ttl: u32, rdata: Rdata) -> Self {
        Self {
            name: fqdn(name),
            class: RecordClass::IN,
            ttl,
            rdata,
        }
    }

    pub fn rtype(&self) -> RecordType {
        self.rdata.rtype()
    }

    /// TXT or SPF payload, when this record carries one.
    pub fn txt_payload(&self) -> Option<&str> {
        match &self.rdata {
            Rdata::Txt(p) | Rdata::Spf(p) => Some(p),
            _ => None,
        }
    }

    /// Canonical one-line presentation used for equality and diffing.
    pub fn canonical(&self) -> String {
        let mut normalized = self.clone();
        normalized.name = normalized.name.to_ascii_lowercase();
        normalized.rdata.lowercase_names();
        normalized.to_string()
    }

    pub fn is_canonically_equal(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }

    /// Parse a record from already tokenized presentation text.
    ///
    /// `owner` and `ttl` are used when the line omits them.
    pub(crate) fn from_tokens(
        tokens: &[Token],
        origin: Option<&str>,
        default_owner: Option<&str>,
        default_ttl: u32,
    ) -> Result<Self, CoreError> {
        let mut idx = 0;
        let name = match default_owner {
            Some(owner) => owner.to_owned(),
            None => {
                let owner = tokens
                    .first()
                    .and_then(Token::as_word)
                    .ok_or_else(|| CoreError::validation("record has no owner name"))?;
                idx = 1;
                absolute_name(owner, origin)
            }
        };

        let mut ttl = None;
        let mut class = None;
        let rtype = loop {
            let word = tokens
                .get(idx)
                .and_then(Token::as_word)
                .ok_or_else(|| CoreError::validation("record has no type"))?;
            idx += 1;
            if ttl.is_none() {
                if let Ok(t) = word.parse::<u32>() {
                    ttl = Some(t);
                    continue;
                }
            }
            if class.is_none() {
                if let Ok(c) = word.parse::<RecordClass>() {
                    class = Some(c);
                    continue;
                }
            }
            break word.parse::<RecordType>()?;
        };

        let rdata = Rdata::parse(rtype, &tokens[idx..], origin)?;
        Ok(Self {
            name,
            class: class.unwrap_or(RecordClass::IN),
            ttl: ttl.unwrap_or(default_ttl),
            rdata,
        })
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.is_canonically_equal(other)
    }
}

impl Eq for Record {}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name,
            self.ttl,
            self.class,
            self.rtype(),
            self.rdata
        )
    }
}

impl FromStr for Record {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = presentation::tokenize(s)?;
        Self::from_tokens(&tokens, None, None, 0)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_type_mnemonics_round_trip() {
        assert_eq!(RecordType::CAA.to_string(), "CAA");
        assert_eq!("aaaa".parse::<RecordType>().unwrap(), RecordType::AAAA);
        assert_eq!(RecordType(65280).to_string(), "TYPE65280");
        assert_eq!("TYPE65280".parse::<RecordType>().unwrap(), RecordType(65280));
        assert!("BOGUS".parse::<RecordType>().is_err());
    }

    #[test]
    fn dnssec_maintenance_types() {
        let origin = "example.com.";
        assert!(RecordType::RRSIG.is_dnssec_maintenance("example.com.", origin));
        assert!(RecordType::NSEC3PARAM.is_dnssec_maintenance("example.com.", origin));
        assert!(RecordType::DS.is_dnssec_maintenance("Example.COM.", origin));
        assert!(!RecordType::DS.is_dnssec_maintenance("child.example.com.", origin));
        assert!(!RecordType::A.is_dnssec_maintenance("example.com.", origin));
    }

    #[test]
    fn txt_long_payload_splits_into_segments() {
        let payload = "a".repeat(700);
        let segments = txt_segments(&payload);
        let sizes: Vec<usize> = segments.iter().map(|s| s.len()).collect();
        assert_eq!(sizes, vec![255, 255, 190]);

        let record = Record::new("example.com.", 300, Rdata::Txt(payload.clone()));
        let reparsed: Record = record.to_string().parse().unwrap();
        assert_eq!(reparsed.txt_payload(), Some(payload.as_str()));
    }

    #[test]
    fn txt_segment_boundaries() {
        for (len, expected) in [(0, 0), (1, 1), (254, 1), (255, 1), (256, 2), (510, 2), (511, 3)] {
            let payload = "x".repeat(len);
            let segments = txt_segments(&payload);
            assert_eq!(segments.len(), expected, "payload of {len} octets");
            let joined: Vec<u8> = segments.concat();
            assert_eq!(joined, payload.as_bytes());
        }
    }

    #[test]
    fn spf_segments_are_joined() {
        let record: Record =
            r#"example.com. 3600 IN SPF "v=spf1 " "include:_spf.google.com " "~all""#
                .parse()
                .unwrap();
        assert_eq!(record.rtype(), RecordType::SPF);
        assert_eq!(
            record.txt_payload(),
            Some("v=spf1 include:_spf.google.com ~all")
        );
    }

    #[test]
    fn presentation_is_tab_separated() {
        let record = Record::new("www.example.com", 300, Rdata::A(Ipv4Addr::new(1, 2, 3, 4)));
        assert_eq!(record.to_string(), "www.example.com.\t300\tIN\tA\t1.2.3.4");
    }

    #[test]
    fn canonical_equality_ignores_name_case() {
        let a: Record = "WWW.Example.com. 300 IN CNAME Target.Example.net.".parse().unwrap();
        let b: Record = "www.example.com. 300 IN CNAME target.example.net.".parse().unwrap();
        assert_eq!(a, b);
        let c: Record = "www.example.com. 600 IN CNAME target.example.net.".parse().unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn parses_typed_rdata() {
        let mx: Record = "example.com. 300 IN MX 10 mail.example.com.".parse().unwrap();
        assert_eq!(
            mx.rdata,
            Rdata::Mx {
                preference: 10,
                exchange: "mail.example.com.".into()
            }
        );

        let caa: Record = r#"example.com. 300 IN CAA 0 issue "letsencrypt.org""#.parse().unwrap();
        assert_eq!(caa.to_string(), "example.com.\t300\tIN\tCAA\t0 issue \"letsencrypt.org\"");

        let soa: Record =
            "example.com. 3600 IN SOA ns1.example.com. hostmaster.example.com. 2024010101 7200 3600 1209600 300"
                .parse()
                .unwrap();
        let Rdata::Soa(soa) = soa.rdata else {
            panic!("expected SOA rdata");
        };
        assert_eq!(soa.serial, 2_024_010_101);
        assert_eq!(soa.minimum, 300);
    }

    #[test]
    fn unsupported_types_keep_their_text() {
        let rec: Record = "example.com. 300 IN DNSKEY 257 3 13 mdsswUyr3DPW132mOi8V9xESWE8jTo0d"
            .parse()
            .unwrap();
        assert_eq!(rec.rtype(), RecordType::DNSKEY);
        assert!(rec.to_string().ends_with("257 3 13 mdsswUyr3DPW132mOi8V9xESWE8jTo0d"));
    }

    #[test]
    fn generic_rdata_is_validated() {
        let rec: Record = r"example.com. 300 IN TYPE65280 \# 3 abcdef".parse().unwrap();
        assert_eq!(rec.rtype(), RecordType(65280));
        assert_eq!(rec.to_string(), "example.com.\t300\tIN\tTYPE65280\t\\# 3 abcdef");
        assert!(r"example.com. 300 IN TYPE65280 \# 4 abcdef".parse::<Record>().is_err());
    }

    #[test]
    fn name_helpers() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
        assert_eq!(relative_name("www.example.com.", "example.com."), Some("www".into()));
        assert_eq!(relative_name("example.com.", "example.com."), Some(String::new()));
        assert_eq!(relative_name("www.example.net.", "example.com."), None);
        assert_eq!(relative_name("badexample.com.", "example.com."), None);
        assert_eq!(join_name("@", "example.com."), "example.com.");
        assert_eq!(join_name("www", "example.com"), "www.example.com.");
    }

    #[test]
    fn records_serialize_as_presentation() {
        let record = Record::new("example.com.", 60, Rdata::Aaaa("2001:db8::1".parse().unwrap()));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, "\"example.com.\\t60\\tIN\\tAAAA\\t2001:db8::1\"");
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
