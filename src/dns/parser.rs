// Record line grammar: key type [ttl] [priority] value
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use crate::dns::record_types::{RecordType, TypeClass};
use crate::dns::zone::Zone;
use crate::error::{EngineError, ParseError, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub key: String,
    pub rtype: RecordType,
    pub value: String,
    pub ttl: Option<u32>,
    pub priority: Option<u16>,
}

/// Split on whitespace runs at most `max_splits` times. The last piece keeps
/// its inner whitespace.
pub fn split_fields(line: &str, max_splits: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max_splits + 1);
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        if fields.len() == max_splits {
            fields.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }

    fields
}

pub fn parse_ttl(value: &str) -> Result<u32, ParseError> {
    match value.parse::<u32>() {
        Ok(ttl) if ttl > 0 && ttl < 65535 => Ok(ttl),
        _ => Err(ParseError::InvalidTtl { value: value.to_string() }),
    }
}

pub fn parse_priority(value: &str) -> Result<u16, ParseError> {
    value
        .parse::<u16>()
        .map_err(|_| ParseError::InvalidPriority { value: value.to_string() })
}

/// Parse one edit line against the selected zone.
pub fn parse_record(line: &str, zone: Option<&Zone>) -> Result<ParsedRecord, EngineError> {
    let line = line.trim();
    let cannot_parse = || ParseError::CannotParse { line: line.to_string() };

    let head = split_fields(line, 2);
    if head.len() < 3 {
        return Err(cannot_parse().into());
    }
    let key = head[0].to_lowercase();
    let rtype = RecordType::from_str(head[1]).map_err(|_| cannot_parse())?;
    let class = rtype.class();
    let arity = class.arity().ok_or_else(cannot_parse)?;

    let fields = split_fields(line, 2 + arity.maximum() - 1);
    let mut rest = match fields.len() - 2 {
        n if n == arity.maximum() || n == arity.required() => &fields[2..],
        _ => return Err(cannot_parse().into()),
    };

    let mut ttl = None;
    if arity.optional_ttl && rest.len() == arity.maximum() {
        ttl = Some(parse_ttl(rest[0])?);
        rest = &rest[1..];
    }

    let mut priority = None;
    if arity.priority {
        priority = Some(parse_priority(rest[0])?);
        rest = &rest[1..];
    }

    let mut value = rest[0].to_string();
    if class == TypeClass::Pointer && !value.ends_with('.') {
        value.push('.');
    }

    if zone.is_none() {
        return Err(ValidationError::NoZoneSelected.into());
    }

    match rtype {
        RecordType::A => {
            Ipv4Addr::from_str(&value).map_err(ParseError::ipv4)?;
        }
        RecordType::AAAA => {
            Ipv6Addr::from_str(&value).map_err(ParseError::ipv6)?;
        }
        _ => {}
    }

    Ok(ParsedRecord {
        key,
        rtype,
        value: value.to_lowercase(),
        ttl,
        priority,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> Zone {
        Zone::new("example.com")
    }

    fn parse(line: &str) -> Result<ParsedRecord, EngineError> {
        parse_record(line, Some(&zone()))
    }

    #[test]
    fn test_split_fields_keeps_remainder() {
        assert_eq!(split_fields("  a  b c d ", 2), vec!["a", "b", "c d "]);
        assert_eq!(split_fields("a b", 5), vec!["a", "b"]);
        assert!(split_fields("   ", 3).is_empty());
    }

    #[test]
    fn test_simple_with_and_without_ttl() {
        let parsed = parse("www A 300 10.0.0.1").unwrap();
        assert_eq!(
            parsed,
            ParsedRecord {
                key: "www".to_string(),
                rtype: RecordType::A,
                value: "10.0.0.1".to_string(),
                ttl: Some(300),
                priority: None,
            }
        );

        let parsed = parse("www a 10.0.0.1").unwrap();
        assert_eq!(parsed.rtype, RecordType::A);
        assert_eq!(parsed.ttl, None);
    }

    #[test]
    fn test_prioritized() {
        let parsed = parse("@ MX 10 Mail.Example.com").unwrap();
        assert_eq!(parsed.key, "@");
        assert_eq!(parsed.priority, Some(10));
        assert_eq!(parsed.ttl, None);
        assert_eq!(parsed.value, "mail.example.com");

        let parsed = parse("_sip._tcp SRV 600 10 5 5060 sip.example.com").unwrap();
        assert_eq!(parsed.ttl, Some(600));
        assert_eq!(parsed.priority, Some(10));
        assert_eq!(parsed.value, "5 5060 sip.example.com");

        assert!(matches!(parse("@ MX mail.example.com backup"), Err(EngineError::Parse(ParseError::InvalidPriority { .. }))));
    }

    #[test]
    fn test_txt_value_keeps_spaces_after_ttl() {
        let parsed = parse("@ TXT 300 v=spf1 -all").unwrap();
        assert_eq!(parsed.ttl, Some(300));
        assert_eq!(parsed.value, "v=spf1 -all");
    }

    #[test]
    fn test_pointer_gets_trailing_dot() {
        let parsed = parse("5 PTR Host.Example.com").unwrap();
        assert_eq!(parsed.value, "host.example.com.");
        let parsed = parse("5 PTR host.example.com.").unwrap();
        assert_eq!(parsed.value, "host.example.com.");
    }

    #[test]
    fn test_bad_fields() {
        assert_eq!(
            parse("www A 0 10.0.0.1").unwrap_err().to_string(),
            "Invalid ttl 0"
        );
        assert_eq!(
            parse("www A 65535 10.0.0.1").unwrap_err().to_string(),
            "Invalid ttl 65535"
        );
        assert_eq!(
            parse("@ MX 65536 mail").unwrap_err().to_string(),
            "Invalid priority 65536"
        );
        assert!(parse("@ MX 0 mail").is_ok());
    }

    #[test]
    fn test_address_validation() {
        let err = parse("www A 999.0.0.1").unwrap_err();
        assert!(matches!(err, EngineError::Parse(ParseError::InvalidIpv4 { .. })));
        assert!(err.to_string().starts_with("Invalid IPv4 address: "));

        let err = parse("www AAAA 10.0.0.1").unwrap_err();
        assert!(matches!(err, EngineError::Parse(ParseError::InvalidIpv6 { .. })));

        assert_eq!(parse("www AAAA 2001:DB8::1").unwrap().value, "2001:db8::1");
    }

    #[test]
    fn test_unparseable_lines() {
        assert!(matches!(parse("www A"), Err(EngineError::Parse(ParseError::CannotParse { .. }))));
        assert!(matches!(parse("www HINFO x y"), Err(EngineError::Parse(ParseError::CannotParse { .. }))));
        assert!(matches!(parse("@ SOA a b c"), Err(EngineError::Parse(ParseError::CannotParse { .. }))));
        assert!(matches!(parse("@ MX mail.example.com"), Err(EngineError::Parse(ParseError::CannotParse { .. }))));
        assert!(matches!(parse("www A abc 10.0.0.1"), Err(EngineError::Parse(ParseError::InvalidTtl { .. }))));
    }

    #[test]
    fn test_requires_selected_zone() {
        let err = parse_record("www A 10.0.0.1", None).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::NoZoneSelected)));
        assert_eq!(err.to_string(), "Select domain first!");
    }
}
