use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::ParseError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    TXT,
    NS,
    SPF,
    MX,
    SRV,
    TLSA,
    CAA,
    PTR,
    SOA,
}

/// Grammar class of a record type. Decides how many positional fields an
/// edit line carries before the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Simple,
    Prioritized,
    Pointer,
    /// Maintained by the engine itself, never edited by hand.
    Managed,
}

/// Positional fields between the type token and the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub optional_ttl: bool,
    pub priority: bool,
}

impl Arity {
    /// Fields after the type token when the optional ttl is omitted.
    pub fn required(&self) -> usize {
        1 + usize::from(self.priority)
    }

    /// Fields after the type token when every optional field is present.
    pub fn maximum(&self) -> usize {
        self.required() + usize::from(self.optional_ttl)
    }
}

const GRAMMAR: &[(TypeClass, Arity)] = &[
    (TypeClass::Simple, Arity { optional_ttl: true, priority: false }),
    (TypeClass::Prioritized, Arity { optional_ttl: true, priority: true }),
    (TypeClass::Pointer, Arity { optional_ttl: true, priority: false }),
];

impl TypeClass {
    /// Arity rule for this class, `None` when lines of this class cannot be
    /// entered at all.
    pub fn arity(self) -> Option<Arity> {
        GRAMMAR
            .iter()
            .find(|(class, _)| *class == self)
            .map(|(_, arity)| *arity)
    }
}

impl RecordType {
    pub const ALL: [RecordType; 12] = [
        RecordType::A,
        RecordType::AAAA,
        RecordType::CNAME,
        RecordType::TXT,
        RecordType::NS,
        RecordType::SPF,
        RecordType::MX,
        RecordType::SRV,
        RecordType::TLSA,
        RecordType::CAA,
        RecordType::PTR,
        RecordType::SOA,
    ];

    pub fn class(self) -> TypeClass {
        match self {
            RecordType::TXT
            | RecordType::A
            | RecordType::AAAA
            | RecordType::NS
            | RecordType::CNAME
            | RecordType::SPF => TypeClass::Simple,
            RecordType::MX | RecordType::SRV | RecordType::TLSA | RecordType::CAA => {
                TypeClass::Prioritized
            }
            RecordType::PTR => TypeClass::Pointer,
            RecordType::SOA => TypeClass::Managed,
        }
    }

    /// Address records get a reverse PTR twin.
    pub fn is_address(self) -> bool {
        matches!(self, RecordType::A | RecordType::AAAA)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::CNAME => "CNAME",
            RecordType::TXT => "TXT",
            RecordType::NS => "NS",
            RecordType::SPF => "SPF",
            RecordType::MX => "MX",
            RecordType::SRV => "SRV",
            RecordType::TLSA => "TLSA",
            RecordType::CAA => "CAA",
            RecordType::PTR => "PTR",
            RecordType::SOA => "SOA",
        }
    }
}

impl FromStr for RecordType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        RecordType::ALL
            .into_iter()
            .find(|rtype| rtype.as_str() == upper)
            .ok_or(ParseError::UnknownRecordType { value: s.to_string() })
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a stored row. Rows written by other tools may carry types that
/// cannot be edited here; those can still be matched and deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    Known(RecordType),
    Other(String),
}

impl RecordKind {
    /// Kind of a `type` column value, kept verbatim when unknown.
    pub fn from_stored(value: &str) -> Self {
        value
            .parse()
            .map(RecordKind::Known)
            .unwrap_or_else(|_| RecordKind::Other(value.to_string()))
    }

    pub fn known(&self) -> Option<RecordType> {
        match self {
            RecordKind::Known(rtype) => Some(*rtype),
            RecordKind::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecordKind::Known(rtype) => rtype.as_str(),
            RecordKind::Other(value) => value,
        }
    }
}

impl From<RecordType> for RecordKind {
    fn from(rtype: RecordType) -> Self {
        RecordKind::Known(rtype)
    }
}

impl PartialEq<RecordType> for RecordKind {
    fn eq(&self, other: &RecordType) -> bool {
        self.known() == Some(*other)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Helper functions for PTR owner names
pub fn ipv4_to_ptr_name(ip: Ipv4Addr) -> String {
    let octets = ip.octets();
    format!("{}.{}.{}.{}.in-addr.arpa", octets[3], octets[2], octets[1], octets[0])
}

pub fn ipv6_to_ptr_name(ip: Ipv6Addr) -> String {
    let full_hex: String = ip
        .segments()
        .iter()
        .map(|segment| format!("{:04x}", segment))
        .collect();

    let reversed = full_hex
        .chars()
        .rev()
        .map(String::from)
        .collect::<Vec<_>>()
        .join(".");

    format!("{}.ip6.arpa", reversed)
}

/// Parse an address literal and derive its reverse owner name. A colon
/// selects the IPv6 family.
pub fn reverse_name(ip: &str) -> Result<String, ParseError> {
    let ip = ip.trim();
    if ip.contains(':') {
        let addr = Ipv6Addr::from_str(ip).map_err(ParseError::ipv6)?;
        Ok(ipv6_to_ptr_name(addr))
    } else {
        let addr = Ipv4Addr::from_str(ip).map_err(ParseError::ipv4)?;
        Ok(ipv4_to_ptr_name(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_to_ptr() {
        let ip = Ipv4Addr::new(192, 168, 1, 100);
        assert_eq!(ipv4_to_ptr_name(ip), "100.1.168.192.in-addr.arpa");
    }

    #[test]
    fn test_ipv6_to_ptr() {
        let ip: Ipv6Addr = "2001:db8::1".parse().unwrap();
        assert_eq!(
            ipv6_to_ptr_name(ip),
            "1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa"
        );
    }

    #[test]
    fn test_reverse_name_reports_family() {
        assert!(matches!(reverse_name("999.0.0.1"), Err(ParseError::InvalidIpv4 { .. })));
        assert!(matches!(reverse_name("2001:db8::zz"), Err(ParseError::InvalidIpv6 { .. })));
        assert_eq!(reverse_name("10.0.0.5").unwrap(), "5.0.0.10.in-addr.arpa");
    }

    #[test]
    fn test_type_classes() {
        assert_eq!(RecordType::TXT.class(), TypeClass::Simple);
        assert_eq!(RecordType::CAA.class(), TypeClass::Prioritized);
        assert_eq!(RecordType::PTR.class(), TypeClass::Pointer);
        assert_eq!(TypeClass::Managed.arity(), None);

        let prioritized = TypeClass::Prioritized.arity().unwrap();
        assert_eq!(prioritized.required(), 2);
        assert_eq!(prioritized.maximum(), 3);
    }

    #[test]
    fn test_record_type_from_str() {
        assert_eq!("aaaa".parse::<RecordType>().unwrap(), RecordType::AAAA);
        assert_eq!(" Mx ".parse::<RecordType>().unwrap(), RecordType::MX);
        assert!("HINFO".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_record_kind_keeps_unknown_types() {
        assert_eq!(RecordKind::from_stored("MX"), RecordType::MX);
        let kind = RecordKind::from_stored("HINFO");
        assert_eq!(kind, RecordKind::Other("HINFO".to_string()));
        assert_eq!(kind.known(), None);
        assert_eq!(kind.to_string(), "HINFO");
    }
}
