//! Port declarations.
//!
//! A manifest may declare a port three ways:
//!
//! ```yaml
//! port: 80
//! port: "80:tcp"
//! port: {80: ["type:tcp"]}
//! ```
//!
//! or a list of any of these. The parser inspects the document value's
//! shape once and dispatches to one fixed rule per shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{raw_snippet, ManifestError, ManifestResult};

/// Transport protocol of a declared port.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "tcp" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One canonical (port, protocol) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortSpec {
    pub port: u16,
    pub protocol: Protocol,
}

impl Default for PortSpec {
    fn default() -> Self {
        Self {
            port: 80,
            protocol: Protocol::Tcp,
        }
    }
}

impl PortSpec {
    pub fn new(port: u16, protocol: Protocol) -> Self {
        Self { port, protocol }
    }

    /// Parse a single port descriptor.
    pub fn parse(value: &Value) -> ManifestResult<Self> {
        match value {
            Value::Number(n) => {
                let port = n
                    .as_u64()
                    .and_then(|p| u16::try_from(p).ok())
                    .ok_or_else(|| unsupported(value))?;
                Ok(Self::new(port, Protocol::Tcp))
            }
            Value::String(s) => {
                let parts: Vec<&str> = s.split(':').collect();
                if parts.len() != 2 {
                    return Err(unsupported(value));
                }
                let port = parts[0].parse::<u16>().map_err(|_| unsupported(value))?;
                let protocol = Protocol::from_str(parts[1]).ok_or_else(|| unsupported(value))?;
                Ok(Self::new(port, protocol))
            }
            Value::Mapping(m) => {
                if m.len() != 1 {
                    return Err(unsupported(value));
                }
                let (key, attrs) = m.iter().next().ok_or_else(|| unsupported(value))?;
                let port = key
                    .as_u64()
                    .and_then(|p| u16::try_from(p).ok())
                    .ok_or_else(|| unsupported(value))?;
                let first = attrs
                    .as_sequence()
                    .and_then(|seq| seq.first())
                    .and_then(Value::as_str)
                    .ok_or_else(|| unsupported(value))?;
                let parts: Vec<&str> = first.split(':').collect();
                if parts.len() != 2 || parts[0] != "type" {
                    return Err(unsupported(value));
                }
                let protocol = Protocol::from_str(parts[1]).ok_or_else(|| unsupported(value))?;
                Ok(Self::new(port, protocol))
            }
            _ => Err(unsupported(value)),
        }
    }

    /// Parse a port field: a single descriptor or a list of descriptors.
    /// Later descriptors for the same port number overwrite earlier ones.
    pub fn parse_many(value: &Value) -> ManifestResult<BTreeMap<u16, PortSpec>> {
        let mut ports = BTreeMap::new();
        match value.as_sequence() {
            Some(seq) => {
                for entry in seq {
                    let spec = Self::parse(entry)?;
                    ports.insert(spec.port, spec);
                }
            }
            None => {
                let spec = Self::parse(value)?;
                ports.insert(spec.port, spec);
            }
        }
        Ok(ports)
    }
}

fn unsupported(value: &Value) -> ManifestError {
    ManifestError::UnsupportedPortDescriptor(raw_snippet(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ManifestResult<PortSpec> {
        PortSpec::parse(&serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_bare_integer() {
        let spec = parse("8080").unwrap();
        assert_eq!(spec.port, 8080);
        assert_eq!(spec.protocol, Protocol::Tcp);
    }

    #[test]
    fn test_port_proto_string() {
        let spec = parse("\"53:udp\"").unwrap();
        assert_eq!(spec.port, 53);
        assert_eq!(spec.protocol, Protocol::Udp);
    }

    #[test]
    fn test_structured_form() {
        let spec = parse("{8000: [\"type:tcp\"]}").unwrap();
        assert_eq!(spec.port, 8000);
        assert_eq!(spec.protocol, Protocol::Tcp);
    }

    #[test]
    fn test_malformed_descriptors() {
        assert!(matches!(
            parse("\"80\""),
            Err(ManifestError::UnsupportedPortDescriptor(_))
        ));
        assert!(matches!(
            parse("\"80:tcp:extra\""),
            Err(ManifestError::UnsupportedPortDescriptor(_))
        ));
        assert!(matches!(
            parse("\"80:sctp\""),
            Err(ManifestError::UnsupportedPortDescriptor(_))
        ));
        assert!(matches!(
            parse("[80]"),
            Err(ManifestError::UnsupportedPortDescriptor(_))
        ));
        assert!(matches!(
            parse("true"),
            Err(ManifestError::UnsupportedPortDescriptor(_))
        ));
    }

    #[test]
    fn test_parse_idempotent_under_reserialization() {
        for yaml in ["80", "\"53:udp\"", "{8000: [\"type:tcp\"]}"] {
            let first = parse(yaml).unwrap();
            let reserialized = serde_yaml::to_string(&first).unwrap();
            let second: PortSpec = serde_yaml::from_str(&reserialized).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_parse_many_list_and_overwrite() {
        let value: Value = serde_yaml::from_str("[80, \"53:udp\", \"80:udp\"]").unwrap();
        let ports = PortSpec::parse_many(&value).unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[&80].protocol, Protocol::Udp);
        assert_eq!(ports[&53].protocol, Protocol::Udp);
    }

    #[test]
    fn test_parse_many_scalar() {
        let value: Value = serde_yaml::from_str("9000").unwrap();
        let ports = PortSpec::parse_many(&value).unwrap();
        assert_eq!(ports[&9000], PortSpec::new(9000, Protocol::Tcp));
    }
}
