//! Registry key under which a background server is tracked.

use super::DomainError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Sentinel spelling of the default registry key.
const DEFAULT_KEY: &str = "default";

/// Identity under which a background server is tracked in the registry.
///
/// Either the `default` sentinel or an explicit TCP port. A key of
/// `Port(0)` requests ephemeral allocation; the port the operating system
/// assigns becomes the effective key after bind (see the launch facade).
/// The key is not validated against the OS socket: the default key always
/// maps to an ephemerally allocated port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ServerKey {
    /// The shared default server.
    #[default]
    Default,
    /// An explicit TCP port.
    Port(u16),
}

impl ServerKey {
    /// Returns whether this is the protected default key.
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }

    /// Returns the port this key requests at bind time.
    ///
    /// The default key requests ephemeral allocation (port 0).
    #[must_use]
    pub const fn requested_port(self) -> u16 {
        match self {
            Self::Default => 0,
            Self::Port(port) => port,
        }
    }
}

impl From<u16> for ServerKey {
    fn from(port: u16) -> Self {
        Self::Port(port)
    }
}

impl fmt::Display for ServerKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => formatter.write_str(DEFAULT_KEY),
            Self::Port(port) => write!(formatter, "{port}"),
        }
    }
}

impl FromStr for ServerKey {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if normalized.eq_ignore_ascii_case(DEFAULT_KEY) {
            return Ok(Self::Default);
        }
        normalized
            .parse::<u16>()
            .map(Self::Port)
            .map_err(|_| DomainError::InvalidPort(value.to_owned()))
    }
}

impl Serialize for ServerKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Default => serializer.serialize_str(DEFAULT_KEY),
            Self::Port(port) => serializer.serialize_u16(*port),
        }
    }
}

struct ServerKeyVisitor;

impl Visitor<'_> for ServerKeyVisitor {
    type Value = ServerKey;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("\"default\" or a TCP port in 0..=65535")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        u16::try_from(value)
            .map(ServerKey::Port)
            .map_err(|_| de::Error::custom(DomainError::InvalidPort(value.to_string())))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        u16::try_from(value)
            .map(ServerKey::Port)
            .map_err(|_| de::Error::custom(DomainError::InvalidPort(value.to_string())))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        ServerKey::from_str(value).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for ServerKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ServerKeyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("default", ServerKey::Default)]
    #[case("Default", ServerKey::Default)]
    #[case(" default ", ServerKey::Default)]
    #[case("0", ServerKey::Port(0))]
    #[case("8080", ServerKey::Port(8080))]
    #[case("65535", ServerKey::Port(65535))]
    fn parses_valid_keys(#[case] input: &str, #[case] expected: ServerKey) {
        assert_eq!(input.parse::<ServerKey>().expect("key should parse"), expected);
    }

    #[rstest]
    #[case("foo")]
    #[case("")]
    #[case("-1")]
    #[case("65536")]
    #[case("80.0")]
    fn rejects_invalid_keys(#[case] input: &str) {
        assert!(matches!(
            input.parse::<ServerKey>(),
            Err(DomainError::InvalidPort(_))
        ));
    }

    #[test]
    fn displays_canonical_forms() {
        assert_eq!(ServerKey::Default.to_string(), "default");
        assert_eq!(ServerKey::Port(8080).to_string(), "8080");
    }

    #[test]
    fn default_key_requests_ephemeral_port() {
        assert_eq!(ServerKey::Default.requested_port(), 0);
        assert_eq!(ServerKey::Port(9000).requested_port(), 9000);
    }

    #[test]
    fn serialises_as_configuration_values() {
        assert_eq!(
            serde_json::to_value(ServerKey::Default).expect("serialisable"),
            json!("default")
        );
        assert_eq!(
            serde_json::to_value(ServerKey::Port(8080)).expect("serialisable"),
            json!(8080)
        );
    }

    #[rstest]
    #[case(json!("default"), ServerKey::Default)]
    #[case(json!(8080), ServerKey::Port(8080))]
    #[case(json!(0), ServerKey::Port(0))]
    fn deserialises_configuration_values(
        #[case] input: serde_json::Value,
        #[case] expected: ServerKey,
    ) {
        let key: ServerKey = serde_json::from_value(input).expect("key should deserialise");
        assert_eq!(key, expected);
    }

    #[rstest]
    #[case(json!("foo"))]
    #[case(json!(-1))]
    #[case(json!(70000))]
    #[case(json!(true))]
    fn rejects_invalid_configuration_values(#[case] input: serde_json::Value) {
        assert!(serde_json::from_value::<ServerKey>(input).is_err());
    }
}
