use super::types::PinStatusCode;
use serde::{de, Deserialize, Deserializer};

/// Variant identifier as it appears on the wire, e.g. `SIM PIN`.
struct Code(PinStatusCode);

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CodeVisitor;

        impl<'de> de::Visitor<'de> for CodeVisitor {
            type Value = Code;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("a +CPIN status code")
            }

            fn visit_bytes<E>(self, value: &[u8]) -> core::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                core::str::from_utf8(value)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .map(Code)
                    .ok_or_else(|| {
                        let value =
                            core::str::from_utf8(value).unwrap_or("\u{fffd}\u{fffd}\u{fffd}");
                        de::Error::unknown_variant(value, VARIANTS)
                    })
            }

            fn visit_str<E>(self, value: &str) -> core::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                self.visit_bytes(value.as_bytes())
            }
        }

        deserializer.deserialize_identifier(CodeVisitor)
    }
}

const VARIANTS: &[&str] = &[
    "READY",
    "SIM PIN",
    "SIM PUK",
    "SIM PIN2",
    "SIM PUK2",
    "PH-NET PIN",
    "PH-NETSUB PIN",
    "PH-SP PIN",
    "PH-CORP PIN",
    "PH-SIM PIN",
];

impl<'de> Deserialize<'de> for PinStatusCode {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = PinStatusCode;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("enum PinStatusCode")
            }

            fn visit_enum<A>(self, data: A) -> core::result::Result<Self::Value, A::Error>
            where
                A: de::EnumAccess<'de>,
            {
                let (Code(code), _) = de::EnumAccess::variant(data)?;
                Ok(code)
            }
        }

        deserializer.deserialize_enum("PinStatusCode", VARIANTS, Visitor)
    }
}
