//! Serde adapters for JSON-RPC quantities (`"0x"`-prefixed minimal hex).
//!
//! Use with `#[serde(default, with = "...")]` on `Option` fields so a missing
//! or `null` value deserializes to `None`.

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serializer};

use crate::units::{parse_quantity, to_hex_quantity};

pub mod u64_opt {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&to_hex_quantity(U256::from(*v))),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        super::u256_opt::deserialize(deserializer)?
            .map(|v| u64::try_from(v).map_err(|_| <D::Error as serde::de::Error>::custom("quantity exceeds u64")))
            .transpose()
    }
}

pub mod u128_opt {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&to_hex_quantity(U256::from(*v))),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u128>, D::Error> {
        super::u256_opt::deserialize(deserializer)?
            .map(|v| u128::try_from(v).map_err(|_| <D::Error as serde::de::Error>::custom("quantity exceeds u128")))
            .transpose()
    }
}

pub mod u256_opt {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&to_hex_quantity(*v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| parse_quantity(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

pub mod u256 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex_quantity(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_quantity(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(default, with = "super::u64_opt", skip_serializing_if = "Option::is_none")]
        gas: Option<u64>,
        #[serde(with = "super::u256")]
        value: alloy_primitives::U256,
    }

    #[test]
    fn quantities_round_trip_as_hex() {
        let sample = Sample {
            gas: Some(21_000),
            value: alloy_primitives::U256::ZERO,
        };
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json, serde_json::json!({"gas": "0x5208", "value": "0x0"}));
        assert_eq!(serde_json::from_value::<Sample>(json).unwrap(), sample);
    }

    #[test]
    fn missing_and_null_are_none() {
        let a: Sample = serde_json::from_str(r#"{"value":"0x1"}"#).unwrap();
        let b: Sample = serde_json::from_str(r#"{"gas":null,"value":"0x1"}"#).unwrap();
        assert_eq!(a.gas, None);
        assert_eq!(b.gas, None);
    }

    #[test]
    fn oversized_u64_is_rejected() {
        let err = serde_json::from_str::<Sample>(r#"{"gas":"0x10000000000000000","value":"0x0"}"#);
        assert!(err.is_err());
    }
}
