//! Field element encodings: canonical bytes, hex, and serde adapters.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use ark_serialize::CanonicalDeserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldDecodeError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("expected 32 bytes, got {0}")]
    Length(usize),

    #[error("value is not a canonical field element")]
    NonCanonical,
}

/// Reduce arbitrary bytes (little-endian) into the field
pub fn bytes_to_field(data: &[u8]) -> Fr {
    Fr::from_le_bytes_mod_order(data)
}

/// Canonical 32-byte little-endian encoding
pub fn field_to_bytes(element: &Fr) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    let repr = element.into_bigint().to_bytes_le();
    bytes[..repr.len()].copy_from_slice(&repr);
    bytes
}

/// Decode a canonical encoding; values >= r are rejected rather than reduced
pub fn field_from_bytes(bytes: &[u8; 32]) -> Result<Fr, FieldDecodeError> {
    Fr::deserialize_compressed(&bytes[..]).map_err(|_| FieldDecodeError::NonCanonical)
}

/// Value of a field element that fits in 64 bits
pub fn field_to_u64(element: &Fr) -> Option<u64> {
    let bytes = field_to_bytes(element);
    if bytes[8..].iter().any(|b| *b != 0) {
        return None;
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(low))
}

pub fn field_to_hex(element: &Fr) -> String {
    hex::encode(field_to_bytes(element))
}

pub fn field_from_hex(s: &str) -> Result<Fr, FieldDecodeError> {
    let raw = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| FieldDecodeError::Hex(e.to_string()))?;
    let bytes: [u8; 32] = raw
        .as_slice()
        .try_into()
        .map_err(|_| FieldDecodeError::Length(raw.len()))?;
    field_from_bytes(&bytes)
}

/// `#[serde(with = "coinsensus_hash::field::serde_fr")]`
pub mod serde_fr {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Fr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&field_to_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fr, D::Error> {
        let s = String::deserialize(deserializer)?;
        field_from_hex(&s).map_err(de::Error::custom)
    }
}

/// `#[serde(with = "coinsensus_hash::field::serde_fr_vec")]`
pub mod serde_fr_vec {
    use super::*;
    use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[Fr], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&field_to_hex(value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Fr>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| field_from_hex(s).map_err(de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Wrapper {
        #[serde(with = "serde_fr")]
        one: Fr,
        #[serde(with = "serde_fr_vec")]
        many: Vec<Fr>,
    }

    #[test]
    fn test_bytes_roundtrip() {
        let x = Fr::from(0xdead_beef_u64);
        assert_eq!(field_from_bytes(&field_to_bytes(&x)).unwrap(), x);
    }

    #[test]
    fn test_small_values() {
        assert_eq!(field_to_u64(&Fr::from(u64::MAX)), Some(u64::MAX));
        assert_eq!(field_to_u64(&Fr::from(0u64)), Some(0));
        assert_eq!(field_to_u64(&-Fr::from(1u64)), None);
    }

    #[test]
    fn test_non_canonical_rejected() {
        assert_eq!(field_from_bytes(&[0xff; 32]), Err(FieldDecodeError::NonCanonical));
    }

    #[test]
    fn test_hex_errors() {
        assert!(matches!(field_from_hex("zz"), Err(FieldDecodeError::Hex(_))));
        assert_eq!(field_from_hex("00"), Err(FieldDecodeError::Length(1)));
    }

    #[test]
    fn test_hex_accepts_prefix() {
        let x = Fr::from(77u64);
        let encoded = format!("0x{}", field_to_hex(&x));
        assert_eq!(field_from_hex(&encoded).unwrap(), x);
    }

    #[test]
    fn test_serde_adapters() {
        let w = Wrapper {
            one: Fr::from(5u64),
            many: vec![Fr::from(1u64), Fr::from(2u64)],
        };
        let json = serde_json::to_string(&w).unwrap();
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
    }
}
