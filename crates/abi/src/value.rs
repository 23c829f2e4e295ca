//! The value module holds the [Kind] and [Value] types that the codec and the
//! descriptors are built from.

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// The [Kind] enum names one ABI primitive kind together with the data needed
/// to render its canonical type string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    /// An unsigned integer of the given bit width (8..=256, multiple of 8).
    Uint(usize),
    /// A 20-byte account or contract address.
    Address,
    /// A boolean.
    Bool,
    /// A fixed-size byte array of the given length (1..=32).
    FixedBytes(usize),
    /// A dynamically sized byte array.
    Bytes,
    /// A dynamically sized UTF-8 string.
    String,
}

impl Kind {
    /// Returns the canonical ABI type string used in signatures, e.g.
    /// `uint256`, `address`, `bytes32`, `bytes`.
    pub fn canonical(&self) -> String {
        match self {
            Kind::Uint(bits) => format!("uint{bits}"),
            Kind::Address => "address".to_string(),
            Kind::Bool => "bool".to_string(),
            Kind::FixedBytes(len) => format!("bytes{len}"),
            Kind::Bytes => "bytes".to_string(),
            Kind::String => "string".to_string(),
        }
    }

    /// Whether values of this kind are encoded in the tail region behind an
    /// offset slot rather than inline in the head.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Kind::Bytes | Kind::String)
    }

    /// Whether the kind's parameters are within the ranges the ABI format
    /// defines. Checked by the descriptor constructors.
    pub(crate) fn is_well_formed(&self) -> bool {
        match self {
            Kind::Uint(bits) => *bits >= 8 && *bits <= 256 && bits % 8 == 0,
            Kind::FixedBytes(len) => *len >= 1 && *len <= 32,
            _ => true,
        }
    }
}

/// The [Value] enum is the tagged union over all supported ABI primitive
/// kinds. Integers are carried as [U256] regardless of declared width, so a
/// 256-bit value never gets silently truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Uint(U256),
    Address(Address),
    Bool(bool),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
}

impl Value {
    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Uint(_) => "uint",
            Value::Address(_) => "address",
            Value::Bool(_) => "bool",
            Value::FixedBytes(_) => "fixed bytes",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
        }
    }

    /// Whether this value is encoded in the tail region.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Value::Bytes(_) | Value::String(_))
    }

    /// Whether this value can be encoded as the given [Kind], including the
    /// width check for integers and the length check for fixed byte arrays.
    pub fn conforms_to(&self, kind: &Kind) -> bool {
        match (self, kind) {
            (Value::Uint(v), Kind::Uint(bits)) => v.bits() <= *bits,
            (Value::Address(_), Kind::Address) => true,
            (Value::Bool(_), Kind::Bool) => true,
            (Value::FixedBytes(b), Kind::FixedBytes(len)) => b.len() == *len,
            (Value::Bytes(_), Kind::Bytes) => true,
            (Value::String(_), Kind::String) => true,
            _ => false,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::FixedBytes(b) | Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Value::FixedBytes(b) | Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// The [NamedValues] struct is an order-preserving sequence of named values,
/// produced when decoding multi-value outputs and event logs. Consumers look
/// fields up by name so a descriptor reordering cannot silently shift the
/// meaning of a positional access.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamedValues {
    entries: Vec<(String, Value)>,
}

impl NamedValues {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    /// Looks a value up by field name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterates the fields in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonical_type_strings() {
        assert_eq!(Kind::Uint(256).canonical(), "uint256");
        assert_eq!(Kind::Uint(8).canonical(), "uint8");
        assert_eq!(Kind::Address.canonical(), "address");
        assert_eq!(Kind::Bool.canonical(), "bool");
        assert_eq!(Kind::FixedBytes(32).canonical(), "bytes32");
        assert_eq!(Kind::Bytes.canonical(), "bytes");
        assert_eq!(Kind::String.canonical(), "string");
    }

    #[test]
    fn kind_well_formedness() {
        assert!(Kind::Uint(256).is_well_formed());
        assert!(!Kind::Uint(7).is_well_formed());
        assert!(!Kind::Uint(264).is_well_formed());
        assert!(Kind::FixedBytes(1).is_well_formed());
        assert!(!Kind::FixedBytes(0).is_well_formed());
        assert!(!Kind::FixedBytes(33).is_well_formed());
    }

    #[test]
    fn uint_width_conformance() {
        let small = Value::Uint(U256::from(255u8));
        let big = Value::Uint(U256::from(256u16));
        assert!(small.conforms_to(&Kind::Uint(8)));
        assert!(!big.conforms_to(&Kind::Uint(8)));
        assert!(big.conforms_to(&Kind::Uint(16)));
        assert!(Value::Uint(U256::MAX).conforms_to(&Kind::Uint(256)));
    }

    #[test]
    fn named_values_by_name() {
        let values = NamedValues::new(vec![
            ("amountPerUnit".to_string(), Value::Uint(U256::from(5u8))),
            ("defined".to_string(), Value::Bool(true)),
        ]);
        assert_eq!(values.get("defined"), Some(&Value::Bool(true)));
        assert_eq!(values.get("missing"), None);
        assert_eq!(values.len(), 2);
    }
}
