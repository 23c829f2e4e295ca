//! The function module holds the [FunctionDescriptor] type: one immutable
//! value per contract method, associating the method name and its ordered
//! input/output parameters with the 4-byte selector derived from the
//! canonical signature.

use crate::codec;
use crate::error::{AbiError, Result};
use crate::value::{Kind, NamedValues, Value};
use ethers::utils::{hex, keccak256};
use std::sync::OnceLock;

/// A named, typed parameter. Parameter names never contribute to the
/// signature; only the canonical type strings do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: Kind,
}

impl Param {
    pub fn new(name: &str, kind: Kind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// The shape of a method's return data: nothing, one value, or an ordered
/// sequence of named fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputShape {
    None,
    Single(Kind),
    Multi(Vec<Param>),
}

/// The result of a read-only call, shaped by the descriptor's [OutputShape].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedOutput {
    None,
    Single(Value),
    Multi(NamedValues),
}

impl DecodedOutput {
    pub fn single(self) -> Option<Value> {
        match self {
            DecodedOutput::Single(v) => Some(v),
            _ => None,
        }
    }

    pub fn multi(self) -> Option<NamedValues> {
        match self {
            DecodedOutput::Multi(v) => Some(v),
            _ => None,
        }
    }
}

/// The [FunctionDescriptor] struct describes one contract method. Descriptors
/// are built once, validated at construction, and shared read-only across
/// calls; the selector is derived from the signature on first use and only
/// ever cached, never stored somewhere it could drift from the signature.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    name: String,
    inputs: Vec<Param>,
    output: OutputShape,
    selector: OnceLock<[u8; 4]>,
}

impl FunctionDescriptor {
    /// Creates a descriptor after validating every declared kind.
    ///
    /// Panics on malformed kinds (an out-of-range integer width or fixed-bytes
    /// length) or an empty multi-value output: descriptors are static program
    /// data, and a bad declaration is a bug in the method catalog, not a
    /// runtime condition.
    pub fn new(name: &str, inputs: Vec<Param>, output: OutputShape) -> Self {
        for param in &inputs {
            assert!(
                param.kind.is_well_formed(),
                "input `{}` of `{}` declares invalid kind {}",
                param.name,
                name,
                param.kind.canonical()
            );
        }
        match &output {
            OutputShape::None => {}
            OutputShape::Single(kind) => {
                assert!(
                    kind.is_well_formed(),
                    "output of `{}` declares invalid kind {}",
                    name,
                    kind.canonical()
                );
            }
            OutputShape::Multi(fields) => {
                assert!(!fields.is_empty(), "multi-value output of `{name}` is empty");
                for field in fields {
                    assert!(
                        field.kind.is_well_formed(),
                        "output field `{}` of `{}` declares invalid kind {}",
                        field.name,
                        name,
                        field.kind.canonical()
                    );
                }
            }
        }
        Self {
            name: name.to_string(),
            inputs,
            output,
            selector: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Param] {
        &self.inputs
    }

    pub fn output(&self) -> &OutputShape {
        &self.output
    }

    /// The canonical signature, e.g. `bridgedResourceTypes(uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.kind.canonical()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// The 4-byte selector, cached on first use.
    pub fn selector(&self) -> [u8; 4] {
        *self.selector.get_or_init(|| self.compute_selector())
    }

    /// Recomputes the selector from the signature. Must always equal
    /// [selector](Self::selector).
    pub fn compute_selector(&self) -> [u8; 4] {
        let digest = keccak256(self.signature().as_bytes());
        [digest[0], digest[1], digest[2], digest[3]]
    }

    /// Builds the call payload: `selector || encode(args in declared order)`,
    /// after checking arity and per-argument kind conformance.
    pub fn encode_call(&self, args: &[Value]) -> Result<Vec<u8>> {
        if args.len() != self.inputs.len() {
            return Err(AbiError::MalformedAbiData(format!(
                "`{}` takes {} inputs, {} bound values supplied",
                self.name,
                self.inputs.len(),
                args.len()
            )));
        }
        for (index, (arg, param)) in args.iter().zip(&self.inputs).enumerate() {
            if !arg.conforms_to(&param.kind) {
                return Err(AbiError::MalformedAbiData(format!(
                    "input {} (`{}`) of `{}` expects {}, got a {} value",
                    index,
                    param.name,
                    self.name,
                    param.kind.canonical(),
                    arg.type_name()
                )));
            }
        }

        let mut payload = Vec::with_capacity(4 + args.len() * codec::WORD);
        payload.extend_from_slice(&self.selector());
        payload.extend_from_slice(&codec::encode(args));
        Ok(payload)
    }

    /// Decodes return data against the declared output shape. A shape of
    /// [OutputShape::None] yields the empty outcome whatever the data says.
    pub fn decode_output(&self, data: &[u8]) -> Result<DecodedOutput> {
        match &self.output {
            OutputShape::None => Ok(DecodedOutput::None),
            OutputShape::Single(kind) => {
                let mut values = codec::decode(std::slice::from_ref(kind), data)?;
                Ok(DecodedOutput::Single(values.remove(0)))
            }
            OutputShape::Multi(fields) => {
                let kinds: Vec<Kind> = fields.iter().map(|f| f.kind.clone()).collect();
                let values = codec::decode(&kinds, data)?;
                let entries = fields
                    .iter()
                    .zip(values)
                    .map(|(f, v)| (f.name.clone(), v))
                    .collect();
                Ok(DecodedOutput::Multi(NamedValues::new(entries)))
            }
        }
    }

    /// Decodes a full call payload (selector included) back into the bound
    /// input values, e.g. when inspecting pending transactions in a mempool.
    pub fn decode_call(&self, data: &[u8]) -> Result<Vec<Value>> {
        if data.len() < 4 {
            return Err(AbiError::MalformedAbiData(format!(
                "call payload of {} bytes is shorter than a selector",
                data.len()
            )));
        }
        let selector = self.selector();
        if data[..4] != selector {
            return Err(AbiError::UnknownSelector {
                expected: hex::encode(selector),
                got: hex::encode(&data[..4]),
            });
        }
        let kinds: Vec<Kind> = self.inputs.iter().map(|p| p.kind.clone()).collect();
        codec::decode(&kinds, &data[4..])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::types::{Address, U256};

    fn owner() -> FunctionDescriptor {
        FunctionDescriptor::new("owner", Vec::new(), OutputShape::Single(Kind::Address))
    }

    #[test]
    fn selector_matches_known_constants() {
        assert_eq!(owner().selector(), [0x8d, 0xa5, 0xcb, 0x5b]);

        let transfer_ownership = FunctionDescriptor::new(
            "transferOwnership",
            vec![Param::new("newOwner", Kind::Address)],
            OutputShape::None,
        );
        assert_eq!(transfer_ownership.selector(), [0xf2, 0xfd, 0xe3, 0x8b]);
    }

    #[test]
    fn cached_selector_always_matches_recomputation() {
        let descriptor = owner();
        for _ in 0..3 {
            assert_eq!(descriptor.selector(), descriptor.compute_selector());
        }
    }

    #[test]
    fn call_payload_is_selector_then_words() {
        let descriptor = FunctionDescriptor::new(
            "bridgedResourceTypes",
            vec![Param::new("id", Kind::Uint(256))],
            OutputShape::Multi(vec![
                Param::new("amountPerUnit", Kind::Uint(256)),
                Param::new("defined", Kind::Bool),
            ]),
        );
        let payload = descriptor
            .encode_call(&[Value::Uint(U256::from(42u8))])
            .unwrap();
        assert_eq!(payload.len(), 36);
        assert_eq!(payload[..4], descriptor.selector());
        assert!(payload[4..35].iter().all(|b| *b == 0));
        assert_eq!(payload[35], 0x2a);
    }

    #[test]
    fn arity_and_kind_mismatches_are_rejected() {
        let descriptor = FunctionDescriptor::new(
            "sendUnits",
            vec![
                Param::new("to", Kind::Address),
                Param::new("id", Kind::Uint(256)),
            ],
            OutputShape::None,
        );
        assert!(descriptor.encode_call(&[]).is_err());
        let err = descriptor
            .encode_call(&[Value::Uint(U256::one()), Value::Uint(U256::one())])
            .unwrap_err();
        assert!(matches!(err, AbiError::MalformedAbiData(_)));
    }

    #[test]
    fn none_output_decodes_to_empty_even_with_data() {
        let descriptor =
            FunctionDescriptor::new("terminate", Vec::new(), OutputShape::None);
        assert_eq!(descriptor.decode_output(&[]).unwrap(), DecodedOutput::None);
        assert_eq!(
            descriptor.decode_output(&[0u8; 32]).unwrap(),
            DecodedOutput::None
        );
    }

    #[test]
    fn multi_output_splits_in_declared_order() {
        let descriptor = FunctionDescriptor::new(
            "bridgedResourceTypes",
            vec![Param::new("id", Kind::Uint(256))],
            OutputShape::Multi(vec![
                Param::new("amountPerUnit", Kind::Uint(256)),
                Param::new("defined", Kind::Bool),
            ]),
        );
        let mut reply = [0u8; 64];
        reply[31] = 0x07;
        reply[63] = 0x01;
        let output = descriptor.decode_output(&reply).unwrap().multi().unwrap();
        assert_eq!(
            output.get("amountPerUnit"),
            Some(&Value::Uint(U256::from(7u8)))
        );
        assert_eq!(output.get("defined"), Some(&Value::Bool(true)));
    }

    #[test]
    fn decode_call_round_trips_and_rejects_foreign_selectors() {
        let descriptor = FunctionDescriptor::new(
            "transferOwnership",
            vec![Param::new("newOwner", Kind::Address)],
            OutputShape::None,
        );
        let new_owner: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
            .parse()
            .unwrap();
        let payload = descriptor
            .encode_call(&[Value::Address(new_owner)])
            .unwrap();
        let decoded = descriptor.decode_call(&payload).unwrap();
        assert_eq!(decoded, vec![Value::Address(new_owner)]);

        let mut foreign = payload;
        foreign[0] ^= 0xff;
        let err = descriptor.decode_call(&foreign).unwrap_err();
        assert!(matches!(err, AbiError::UnknownSelector { .. }));
    }
}
