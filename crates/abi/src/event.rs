//! The event module holds the [EventDescriptor] type: one immutable value per
//! contract event, associating the event name with its ordered parameters,
//! each flagged as indexed (carried in a log topic) or non-indexed (carried in
//! the log data blob), and with the topic hash derived from the canonical
//! signature.

use crate::codec;
use crate::error::{AbiError, Result};
use crate::value::{Kind, NamedValues, Value};
use ethers::types::H256;
use ethers::utils::{hex, keccak256};
use std::sync::OnceLock;

/// A named, typed event parameter with its indexed flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub name: String,
    pub kind: Kind,
    pub indexed: bool,
}

impl EventParam {
    pub fn new(name: &str, kind: Kind, indexed: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            indexed,
        }
    }
}

/// The [EventDescriptor] struct describes one contract event.
///
/// Indexed parameters map 1:1, in declared order, onto the log topics after
/// the topic hash itself; non-indexed parameters are ABI-decoded from the log
/// data blob in declared order. An indexed *dynamic* parameter (bytes or
/// string) is unrecoverable from a log, since the chain only stores its
/// 32-byte commitment; it decodes as that commitment.
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    name: String,
    params: Vec<EventParam>,
    topic: OnceLock<H256>,
}

impl EventDescriptor {
    /// Creates a descriptor after validating every declared kind. Panics on a
    /// malformed kind, like [FunctionDescriptor::new](crate::FunctionDescriptor::new).
    pub fn new(name: &str, params: Vec<EventParam>) -> Self {
        for param in &params {
            assert!(
                param.kind.is_well_formed(),
                "parameter `{}` of event `{}` declares invalid kind {}",
                param.name,
                name,
                param.kind.canonical()
            );
        }
        Self {
            name: name.to_string(),
            params,
            topic: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[EventParam] {
        &self.params
    }

    /// The canonical signature, e.g. `OwnershipTransferred(address,address)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.params.iter().map(|p| p.kind.canonical()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// The topic hash identifying this event in log topic 0, cached on first
    /// use.
    pub fn topic(&self) -> H256 {
        *self.topic.get_or_init(|| self.compute_topic())
    }

    /// Recomputes the topic hash from the signature. Must always equal
    /// [topic](Self::topic).
    pub fn compute_topic(&self) -> H256 {
        H256::from(keccak256(self.signature().as_bytes()))
    }

    /// Number of indexed parameters, i.e. expected topics after topic 0.
    pub fn indexed_count(&self) -> usize {
        self.params.iter().filter(|p| p.indexed).count()
    }

    /// Decodes one log against this descriptor.
    ///
    /// ### Takes
    /// - `topics`: The log's topics, topic 0 first.
    /// - `data`: The log's data blob.
    ///
    /// ### Returns
    /// - `Ok(NamedValues)`: All parameters in declared order.
    /// - `Err(AbiError::UnknownTopic)`: Topic 0 belongs to a different event.
    /// - `Err(AbiError::MalformedAbiData)`: The topic count does not match the
    ///   declared indexed parameters, or the data blob fails to decode.
    pub fn decode_log(&self, topics: &[H256], data: &[u8]) -> Result<NamedValues> {
        let first = topics.first().ok_or_else(|| {
            AbiError::MalformedAbiData(format!("log for `{}` carries no topics", self.name))
        })?;
        if *first != self.topic() {
            return Err(AbiError::UnknownTopic {
                expected: hex::encode(self.topic()),
                got: hex::encode(first),
            });
        }
        let expected = self.indexed_count() + 1;
        if topics.len() != expected {
            return Err(AbiError::MalformedAbiData(format!(
                "log for `{}` carries {} topics, descriptor expects {}",
                self.name,
                topics.len(),
                expected
            )));
        }

        let data_kinds: Vec<Kind> = self
            .params
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.kind.clone())
            .collect();
        let mut data_values = codec::decode(&data_kinds, data)?.into_iter();

        let mut entries = Vec::with_capacity(self.params.len());
        let mut next_topic = 1usize;
        for param in &self.params {
            let value = if param.indexed {
                let topic = topics[next_topic];
                next_topic += 1;
                if param.kind.is_dynamic() {
                    Value::FixedBytes(topic.as_bytes().to_vec())
                } else {
                    codec::decode_word(&param.kind, topic.as_bytes())?
                }
            } else {
                data_values.next().ok_or_else(|| {
                    AbiError::MalformedAbiData(format!(
                        "log data for `{}` ran out before `{}`",
                        self.name, param.name
                    ))
                })?
            };
            entries.push((param.name.clone(), value));
        }
        Ok(NamedValues::new(entries))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::types::{Address, U256};

    fn ownership_transferred() -> EventDescriptor {
        EventDescriptor::new(
            "OwnershipTransferred",
            vec![
                EventParam::new("previousOwner", Kind::Address, true),
                EventParam::new("newOwner", Kind::Address, true),
            ],
        )
    }

    fn address_topic(address: Address) -> H256 {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(address.as_bytes());
        H256::from(word)
    }

    #[test]
    fn topic_matches_known_constant() {
        let expected: H256 = "0x8be0079c531659141344cd1fd0a4f28419497f9722a3daafe3b4186f6b6457e0"
            .parse()
            .unwrap();
        assert_eq!(ownership_transferred().topic(), expected);
    }

    #[test]
    fn cached_topic_always_matches_recomputation() {
        let descriptor = ownership_transferred();
        for _ in 0..3 {
            assert_eq!(descriptor.topic(), descriptor.compute_topic());
        }
    }

    #[test]
    fn decodes_indexed_and_data_params_in_declared_order() {
        let descriptor = EventDescriptor::new(
            "BridgedResourceTypeDefined",
            vec![
                EventParam::new("id", Kind::Uint(256), true),
                EventParam::new("amountPerUnit", Kind::Uint(256), false),
            ],
        );
        let mut id_word = [0u8; 32];
        id_word[31] = 9;
        let mut data = [0u8; 32];
        data[31] = 4;
        let decoded = descriptor
            .decode_log(&[descriptor.topic(), H256::from(id_word)], &data)
            .unwrap();
        assert_eq!(decoded.get("id"), Some(&Value::Uint(U256::from(9u8))));
        assert_eq!(
            decoded.get("amountPerUnit"),
            Some(&Value::Uint(U256::from(4u8)))
        );
    }

    #[test]
    fn missing_topic_is_malformed() {
        let descriptor = ownership_transferred();
        let previous: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
            .parse()
            .unwrap();
        let err = descriptor
            .decode_log(&[descriptor.topic(), address_topic(previous)], &[])
            .unwrap_err();
        assert!(matches!(err, AbiError::MalformedAbiData(_)));
    }

    #[test]
    fn foreign_topic0_is_unknown_topic() {
        let descriptor = ownership_transferred();
        let err = descriptor
            .decode_log(&[H256::zero(), H256::zero(), H256::zero()], &[])
            .unwrap_err();
        assert!(matches!(err, AbiError::UnknownTopic { .. }));
    }

    #[test]
    fn indexed_dynamic_param_decodes_as_commitment() {
        let descriptor = EventDescriptor::new(
            "Tagged",
            vec![EventParam::new("tag", Kind::String, true)],
        );
        let commitment = H256::from(keccak256(b"gold"));
        let decoded = descriptor
            .decode_log(&[descriptor.topic(), commitment], &[])
            .unwrap();
        assert_eq!(
            decoded.get("tag"),
            Some(&Value::FixedBytes(commitment.as_bytes().to_vec()))
        );
    }
}
