//! The codec module holds the ABI wire-format encoder and decoder.
//!
//! Encoding follows the standard contract ABI layout: the head region holds
//! one 32-byte word per value, static values inline and dynamic values as a
//! byte offset into the tail region, where each dynamic value is a 32-byte
//! length word followed by its content padded up to a word boundary. The
//! output must match that layout byte-exactly, since it is what a real network
//! interprets.

use crate::error::{AbiError, Result};
use crate::value::{Kind, Value};
use ethers::types::{Address, U256};

/// Width of one ABI word in bytes.
pub const WORD: usize = 32;

/// Encodes the values into the ABI argument block, in order.
///
/// The values are taken at face value; arity and kind conformance against a
/// descriptor are checked by the caller (see
/// [FunctionDescriptor::encode_call](crate::FunctionDescriptor::encode_call)).
pub fn encode(values: &[Value]) -> Vec<u8> {
    let head_len = values.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for value in values {
        if value.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            encode_tail(value, &mut tail);
        } else {
            head.extend_from_slice(&static_word(value));
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Decodes an ABI argument block against the expected kinds, in order.
///
/// ### Takes
/// - `kinds`: The expected kinds in declared order.
/// - `data`: The raw argument block, without any selector prefix.
///
/// ### Returns
/// - `Ok(Vec<Value>)`: One decoded value per expected kind.
/// - `Err(AbiError::MalformedAbiData)`: The buffer is shorter than the static
///   head, an offset or length points outside the buffer, or a word violates
///   the padding/width rules of its kind.
pub fn decode(kinds: &[Kind], data: &[u8]) -> Result<Vec<Value>> {
    let head_len = kinds.len() * WORD;
    if data.len() < head_len {
        return Err(AbiError::MalformedAbiData(format!(
            "buffer of {} bytes is shorter than the {}-byte head for {} values",
            data.len(),
            head_len,
            kinds.len()
        )));
    }

    let mut values = Vec::with_capacity(kinds.len());
    for (slot, kind) in kinds.iter().enumerate() {
        let word = &data[slot * WORD..(slot + 1) * WORD];
        let value = if kind.is_dynamic() {
            decode_dynamic(kind, word, data)?
        } else {
            decode_word(kind, word)?
        };
        values.push(value);
    }
    Ok(values)
}

/// Decodes a single 32-byte word as a static kind. Also used for the indexed
/// topic words of event logs.
pub(crate) fn decode_word(kind: &Kind, word: &[u8]) -> Result<Value> {
    debug_assert_eq!(word.len(), WORD);
    match kind {
        Kind::Uint(bits) => {
            let value = U256::from_big_endian(word);
            if value.bits() > *bits {
                return Err(AbiError::MalformedAbiData(format!(
                    "value needs {} bits but the expected kind is uint{}",
                    value.bits(),
                    bits
                )));
            }
            Ok(Value::Uint(value))
        }
        Kind::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(AbiError::MalformedAbiData(
                    "address word has non-zero left padding".to_string(),
                ));
            }
            Ok(Value::Address(Address::from_slice(&word[12..])))
        }
        Kind::Bool => {
            if word[..WORD - 1].iter().any(|b| *b != 0) || word[WORD - 1] > 1 {
                return Err(AbiError::MalformedAbiData(
                    "bool word is not 0 or 1".to_string(),
                ));
            }
            Ok(Value::Bool(word[WORD - 1] == 1))
        }
        Kind::FixedBytes(len) => {
            if word[*len..].iter().any(|b| *b != 0) {
                return Err(AbiError::MalformedAbiData(format!(
                    "bytes{len} word has non-zero right padding"
                )));
            }
            Ok(Value::FixedBytes(word[..*len].to_vec()))
        }
        Kind::Bytes | Kind::String => Err(AbiError::MalformedAbiData(format!(
            "dynamic kind {} cannot be decoded from a single word",
            kind.canonical()
        ))),
    }
}

fn decode_dynamic(kind: &Kind, offset_word: &[u8], data: &[u8]) -> Result<Value> {
    let offset = word_as_usize(offset_word, "offset")?;
    let length_end = offset.checked_add(WORD).filter(|end| *end <= data.len());
    let Some(length_end) = length_end else {
        return Err(AbiError::MalformedAbiData(format!(
            "dynamic offset {} points outside the {}-byte buffer",
            offset,
            data.len()
        )));
    };

    let len = word_as_usize(&data[offset..length_end], "length")?;
    let start = length_end;
    let end = start.checked_add(len).ok_or_else(|| {
        AbiError::MalformedAbiData(format!("dynamic length {len} overflows the buffer range"))
    })?;
    if end > data.len() {
        return Err(AbiError::MalformedAbiData(format!(
            "dynamic content of {} bytes at offset {} exceeds the {}-byte buffer",
            len,
            offset,
            data.len()
        )));
    }

    let content = data[start..end].to_vec();
    match kind {
        Kind::Bytes => Ok(Value::Bytes(content)),
        Kind::String => String::from_utf8(content)
            .map(Value::String)
            .map_err(|e| AbiError::MalformedAbiData(format!("string content is not UTF-8: {e}"))),
        _ => unreachable!("static kind routed to dynamic decoding"),
    }
}

fn word_as_usize(word: &[u8], role: &str) -> Result<usize> {
    let value = U256::from_big_endian(word);
    if value > U256::from(usize::MAX) {
        return Err(AbiError::MalformedAbiData(format!(
            "{role} word {value} does not fit the platform word size"
        )));
    }
    Ok(value.as_usize())
}

fn static_word(value: &Value) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    match value {
        Value::Uint(v) => v.to_big_endian(&mut word),
        Value::Address(a) => word[12..].copy_from_slice(a.as_bytes()),
        Value::Bool(b) => word[WORD - 1] = *b as u8,
        Value::FixedBytes(b) => word[..b.len()].copy_from_slice(b),
        Value::Bytes(_) | Value::String(_) => {
            unreachable!("dynamic value routed to static encoding")
        }
    }
    word
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn encode_tail(value: &Value, tail: &mut Vec<u8>) {
    let content = match value {
        Value::Bytes(b) => b.as_slice(),
        Value::String(s) => s.as_bytes(),
        _ => unreachable!("static value routed to tail encoding"),
    };
    tail.extend_from_slice(&uint_word(U256::from(content.len())));
    tail.extend_from_slice(content);
    let trailing = content.len() % WORD;
    if trailing != 0 {
        tail.extend(std::iter::repeat(0u8).take(WORD - trailing));
    }
}
