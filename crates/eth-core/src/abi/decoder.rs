use alloy_primitives::{Address, I256, U256};

use super::types::{AbiFunction, AbiType, AbiValue};
use crate::error::EthError;

/// Decodes ABI data laid out as a tuple of `types`.
///
/// Every offset and length is bounds-checked, and values whose padding bits
/// are dirty (an address with a non-zero high part, a bool other than 0/1,
/// a `uint8` above 255) are rejected.
pub fn decode(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, EthError> {
    let refs: Vec<&AbiType> = types.iter().collect();
    decode_sequence(data, 0, &refs)
}

/// Decodes the return data of `function`.
pub fn decode_function_result(function: &AbiFunction, data: &[u8]) -> Result<Vec<AbiValue>, EthError> {
    if data.is_empty() && !function.outputs.is_empty() {
        return Err(EthError::AbiDecode(format!(
            "{} returned no data",
            function.signature()
        )));
    }
    decode(&function.output_types(), data)
}

/// Decodes call data produced for `function`, checking the selector.
pub fn decode_function_input(function: &AbiFunction, calldata: &[u8]) -> Result<Vec<AbiValue>, EthError> {
    let selector = function.selector();
    match calldata.split_first_chunk::<4>() {
        Some((head, body)) if *head == selector => decode(&function.input_types(), body),
        _ => Err(EthError::AbiDecode(format!(
            "call data does not start with the selector of {}",
            function.signature()
        ))),
    }
}

fn decode_sequence(data: &[u8], base: usize, types: &[&AbiType]) -> Result<Vec<AbiValue>, EthError> {
    let mut values = Vec::with_capacity(types.len());
    let mut head = base;

    for ty in types {
        if ty.is_dynamic() {
            let offset = read_usize(data, head)?;
            let start = base
                .checked_add(offset)
                .ok_or_else(|| EthError::AbiDecode("offset overflows".into()))?;
            values.push(decode_value(data, start, ty)?);
            head += 32;
        } else {
            values.push(decode_value(data, head, ty)?);
            head += ty.head_size();
        }
    }

    Ok(values)
}

fn decode_value(data: &[u8], at: usize, ty: &AbiType) -> Result<AbiValue, EthError> {
    match ty {
        AbiType::Bytes => Ok(AbiValue::Bytes(read_packed(data, at)?.to_vec())),
        AbiType::String => {
            let bytes = read_packed(data, at)?;
            String::from_utf8(bytes.to_vec())
                .map(AbiValue::String)
                .map_err(|_| EthError::AbiDecode("string is not valid UTF-8".into()))
        }
        AbiType::Array(inner) => {
            let len = read_usize(data, at)?;
            let start = at + 32;
            ensure_room(data, start, len, inner)?;
            let types = vec![inner.as_ref(); len];
            decode_sequence(data, start, &types).map(AbiValue::Array)
        }
        AbiType::FixedArray(inner, len) => {
            ensure_room(data, at, *len, inner)?;
            let types = vec![inner.as_ref(); *len];
            decode_sequence(data, at, &types).map(AbiValue::Array)
        }
        AbiType::Tuple(components) => {
            let types: Vec<&AbiType> = components.iter().collect();
            decode_sequence(data, at, &types).map(AbiValue::Tuple)
        }
        _ => decode_word(ty, read_word(data, at)?),
    }
}

/// Rejects element counts that cannot possibly fit in the remaining data.
fn ensure_room(data: &[u8], start: usize, count: usize, inner: &AbiType) -> Result<(), EthError> {
    let needed = count
        .checked_mul(inner.head_size().max(1))
        .and_then(|n| n.checked_add(start));
    match needed {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(EthError::AbiDecode(format!(
            "{count} elements of {inner} do not fit in {} bytes",
            data.len().saturating_sub(start)
        ))),
    }
}

/// Decodes one 32-byte word of an elementary static type.
pub(crate) fn decode_word(ty: &AbiType, word: &[u8; 32]) -> Result<AbiValue, EthError> {
    let dirty = || EthError::AbiDecode(format!("dirty bits in {ty} word 0x{}", hex::encode(word)));
    if !ty.has_valid_width() {
        return Err(EthError::AbiDecode(format!("{ty} has no ABI encoding")));
    }

    match ty {
        AbiType::Uint(bits) => {
            let value = U256::from_be_bytes(*word);
            if *bits < 256 && (value >> *bits) != U256::ZERO {
                return Err(dirty());
            }
            Ok(AbiValue::Uint(value))
        }
        AbiType::Int(bits) => {
            let raw = U256::from_be_bytes(*word);
            if *bits < 256 {
                let high = raw >> (*bits - 1);
                if high != U256::ZERO && high != (U256::MAX >> (*bits - 1)) {
                    return Err(dirty());
                }
            }
            Ok(AbiValue::Int(I256::from_raw(raw)))
        }
        AbiType::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(dirty());
            }
            Ok(AbiValue::Address(Address::from_slice(&word[12..])))
        }
        AbiType::Bool => {
            if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                return Err(dirty());
            }
            Ok(AbiValue::Bool(word[31] == 1))
        }
        AbiType::FixedBytes(len) => {
            if word[*len..].iter().any(|b| *b != 0) {
                return Err(dirty());
            }
            Ok(AbiValue::FixedBytes(word[..*len].to_vec()))
        }
        other => Err(EthError::AbiDecode(format!("{other} is not a single-word type"))),
    }
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8; 32], EthError> {
    at.checked_add(32)
        .and_then(|end| data.get(at..end))
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            EthError::AbiDecode(format!(
                "insufficient data: need 32 bytes at offset {at}, have {}",
                data.len()
            ))
        })
}

fn read_usize(data: &[u8], at: usize) -> Result<usize, EthError> {
    let word = read_word(data, at)?;
    if word[..24].iter().any(|b| *b != 0) {
        return Err(EthError::AbiDecode(format!("offset or length too large at {at}")));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(low))
        .map_err(|_| EthError::AbiDecode(format!("offset or length too large at {at}")))
}

fn read_packed(data: &[u8], at: usize) -> Result<&[u8], EthError> {
    let len = read_usize(data, at)?;
    let start = at + 32;
    start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| EthError::AbiDecode(format!("{len} bytes at offset {start} exceed data")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::encoder::{encode, encode_function_call};
    use crate::abi::types::{AbiParameter, StateMutability};

    fn word(last: u8) -> Vec<u8> {
        let mut w = vec![0u8; 32];
        w[31] = last;
        w
    }

    #[test]
    fn decode_uint_result() {
        let mut data = vec![0u8; 32];
        data[30] = 0x03;
        data[31] = 0xe8;
        let values = decode(&[AbiType::Uint(256)], &data).unwrap();
        assert_eq!(values, vec![AbiValue::Uint(U256::from(1000))]);
    }

    #[test]
    fn decode_string_result() {
        let mut data = word(0x20);
        data.extend(word(5));
        let mut body = b"hello".to_vec();
        body.resize(32, 0);
        data.extend(body);
        let values = decode(&[AbiType::String], &data).unwrap();
        assert_eq!(values[0].as_str(), Some("hello"));
    }

    #[test]
    fn nested_dynamic_values_decode() {
        let types = vec![
            AbiType::parse("(string,uint256[])[]").unwrap(),
            AbiType::Bytes,
        ];
        let values = vec![
            AbiValue::Array(vec![
                AbiValue::Tuple(vec![
                    "a".into(),
                    AbiValue::Array(vec![1u64.into(), 2u64.into()]),
                ]),
                AbiValue::Tuple(vec!["bcd".into(), AbiValue::Array(vec![])]),
            ]),
            AbiValue::Bytes(vec![0xca, 0xfe]),
        ];
        let encoded = encode(&types, &values).unwrap();
        assert_eq!(decode(&types, &encoded).unwrap(), values);
    }

    #[test]
    fn truncated_data_fails() {
        assert!(matches!(
            decode(&[AbiType::Uint(256)], &[0u8; 31]),
            Err(EthError::AbiDecode(_))
        ));
    }

    #[test]
    fn out_of_range_offset_fails() {
        let data = word(0xff);
        assert!(decode(&[AbiType::Bytes], &data).is_err());
    }

    #[test]
    fn huge_array_length_fails_without_allocating() {
        let mut data = word(0x20);
        let mut len = vec![0u8; 32];
        len[24..].copy_from_slice(&u64::MAX.to_be_bytes()[..8]);
        len[24] = 0x7f;
        data.extend(len);
        let ty = AbiType::Array(Box::new(AbiType::Uint(256)));
        assert!(decode(&[ty], &data).is_err());
    }

    #[test]
    fn dirty_bits_are_rejected() {
        let mut addr = vec![0u8; 32];
        addr[0] = 1;
        assert!(decode(&[AbiType::Address], &addr).is_err());
        assert!(decode(&[AbiType::Bool], &word(2)).is_err());
        let mut small = vec![0u8; 32];
        small[30] = 1;
        assert!(decode(&[AbiType::Uint(8)], &small).is_err());
        let mut fixed = vec![0u8; 32];
        fixed[5] = 1;
        assert!(decode(&[AbiType::FixedBytes(4)], &fixed).is_err());
    }

    #[test]
    fn negative_small_int_decodes() {
        let data = vec![0xffu8; 32];
        let values = decode(&[AbiType::Int(8)], &data).unwrap();
        assert_eq!(values[0].as_int(), Some(I256::MINUS_ONE));

        let mut bad = vec![0xffu8; 32];
        bad[0] = 0x7f;
        assert!(decode(&[AbiType::Int(8)], &bad).is_err());
    }

    #[test]
    fn function_input_round_trip_and_selector_check() {
        let f = AbiFunction {
            name: "setName".into(),
            inputs: vec![AbiParameter::new("name", AbiType::String)],
            outputs: vec![],
            state_mutability: StateMutability::NonPayable,
        };
        let calldata = encode_function_call(&f, &["vitalik".into()]).unwrap();
        let decoded = decode_function_input(&f, &calldata).unwrap();
        assert_eq!(decoded[0].as_str(), Some("vitalik"));
        assert!(decode_function_input(&f, &calldata[1..]).is_err());
    }

    #[test]
    fn empty_result_for_function_with_outputs_fails() {
        let f = AbiFunction {
            name: "decimals".into(),
            inputs: vec![],
            outputs: vec![AbiParameter::new("", AbiType::Uint(8))],
            state_mutability: StateMutability::View,
        };
        assert!(matches!(
            decode_function_result(&f, &[]),
            Err(EthError::AbiDecode(msg)) if msg.contains("no data")
        ));
    }

    #[test]
    fn invalid_widths_are_decode_errors() {
        for ty in [AbiType::Int(0), AbiType::Uint(7), AbiType::FixedBytes(40), AbiType::FixedBytes(0)] {
            assert!(
                matches!(decode(&[ty.clone()], &word(0)), Err(EthError::AbiDecode(_))),
                "{ty} should be rejected"
            );
        }
    }
}
