use alloy_primitives::U256;

use super::types::{AbiFunction, AbiType, AbiValue};
use crate::address::address_to_word;
use crate::error::EthError;

/// ABI-encodes `values` as a tuple of `types` (head/tail layout).
pub fn encode(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, EthError> {
    if types.len() != values.len() {
        return Err(EthError::ArgumentMismatch(format!(
            "expected {} values, got {}",
            types.len(),
            values.len()
        )));
    }
    let items: Vec<(&AbiType, &AbiValue)> = types.iter().zip(values).collect();
    encode_sequence(&items)
}

/// Encodes call data: the function selector followed by the encoded arguments.
pub fn encode_function_call(function: &AbiFunction, args: &[AbiValue]) -> Result<Vec<u8>, EthError> {
    if function.inputs.len() != args.len() {
        return Err(EthError::ArgumentMismatch(format!(
            "{} expects {} arguments, got {}",
            function.signature(),
            function.inputs.len(),
            args.len()
        )));
    }
    let types = function.input_types();
    let mut data = function.selector().to_vec();
    data.extend(encode(&types, args).map_err(|e| annotate(e, function))?);
    Ok(data)
}

fn annotate(err: EthError, function: &AbiFunction) -> EthError {
    match err {
        EthError::ArgumentMismatch(msg) => {
            EthError::ArgumentMismatch(format!("{}: {msg}", function.signature()))
        }
        other => other,
    }
}

fn encode_sequence(items: &[(&AbiType, &AbiValue)]) -> Result<Vec<u8>, EthError> {
    let head_len: usize = items.iter().map(|(ty, _)| ty.head_size()).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (ty, value) in items {
        let encoded = encode_value(ty, value)?;
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_value(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>, EthError> {
    match (ty, value) {
        (AbiType::Bytes, AbiValue::Bytes(bytes) | AbiValue::FixedBytes(bytes)) => {
            Ok(encode_packed_bytes(bytes))
        }
        (AbiType::String, AbiValue::String(s)) => Ok(encode_packed_bytes(s.as_bytes())),
        (AbiType::Array(inner), AbiValue::Array(items)) => {
            let pairs: Vec<(&AbiType, &AbiValue)> =
                items.iter().map(|v| (inner.as_ref(), v)).collect();
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_sequence(&pairs)?);
            Ok(out)
        }
        (AbiType::FixedArray(inner, len), AbiValue::Array(items)) => {
            if items.len() != *len {
                return Err(EthError::ArgumentMismatch(format!(
                    "{ty} expects {len} elements, got {}",
                    items.len()
                )));
            }
            let pairs: Vec<(&AbiType, &AbiValue)> =
                items.iter().map(|v| (inner.as_ref(), v)).collect();
            encode_sequence(&pairs)
        }
        (AbiType::Tuple(components), AbiValue::Tuple(items)) => {
            if items.len() != components.len() {
                return Err(EthError::ArgumentMismatch(format!(
                    "{ty} expects {} members, got {}",
                    components.len(),
                    items.len()
                )));
            }
            let pairs: Vec<(&AbiType, &AbiValue)> = components.iter().zip(items).collect();
            encode_sequence(&pairs)
        }
        _ => encode_word(ty, value).map(|word| word.to_vec()),
    }
}

/// Encodes a single-word (elementary static) value. Also used for event topics.
pub(crate) fn encode_word(ty: &AbiType, value: &AbiValue) -> Result<[u8; 32], EthError> {
    let mismatch = || {
        EthError::ArgumentMismatch(format!("cannot encode {} as {ty}", value.kind()))
    };
    let out_of_range = || EthError::ArgumentMismatch(format!("value {value} out of range for {ty}"));
    if !ty.has_valid_width() {
        return Err(EthError::ArgumentMismatch(format!("{ty} has no ABI encoding")));
    }

    match (ty, value) {
        (AbiType::Uint(bits), AbiValue::Uint(v)) => {
            if *bits < 256 && (*v >> *bits) != U256::ZERO {
                return Err(out_of_range());
            }
            Ok(v.to_be_bytes::<32>())
        }
        (AbiType::Uint(_), AbiValue::Int(v)) => {
            if v.is_negative() {
                return Err(out_of_range());
            }
            encode_word(ty, &AbiValue::Uint(v.into_raw()))
        }
        (AbiType::Int(bits), AbiValue::Int(v)) => {
            let raw = v.into_raw();
            if *bits < 256 {
                let magnitude = if v.is_negative() { !raw } else { raw };
                if (magnitude >> (*bits - 1)) != U256::ZERO {
                    return Err(out_of_range());
                }
            }
            Ok(raw.to_be_bytes::<32>())
        }
        (AbiType::Int(bits), AbiValue::Uint(v)) => {
            if (*v >> (*bits - 1)) != U256::ZERO {
                return Err(out_of_range());
            }
            Ok(v.to_be_bytes::<32>())
        }
        (AbiType::Address, AbiValue::Address(a)) => Ok(address_to_word(a)),
        (AbiType::Bool, AbiValue::Bool(b)) => {
            let mut word = [0u8; 32];
            word[31] = u8::from(*b);
            Ok(word)
        }
        (AbiType::FixedBytes(len), AbiValue::FixedBytes(bytes) | AbiValue::Bytes(bytes)) => {
            if bytes.len() != *len {
                return Err(EthError::ArgumentMismatch(format!(
                    "{ty} expects {len} bytes, got {}",
                    bytes.len()
                )));
            }
            let mut word = [0u8; 32];
            word[..*len].copy_from_slice(bytes);
            Ok(word)
        }
        _ => Err(mismatch()),
    }
}

/// Length word followed by the bytes right-padded to a multiple of 32.
fn encode_packed_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(32) * 32;
    let mut out = Vec::with_capacity(32 + padded);
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(32 + padded, 0);
    out
}

fn usize_word(n: usize) -> [u8; 32] {
    U256::from(n).to_be_bytes::<32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::types::{AbiParameter, StateMutability};
    use crate::address::parse_address;
    use alloy_primitives::I256;

    fn transfer_fn() -> AbiFunction {
        AbiFunction {
            name: "transfer".into(),
            inputs: vec![
                AbiParameter::new("to", AbiType::Address),
                AbiParameter::new("amount", AbiType::Uint(256)),
            ],
            outputs: vec![AbiParameter::new("", AbiType::Bool)],
            state_mutability: StateMutability::NonPayable,
        }
    }

    #[test]
    fn encode_transfer_call() {
        let to = parse_address("0x000000000000000000000000000000000000dEaD").unwrap();
        let data =
            encode_function_call(&transfer_fn(), &[to.into(), AbiValue::from(1000u64)]).unwrap();
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(&data[4 + 30..4 + 32], &[0xde, 0xad]);
        assert_eq!(&data[4 + 62..], &[0x03, 0xe8]);
    }

    #[test]
    fn wrong_argument_count_is_mismatch() {
        let err = encode_function_call(&transfer_fn(), &[AbiValue::from(1u64)]).unwrap_err();
        assert!(matches!(err, EthError::ArgumentMismatch(_)));
    }

    #[test]
    fn wrong_argument_kind_is_mismatch() {
        let err = encode_function_call(
            &transfer_fn(),
            &[AbiValue::from(true), AbiValue::from(1u64)],
        )
        .unwrap_err();
        assert!(matches!(err, EthError::ArgumentMismatch(msg) if msg.contains("transfer(address,uint256)")));
    }

    #[test]
    fn uint_range_is_checked() {
        assert!(encode(&[AbiType::Uint(8)], &[AbiValue::from(255u64)]).is_ok());
        assert!(encode(&[AbiType::Uint(8)], &[AbiValue::from(256u64)]).is_err());
    }

    #[test]
    fn int_range_and_sign_extension() {
        let minus_one = I256::try_from(-1i64).unwrap();
        let encoded = encode(&[AbiType::Int(8)], &[AbiValue::Int(minus_one)]).unwrap();
        assert_eq!(encoded, vec![0xff; 32]);

        let min = I256::try_from(-128i64).unwrap();
        assert!(encode(&[AbiType::Int(8)], &[AbiValue::Int(min)]).is_ok());
        let below = I256::try_from(-129i64).unwrap();
        assert!(encode(&[AbiType::Int(8)], &[AbiValue::Int(below)]).is_err());
        assert!(encode(&[AbiType::Int(8)], &[AbiValue::from(127u64)]).is_ok());
        assert!(encode(&[AbiType::Int(8)], &[AbiValue::from(128u64)]).is_err());
    }

    #[test]
    fn string_layout() {
        // f(string) with "hi": offset, length, padded data.
        let encoded = encode(&[AbiType::String], &[AbiValue::from("hi")]).unwrap();
        assert_eq!(encoded.len(), 96);
        assert_eq!(encoded[31], 0x20);
        assert_eq!(encoded[63], 2);
        assert_eq!(&encoded[64..66], b"hi");
        assert!(encoded[66..].iter().all(|b| *b == 0));
    }

    #[test]
    fn dynamic_array_layout() {
        // (uint256[], uint256) -> head: offset 0x40, 7; tail: len 2, 1, 2.
        let types = [AbiType::Array(Box::new(AbiType::Uint(256))), AbiType::Uint(256)];
        let values = [
            AbiValue::Array(vec![AbiValue::from(1u64), AbiValue::from(2u64)]),
            AbiValue::from(7u64),
        ];
        let encoded = encode(&types, &values).unwrap();
        let words: Vec<u8> = encoded.chunks(32).map(|w| w[31]).collect();
        assert_eq!(words, vec![0x40, 7, 2, 1, 2]);
    }

    #[test]
    fn fixed_bytes_length_is_checked() {
        assert!(encode(&[AbiType::FixedBytes(4)], &[AbiValue::FixedBytes(vec![1, 2, 3])]).is_err());
        let encoded =
            encode(&[AbiType::FixedBytes(2)], &[AbiValue::FixedBytes(vec![0xab, 0xcd])]).unwrap();
        assert_eq!(&encoded[..2], &[0xab, 0xcd]);
        assert!(encoded[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn fixed_array_length_is_checked() {
        let ty = AbiType::FixedArray(Box::new(AbiType::Bool), 2);
        assert!(encode(&[ty.clone()], &[AbiValue::Array(vec![true.into()])]).is_err());
        let encoded = encode(&[ty], &[AbiValue::Array(vec![true.into(), false.into()])]).unwrap();
        assert_eq!(encoded.len(), 64);
    }

    #[test]
    fn invalid_widths_are_rejected() {
        let cases = [
            (AbiType::Int(0), AbiValue::Int(I256::ONE)),
            (AbiType::Uint(0), AbiValue::Uint(U256::ZERO)),
            (AbiType::Uint(264), AbiValue::Uint(U256::ZERO)),
            (AbiType::FixedBytes(40), AbiValue::FixedBytes(vec![0; 40])),
        ];
        for (ty, value) in cases {
            assert!(
                matches!(encode(&[ty.clone()], &[value]), Err(EthError::ArgumentMismatch(_))),
                "{ty} should be rejected"
            );
        }
    }
}
