use alloy_primitives::B256;

use super::decoder::{decode, decode_word};
use super::encoder::encode_word;
use super::types::{AbiEvent, AbiParameter, AbiType, AbiValue};
use crate::error::EthError;
use crate::hash::keccak256;
use crate::log::{Log, TopicFilter};

/// One positional filter argument for an event parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopicArg {
    /// Match any value (`null`).
    #[default]
    Any,
    Value(AbiValue),
    OneOf(Vec<AbiValue>),
}

impl TopicArg {
    fn is_any(&self) -> bool {
        matches!(self, TopicArg::Any)
    }
}

impl From<AbiValue> for TopicArg {
    fn from(value: AbiValue) -> Self {
        TopicArg::Value(value)
    }
}

impl<T: Into<AbiValue>> From<Option<T>> for TopicArg {
    fn from(value: Option<T>) -> Self {
        value.map_or(TopicArg::Any, |v| TopicArg::Value(v.into()))
    }
}

/// Builds the topic filter list for `event`: `topic0` (unless the event is
/// anonymous) followed by one entry per indexed parameter.
///
/// `args` are positional over all of the event's inputs. Arguments for
/// non-indexed inputs must be [`TopicArg::Any`]. Trailing wildcards are
/// dropped.
pub fn encode_event_topics(event: &AbiEvent, args: &[TopicArg]) -> Result<Vec<TopicFilter>, EthError> {
    if args.len() > event.inputs.len() {
        return Err(EthError::InvalidFilterArgument(format!(
            "{} has {} inputs, got {} filter arguments",
            event.signature(),
            event.inputs.len(),
            args.len()
        )));
    }

    let mut topics = Vec::new();
    if !event.anonymous {
        topics.push(TopicFilter::Exact(event.topic0()));
    }

    for (i, param) in event.inputs.iter().enumerate() {
        let arg = args.get(i).unwrap_or(&TopicArg::Any);
        if !param.indexed {
            if !arg.is_any() {
                return Err(EthError::InvalidFilterArgument(format!(
                    "parameter {} of {} is not indexed",
                    display_name(param, i),
                    event.name
                )));
            }
            continue;
        }
        topics.push(match arg {
            TopicArg::Any => TopicFilter::Any,
            TopicArg::Value(value) => TopicFilter::Exact(encode_topic(&param.ty, value)?),
            TopicArg::OneOf(values) => TopicFilter::OneOf(
                values
                    .iter()
                    .map(|v| encode_topic(&param.ty, v))
                    .collect::<Result<_, _>>()?,
            ),
        });
    }

    while topics.last().is_some_and(TopicFilter::is_any) {
        topics.pop();
    }
    Ok(topics)
}

/// Encodes one indexed value as a topic. `string` and `bytes` values are
/// hashed; a 32-byte value passed for them is taken as the hash itself.
pub fn encode_topic(ty: &AbiType, value: &AbiValue) -> Result<B256, EthError> {
    match (ty, value) {
        (AbiType::String | AbiType::Bytes, AbiValue::FixedBytes(hash)) if hash.len() == 32 => {
            Ok(B256::from_slice(hash))
        }
        (AbiType::String, AbiValue::String(s)) => Ok(keccak256(s.as_bytes())),
        (AbiType::Bytes, AbiValue::Bytes(b)) => Ok(keccak256(b)),
        (AbiType::Array(_) | AbiType::FixedArray(..) | AbiType::Tuple(_), _) => {
            Err(EthError::InvalidFilterArgument(format!(
                "filtering on indexed {ty} values is not supported"
            )))
        }
        _ => encode_word(ty, value)
            .map(B256::from)
            .map_err(|e| EthError::InvalidFilterArgument(e.to_string())),
    }
}

/// A log decoded against its event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub name: String,
    /// `(parameter name, value)` in declaration order. Unnamed parameters
    /// have an empty name.
    pub fields: Vec<(String, AbiValue)>,
}

impl DecodedEvent {
    pub fn get(&self, name: &str) -> Option<&AbiValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn arg(&self, index: usize) -> Option<&AbiValue> {
        self.fields.get(index).map(|(_, v)| v)
    }

    pub fn values(&self) -> impl Iterator<Item = &AbiValue> {
        self.fields.iter().map(|(_, v)| v)
    }
}

/// Decodes `log` as an instance of `event`.
///
/// Indexed parameters come from `topics[1..]` (`topics[0..]` for anonymous
/// events). Indexed dynamic values only exist as their hash and decode to
/// `AbiValue::FixedBytes` holding that hash.
pub fn decode_log(event: &AbiEvent, log: &Log) -> Result<DecodedEvent, EthError> {
    let mut topics = log.topics.iter();
    if !event.anonymous {
        match topics.next() {
            Some(t) if *t == event.topic0() => {}
            _ => {
                return Err(EthError::AbiDecode(format!(
                    "log is not a {} event",
                    event.signature()
                )))
            }
        }
    }

    let data_types: Vec<AbiType> = event
        .inputs
        .iter()
        .filter(|p| !p.indexed)
        .map(|p| p.ty.clone())
        .collect();
    let mut data_values = decode(&data_types, &log.data)?.into_iter();

    let mut fields = Vec::with_capacity(event.inputs.len());
    for (i, param) in event.inputs.iter().enumerate() {
        let value = if param.indexed {
            let topic = topics.next().ok_or_else(|| {
                EthError::AbiDecode(format!(
                    "missing topic for indexed parameter {}",
                    display_name(param, i)
                ))
            })?;
            if param.ty.is_dynamic() || matches!(param.ty, AbiType::Tuple(_) | AbiType::FixedArray(..)) {
                AbiValue::FixedBytes(topic.to_vec())
            } else {
                decode_word(&param.ty, &topic.0)?
            }
        } else {
            data_values
                .next()
                .ok_or_else(|| EthError::AbiDecode("log data ended early".into()))?
        };
        fields.push((param.name.clone(), value));
    }

    Ok(DecodedEvent {
        name: event.name.clone(),
        fields,
    })
}

fn display_name(param: &AbiParameter, index: usize) -> String {
    if param.name.is_empty() {
        format!("#{index}")
    } else {
        param.name.clone()
    }
}
