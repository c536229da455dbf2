//! Solidity ABI: type model, signature parsing, head/tail encoding and
//! decoding, and event topics.

pub mod decoder;
pub mod encoder;
pub mod event;
pub mod parser;
pub mod types;

pub use decoder::{decode, decode_function_input, decode_function_result};
pub use encoder::{encode, encode_function_call};
pub use event::{decode_log, encode_event_topics, encode_topic, DecodedEvent, TopicArg};
pub use parser::ContractAbi;
pub use types::{AbiEvent, AbiFunction, AbiParameter, AbiType, AbiValue, StateMutability};
