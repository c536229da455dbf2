use thiserror::Error;

/// Errors raised by the encoding layer: number parsing, unit conversion,
/// ABI encoding/decoding and transaction serialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EthError {
    #[error("malformed number: {0}")]
    MalformedNumber(String),

    #[error("precision overflow: {0}")]
    PrecisionOverflow(String),

    #[error("numeric overflow: {0}")]
    NumericOverflow(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid abi: {0}")]
    InvalidAbi(String),

    #[error("argument mismatch: {0}")]
    ArgumentMismatch(String),

    #[error("abi decode error: {0}")]
    AbiDecode(String),

    #[error("invalid filter argument: {0}")]
    InvalidFilterArgument(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("encoding error: {0}")]
    EncodingError(String),
}
