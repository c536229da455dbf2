use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, B256, I256, U256};
use serde::{Deserialize, Serialize};

use crate::address::to_checksum;
use crate::error::EthError;
use crate::hash::id;

/// A Solidity ABI type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// `uintN`, N in 8..=256 step 8.
    Uint(usize),
    /// `intN`, N in 8..=256 step 8.
    Int(usize),
    Address,
    Bool,
    /// `bytesN`, N in 1..=32.
    FixedBytes(usize),
    Bytes,
    String,
    /// `T[]`
    Array(Box<AbiType>),
    /// `T[N]`
    FixedArray(Box<AbiType>, usize),
    /// `(T1,T2,...)`
    Tuple(Vec<AbiType>),
}

impl AbiType {
    /// Dynamic types are encoded out of line, behind an offset word.
    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::Bytes | AbiType::String | AbiType::Array(_) => true,
            AbiType::FixedArray(inner, _) => inner.is_dynamic(),
            AbiType::Tuple(components) => components.iter().any(|t| t.is_dynamic()),
            _ => false,
        }
    }

    /// False for hand-built widths the ABI has no encoding for, such as
    /// `Uint(0)` or `FixedBytes(40)`.
    pub fn has_valid_width(&self) -> bool {
        match self {
            AbiType::Uint(bits) | AbiType::Int(bits) => (8..=256).contains(bits) && bits % 8 == 0,
            AbiType::FixedBytes(len) => (1..=32).contains(len),
            _ => true,
        }
    }

    /// Bytes this type occupies in the head of an enclosing tuple.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            AbiType::FixedArray(inner, len) => inner.head_size() * len,
            AbiType::Tuple(components) => components.iter().map(|t| t.head_size()).sum(),
            _ => 32,
        }
    }

    /// Canonical type string used in signatures (`uint256`, `(address,bool)[]`).
    pub fn canonical(&self) -> String {
        match self {
            AbiType::Uint(bits) => format!("uint{bits}"),
            AbiType::Int(bits) => format!("int{bits}"),
            AbiType::Address => "address".to_string(),
            AbiType::Bool => "bool".to_string(),
            AbiType::FixedBytes(len) => format!("bytes{len}"),
            AbiType::Bytes => "bytes".to_string(),
            AbiType::String => "string".to_string(),
            AbiType::Array(inner) => format!("{}[]", inner.canonical()),
            AbiType::FixedArray(inner, len) => format!("{}[{len}]", inner.canonical()),
            AbiType::Tuple(components) => {
                let inner: Vec<String> = components.iter().map(|t| t.canonical()).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    /// Parses a type string. Accepts the `uint`/`int` aliases and both the
    /// `(T1,T2)` and `tuple(T1,T2)` spellings of tuples.
    pub fn parse(s: &str) -> Result<Self, EthError> {
        let s = s.trim();
        let tuple_body = s.strip_prefix("tuple").filter(|rest| rest.starts_with('('));
        let tuple_src = tuple_body.or_else(|| s.starts_with('(').then_some(s));

        if let Some(src) = tuple_src {
            let close = matching_paren(src)?;
            let components = split_top_level(&src[1..close])
                .into_iter()
                .map(AbiType::parse)
                .collect::<Result<Vec<_>, _>>()?;
            return wrap_arrays(AbiType::Tuple(components), &src[close + 1..]);
        }

        let (base, suffix) = match s.find('[') {
            Some(idx) => (&s[..idx], &s[idx..]),
            None => (s, ""),
        };
        wrap_arrays(parse_elementary(base)?, suffix)
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for AbiType {
    type Err = EthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AbiType::parse(s)
    }
}

fn parse_elementary(s: &str) -> Result<AbiType, EthError> {
    let invalid = || EthError::InvalidAbi(format!("unknown type: {s:?}"));
    match s {
        "address" => return Ok(AbiType::Address),
        "bool" => return Ok(AbiType::Bool),
        "bytes" => return Ok(AbiType::Bytes),
        "string" => return Ok(AbiType::String),
        "uint" => return Ok(AbiType::Uint(256)),
        "int" => return Ok(AbiType::Int(256)),
        _ => {}
    }

    if let Some(size) = s.strip_prefix("bytes") {
        let len: usize = size.parse().map_err(|_| invalid())?;
        if !(1..=32).contains(&len) {
            return Err(EthError::InvalidAbi(format!("bytes size must be 1-32: {s}")));
        }
        return Ok(AbiType::FixedBytes(len));
    }

    let (bits, signed) = if let Some(bits) = s.strip_prefix("uint") {
        (bits, false)
    } else if let Some(bits) = s.strip_prefix("int") {
        (bits, true)
    } else {
        return Err(invalid());
    };

    let bits: usize = bits.parse().map_err(|_| invalid())?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(EthError::InvalidAbi(format!("invalid integer width: {s}")));
    }
    Ok(if signed { AbiType::Int(bits) } else { AbiType::Uint(bits) })
}

/// Applies `[]` / `[N]` suffixes left to right: `T[2][]` is a dynamic array
/// of `T[2]`.
pub(crate) fn wrap_arrays(mut base: AbiType, mut suffix: &str) -> Result<AbiType, EthError> {
    suffix = suffix.trim();
    while !suffix.is_empty() {
        let close = suffix
            .strip_prefix('[')
            .and_then(|rest| rest.find(']'))
            .ok_or_else(|| EthError::InvalidAbi(format!("invalid array suffix: {suffix:?}")))?;
        let size = &suffix[1..close + 1];
        base = if size.is_empty() {
            AbiType::Array(Box::new(base))
        } else {
            let len: usize = size
                .parse()
                .map_err(|_| EthError::InvalidAbi(format!("invalid array size: {size:?}")))?;
            AbiType::FixedArray(Box::new(base), len)
        };
        suffix = &suffix[close + 2..];
    }
    Ok(base)
}

/// Index of the parenthesis closing the one at position 0.
pub(crate) fn matching_paren(s: &str) -> Result<usize, EthError> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(EthError::InvalidAbi(format!("unbalanced parentheses in {s:?}")))
}

/// Splits on commas that are not nested inside parentheses. Empty input
/// yields no items.
pub(crate) fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

/// A named function input/output or event field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiParameter {
    pub name: String,
    pub ty: AbiType,
    /// Named members when `ty` is (an array of) a tuple.
    pub components: Vec<AbiParameter>,
    pub indexed: bool,
}

impl AbiParameter {
    pub fn new(name: impl Into<String>, ty: AbiType) -> Self {
        Self {
            name: name.into(),
            ty,
            components: Vec::new(),
            indexed: false,
        }
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    #[default]
    NonPayable,
    Payable,
}

impl StateMutability {
    pub fn is_read_only(&self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

/// A contract function: name, typed inputs and outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiFunction {
    pub name: String,
    pub inputs: Vec<AbiParameter>,
    pub outputs: Vec<AbiParameter>,
    pub state_mutability: StateMutability,
}

impl AbiFunction {
    /// `name(type,type,...)` without parameter names.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, canonical_list(&self.inputs))
    }

    /// First four bytes of the Keccak-256 of [`signature`](Self::signature).
    pub fn selector(&self) -> [u8; 4] {
        let hash = id(&self.signature());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash[..4]);
        selector
    }

    pub fn input_types(&self) -> Vec<AbiType> {
        self.inputs.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn output_types(&self) -> Vec<AbiType> {
        self.outputs.iter().map(|p| p.ty.clone()).collect()
    }
}

/// A contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiEvent {
    pub name: String,
    pub inputs: Vec<AbiParameter>,
    pub anonymous: bool,
}

impl AbiEvent {
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, canonical_list(&self.inputs))
    }

    /// Full Keccak-256 of the signature; the first topic of every
    /// non-anonymous log of this event.
    pub fn topic0(&self) -> B256 {
        id(&self.signature())
    }
}

fn canonical_list(params: &[AbiParameter]) -> String {
    params
        .iter()
        .map(|p| p.ty.canonical())
        .collect::<Vec<_>>()
        .join(",")
}

/// A decoded or to-be-encoded ABI value.
///
/// Fixed-size arrays use [`AbiValue::Array`] as well; the type decides the
/// encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Uint(U256),
    Int(I256),
    Address(Address),
    Bool(bool),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            AbiValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<I256> {
        match self {
            AbiValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AbiValue::Bytes(b) | AbiValue::FixedBytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[AbiValue]> {
        match self {
            AbiValue::Array(items) | AbiValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, for mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AbiValue::Uint(_) => "uint",
            AbiValue::Int(_) => "int",
            AbiValue::Address(_) => "address",
            AbiValue::Bool(_) => "bool",
            AbiValue::FixedBytes(_) => "fixed bytes",
            AbiValue::Bytes(_) => "bytes",
            AbiValue::String(_) => "string",
            AbiValue::Array(_) => "array",
            AbiValue::Tuple(_) => "tuple",
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiValue::Uint(v) => write!(f, "{v}"),
            AbiValue::Int(v) => write!(f, "{v}"),
            AbiValue::Address(a) => f.write_str(&to_checksum(a)),
            AbiValue::Bool(b) => write!(f, "{b}"),
            AbiValue::FixedBytes(b) | AbiValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            AbiValue::String(s) => f.write_str(s),
            AbiValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            AbiValue::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

impl From<U256> for AbiValue {
    fn from(v: U256) -> Self {
        AbiValue::Uint(v)
    }
}

impl From<u64> for AbiValue {
    fn from(v: u64) -> Self {
        AbiValue::Uint(U256::from(v))
    }
}

impl From<I256> for AbiValue {
    fn from(v: I256) -> Self {
        AbiValue::Int(v)
    }
}

impl From<Address> for AbiValue {
    fn from(a: Address) -> Self {
        AbiValue::Address(a)
    }
}

impl From<bool> for AbiValue {
    fn from(b: bool) -> Self {
        AbiValue::Bool(b)
    }
}

impl From<&str> for AbiValue {
    fn from(s: &str) -> Self {
        AbiValue::String(s.to_string())
    }
}

impl From<String> for AbiValue {
    fn from(s: String) -> Self {
        AbiValue::String(s)
    }
}

impl From<B256> for AbiValue {
    fn from(b: B256) -> Self {
        AbiValue::FixedBytes(b.to_vec())
    }
}
