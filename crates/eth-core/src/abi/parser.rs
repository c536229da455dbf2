use serde::Deserialize;

use super::types::{
    matching_paren, split_top_level, wrap_arrays, AbiEvent, AbiFunction, AbiParameter, AbiType,
    StateMutability,
};
use crate::error::EthError;

/// A parsed contract interface: its functions and events.
///
/// Constructors, errors, fallback and receive entries are accepted in the
/// input and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractAbi {
    pub functions: Vec<AbiFunction>,
    pub events: Vec<AbiEvent>,
}

enum AbiItem {
    Function(AbiFunction),
    Event(AbiEvent),
}

impl ContractAbi {
    /// Parses either a JSON ABI document or a newline-separated list of
    /// human-readable signatures.
    pub fn parse(source: &str) -> Result<Self, EthError> {
        if source.trim_start().starts_with('[') {
            Self::from_json(source)
        } else {
            Self::from_human_readable(source.lines())
        }
    }

    /// Parses human-readable signatures such as
    /// `function balanceOf(address owner) view returns (uint256)` or
    /// `event Transfer(address indexed from, address indexed to, uint256 value)`.
    pub fn from_human_readable<'a>(
        signatures: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, EthError> {
        let mut abi = ContractAbi::default();
        for line in signatures {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            abi.push(parse_signature(line)?);
        }
        Ok(abi)
    }

    /// Parses a JSON ABI. Entries may be standard JSON objects or
    /// human-readable signature strings.
    pub fn from_json(json: &str) -> Result<Self, EthError> {
        let entries: Vec<JsonEntry> = serde_json::from_str(json)
            .map_err(|e| EthError::InvalidAbi(format!("invalid JSON ABI: {e}")))?;

        let mut abi = ContractAbi::default();
        for entry in entries {
            let item = match entry {
                JsonEntry::Signature(line) => parse_signature(line.trim())?,
                JsonEntry::Item(item) => item.into_abi_item()?,
            };
            abi.push(item);
        }
        Ok(abi)
    }

    fn push(&mut self, item: Option<AbiItem>) {
        match item {
            Some(AbiItem::Function(f)) => self.functions.push(f),
            Some(AbiItem::Event(e)) => self.events.push(e),
            None => {}
        }
    }

    /// Looks a function up by name, full signature (`transfer(address,uint256)`)
    /// or `0x`-prefixed selector. A bare name must be unambiguous.
    pub fn function(&self, key: &str) -> Option<&AbiFunction> {
        if let Some(selector) = key.strip_prefix("0x") {
            let selector = hex::decode(selector).ok()?;
            return self
                .functions
                .iter()
                .find(|f| f.selector().as_slice() == selector.as_slice());
        }
        if key.contains('(') {
            let wanted = normalize_signature(key)?;
            return self.functions.iter().find(|f| f.signature() == wanted);
        }
        let mut matches = self.functions.iter().filter(|f| f.name == key);
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    /// Resolves a possibly overloaded function by name and argument count.
    pub fn function_for_args(&self, key: &str, arg_count: usize) -> Option<&AbiFunction> {
        if key.contains('(') || key.starts_with("0x") {
            return self.function(key);
        }
        let mut matches = self
            .functions
            .iter()
            .filter(|f| f.name == key && f.inputs.len() == arg_count);
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    /// Looks an event up by name, signature or `0x`-prefixed topic hash.
    pub fn event(&self, key: &str) -> Option<&AbiEvent> {
        if let Some(topic) = key.strip_prefix("0x") {
            let topic = hex::decode(topic).ok()?;
            return self
                .events
                .iter()
                .find(|e| e.topic0().as_slice() == topic.as_slice());
        }
        if key.contains('(') {
            let wanted = normalize_signature(key)?;
            return self.events.iter().find(|e| e.signature() == wanted);
        }
        let mut matches = self.events.iter().filter(|e| e.name == key);
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    /// Finds the non-anonymous event whose topic0 equals `topic`.
    pub fn event_by_topic(&self, topic: &alloy_primitives::B256) -> Option<&AbiEvent> {
        self.events
            .iter()
            .find(|e| !e.anonymous && e.topic0() == *topic)
    }
}

/// Canonicalizes `name(uint, address)` to `name(uint256,address)`.
fn normalize_signature(key: &str) -> Option<String> {
    let open = key.find('(')?;
    let name = key[..open].trim();
    let close = open + matching_paren(&key[open..]).ok()?;
    let params = parse_params(&key[open + 1..close]).ok()?;
    let types: Vec<String> = params.iter().map(|p| p.ty.canonical()).collect();
    Some(format!("{name}({})", types.join(",")))
}

/// Parses one human-readable signature. Returns `None` for entry kinds that
/// are not modelled (constructor, error, fallback, receive).
fn parse_signature(line: &str) -> Result<Option<AbiItem>, EthError> {
    let head_end = line
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(line.len());
    let (keyword, rest) = match &line[..head_end] {
        kw @ ("function" | "event" | "constructor" | "error" | "fallback" | "receive") => {
            (kw, line[head_end..].trim_start())
        }
        _ => ("function", line),
    };

    match keyword {
        "constructor" | "error" | "fallback" | "receive" => return Ok(None),
        "function" | "event" => {}
        other => {
            return Err(EthError::InvalidAbi(format!(
                "unsupported signature kind {other:?} in {line:?}"
            )))
        }
    }

    let open = rest
        .find('(')
        .ok_or_else(|| EthError::InvalidAbi(format!("missing parameter list: {line:?}")))?;
    let name = rest[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(EthError::InvalidAbi(format!("invalid name in {line:?}")));
    }
    let close = open + matching_paren(&rest[open..])?;
    let inputs = parse_params(&rest[open + 1..close])?;
    let tail = rest[close + 1..].trim();

    if keyword == "event" {
        return Ok(Some(AbiItem::Event(AbiEvent {
            name: name.to_string(),
            inputs,
            anonymous: tail.split_whitespace().any(|w| w == "anonymous"),
        })));
    }

    let (modifiers, outputs) = match tail.find("returns") {
        Some(idx) => {
            let returns = tail[idx + "returns".len()..].trim_start();
            if !returns.starts_with('(') {
                return Err(EthError::InvalidAbi(format!("malformed returns clause: {line:?}")));
            }
            let close = matching_paren(returns)?;
            (&tail[..idx], parse_params(&returns[1..close])?)
        }
        None => (tail, Vec::new()),
    };

    let mut state_mutability = StateMutability::NonPayable;
    for word in modifiers.split_whitespace() {
        state_mutability = match word {
            "view" | "constant" => StateMutability::View,
            "pure" => StateMutability::Pure,
            "payable" => StateMutability::Payable,
            "nonpayable" => StateMutability::NonPayable,
            _ => state_mutability,
        };
    }

    Ok(Some(AbiItem::Function(AbiFunction {
        name: name.to_string(),
        inputs,
        outputs,
        state_mutability,
    })))
}

/// Parses a comma-separated parameter list: `address indexed from, uint amount`.
fn parse_params(list: &str) -> Result<Vec<AbiParameter>, EthError> {
    split_top_level(list)
        .into_iter()
        .map(parse_param)
        .collect()
}

fn parse_param(src: &str) -> Result<AbiParameter, EthError> {
    let src = src.trim();
    if src.is_empty() {
        return Err(EthError::InvalidAbi("empty parameter".into()));
    }

    let tuple_src = src
        .strip_prefix("tuple")
        .filter(|rest| rest.starts_with('('))
        .or_else(|| src.starts_with('(').then_some(src));

    let (ty, components, rest) = match tuple_src {
        Some(tuple) => {
            let close = matching_paren(tuple)?;
            let components = parse_params(&tuple[1..close])?;
            let after = &tuple[close + 1..];
            let suffix_end = after.find(char::is_whitespace).unwrap_or(after.len());
            let base = AbiType::Tuple(components.iter().map(|c| c.ty.clone()).collect());
            (wrap_arrays(base, &after[..suffix_end])?, components, &after[suffix_end..])
        }
        None => {
            let end = src.find(char::is_whitespace).unwrap_or(src.len());
            (AbiType::parse(&src[..end])?, Vec::new(), &src[end..])
        }
    };

    let mut param = AbiParameter {
        name: String::new(),
        ty,
        components,
        indexed: false,
    };
    for word in rest.split_whitespace() {
        match word {
            "indexed" => param.indexed = true,
            "memory" | "calldata" | "storage" | "payable" => {}
            name if param.name.is_empty() => param.name = name.to_string(),
            extra => {
                return Err(EthError::InvalidAbi(format!(
                    "unexpected token {extra:?} in parameter {src:?}"
                )))
            }
        }
    }
    Ok(param)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonEntry {
    Signature(String),
    Item(JsonItem),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonItem {
    #[serde(rename = "type", default = "default_item_type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<JsonParam>,
    #[serde(default)]
    outputs: Vec<JsonParam>,
    state_mutability: Option<StateMutability>,
    constant: Option<bool>,
    payable: Option<bool>,
    #[serde(default)]
    anonymous: bool,
}

fn default_item_type() -> String {
    "function".to_string()
}

#[derive(Deserialize)]
struct JsonParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    components: Vec<JsonParam>,
    #[serde(default)]
    indexed: bool,
}

impl JsonItem {
    fn into_abi_item(self) -> Result<Option<AbiItem>, EthError> {
        let inputs = convert_params(self.inputs)?;
        match self.kind.as_str() {
            "function" => {
                let state_mutability = match (self.state_mutability, self.constant, self.payable) {
                    (Some(m), _, _) => m,
                    (None, Some(true), _) => StateMutability::View,
                    (None, _, Some(true)) => StateMutability::Payable,
                    _ => StateMutability::NonPayable,
                };
                Ok(Some(AbiItem::Function(AbiFunction {
                    name: self.name,
                    inputs,
                    outputs: convert_params(self.outputs)?,
                    state_mutability,
                })))
            }
            "event" => Ok(Some(AbiItem::Event(AbiEvent {
                name: self.name,
                inputs,
                anonymous: self.anonymous,
            }))),
            "constructor" | "error" | "fallback" | "receive" => Ok(None),
            other => Err(EthError::InvalidAbi(format!("unknown ABI entry type {other:?}"))),
        }
    }
}

fn convert_params(params: Vec<JsonParam>) -> Result<Vec<AbiParameter>, EthError> {
    params.into_iter().map(convert_param).collect()
}

fn convert_param(param: JsonParam) -> Result<AbiParameter, EthError> {
    let components = convert_params(param.components)?;
    let ty = match param.ty.strip_prefix("tuple") {
        Some(suffix) => {
            let base = AbiType::Tuple(components.iter().map(|c| c.ty.clone()).collect());
            wrap_arrays(base, suffix)?
        }
        None => AbiType::parse(&param.ty)?,
    };
    Ok(AbiParameter {
        name: param.name,
        ty,
        components,
        indexed: param.indexed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_HUMAN: &str = r#"
        function name() view returns (string)
        function balanceOf(address owner) view returns (uint)
        function transfer(address to, uint amount) returns (bool)
        event Transfer(address indexed from, address indexed to, uint amount)
        constructor(string symbol)
    "#;

    #[test]
    fn parse_human_readable_erc20() {
        let abi = ContractAbi::parse(ERC20_HUMAN).unwrap();
        assert_eq!(abi.functions.len(), 3);
        assert_eq!(abi.events.len(), 1);

        let balance_of = abi.function("balanceOf").unwrap();
        assert_eq!(balance_of.signature(), "balanceOf(address)");
        assert_eq!(balance_of.outputs[0].ty, AbiType::Uint(256));
        assert!(balance_of.state_mutability.is_read_only());

        let transfer = abi.function("transfer").unwrap();
        assert_eq!(transfer.inputs[1].name, "amount");
        assert_eq!(transfer.state_mutability, StateMutability::NonPayable);

        let event = abi.event("Transfer").unwrap();
        assert_eq!(event.signature(), "Transfer(address,address,uint256)");
        assert!(event.inputs[0].indexed && event.inputs[1].indexed);
        assert!(!event.inputs[2].indexed);
    }

    #[test]
    fn lookup_by_signature_and_selector() {
        let abi = ContractAbi::parse(ERC20_HUMAN).unwrap();
        assert_eq!(
            abi.function("transfer(address, uint)").unwrap().name,
            "transfer"
        );
        assert_eq!(abi.function("0xa9059cbb").unwrap().name, "transfer");
        assert!(abi.function("approve").is_none());
        let topic = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
        assert_eq!(abi.event(topic).unwrap().name, "Transfer");
    }

    #[test]
    fn overloaded_names_need_arity() {
        let abi = ContractAbi::from_human_readable([
            "function safeTransferFrom(address from, address to, uint256 id)",
            "function safeTransferFrom(address from, address to, uint256 id, bytes data)",
        ])
        .unwrap();
        assert!(abi.function("safeTransferFrom").is_none());
        assert_eq!(
            abi.function_for_args("safeTransferFrom", 4).unwrap().inputs.len(),
            4
        );
    }

    #[test]
    fn parse_json_abi_with_tuples() {
        let json = r#"[
            {"type":"constructor","inputs":[]},
            {"type":"function","name":"submit","stateMutability":"payable",
             "inputs":[{"name":"orders","type":"tuple[]","components":[
                {"name":"maker","type":"address"},
                {"name":"amount","type":"uint256"}]}],
             "outputs":[]},
            {"type":"event","name":"Filled","anonymous":false,
             "inputs":[{"name":"id","type":"bytes32","indexed":true}]},
            {"type":"error","name":"Nope","inputs":[]},
            {"type":"receive","stateMutability":"payable"}
        ]"#;
        let abi = ContractAbi::parse(json).unwrap();
        assert_eq!(abi.functions.len(), 1);
        let submit = &abi.functions[0];
        assert_eq!(submit.signature(), "submit((address,uint256)[])");
        assert_eq!(submit.state_mutability, StateMutability::Payable);
        assert_eq!(submit.inputs[0].components[1].name, "amount");
        assert_eq!(abi.events[0].inputs[0].ty, AbiType::FixedBytes(32));
    }

    #[test]
    fn legacy_constant_flag_means_view() {
        let json = r#"[{"name":"decimals","constant":true,"inputs":[],
                        "outputs":[{"name":"","type":"uint8"}]}]"#;
        let abi = ContractAbi::from_json(json).unwrap();
        assert_eq!(abi.functions[0].state_mutability, StateMutability::View);
    }

    #[test]
    fn json_array_of_signature_strings() {
        let json = r#"["function decimals() view returns (uint8)"]"#;
        let abi = ContractAbi::from_json(json).unwrap();
        assert_eq!(abi.functions[0].outputs[0].ty, AbiType::Uint(8));
    }

    #[test]
    fn named_tuple_parameters() {
        let abi = ContractAbi::from_human_readable([
            "function fill((address maker, uint256 amount)[2] calldata orders) returns (bool ok)",
        ])
        .unwrap();
        let fill = &abi.functions[0];
        assert_eq!(fill.signature(), "fill((address,uint256)[2])");
        assert_eq!(fill.inputs[0].name, "orders");
        assert_eq!(fill.inputs[0].components[0].name, "maker");
    }

    #[test]
    fn malformed_signatures_fail() {
        assert!(ContractAbi::parse("function broken(address").is_err());
        assert!(ContractAbi::parse("modifier onlyOwner()").is_err());
        assert!(ContractAbi::parse("function f(uint7 x)").is_err());
        assert!(ContractAbi::from_json("{not json").is_err());
    }

    #[test]
    fn anonymous_event() {
        let abi = ContractAbi::parse("event Ping(uint256 n) anonymous").unwrap();
        assert!(abi.events[0].anonymous);
    }
}
