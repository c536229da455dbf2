use std::fmt;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize, Serializer};

use crate::serde_helpers;
use crate::units::to_hex_quantity;

/// A log entry as returned by `eth_getLogs` and transaction receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub transaction_index: Option<u64>,
    #[serde(default, with = "serde_helpers::u64_opt")]
    pub log_index: Option<u64>,
    #[serde(default)]
    pub removed: bool,
}

impl Log {
    /// Delivery order key: `(blockNumber, logIndex)`, pending logs last.
    pub fn position(&self) -> (u64, u64) {
        (
            self.block_number.unwrap_or(u64::MAX),
            self.log_index.unwrap_or(u64::MAX),
        )
    }
}

/// A block reference: a height or one of the named tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlockTag {
    Number(u64),
    #[default]
    Latest,
    Earliest,
    Pending,
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTag::Number(n) => f.write_str(&to_hex_quantity(U256::from(*n))),
            BlockTag::Latest => f.write_str("latest"),
            BlockTag::Earliest => f.write_str("earliest"),
            BlockTag::Pending => f.write_str("pending"),
        }
    }
}

impl From<u64> for BlockTag {
    fn from(n: u64) -> Self {
        BlockTag::Number(n)
    }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Address part of a filter: one contract or any of several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AddressFilter {
    One(Address),
    Many(Vec<Address>),
}

impl AddressFilter {
    pub fn matches(&self, address: &Address) -> bool {
        match self {
            AddressFilter::One(a) => a == address,
            AddressFilter::Many(set) => set.contains(address),
        }
    }
}

impl From<Address> for AddressFilter {
    fn from(a: Address) -> Self {
        AddressFilter::One(a)
    }
}

impl From<Vec<Address>> for AddressFilter {
    fn from(set: Vec<Address>) -> Self {
        AddressFilter::Many(set)
    }
}

/// One position of a topic filter. Serializes to `null`, a hash, or an
/// array of hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopicFilter {
    #[default]
    Any,
    Exact(B256),
    OneOf(Vec<B256>),
}

impl TopicFilter {
    pub fn is_any(&self) -> bool {
        matches!(self, TopicFilter::Any)
    }

    fn matches(&self, topic: Option<&B256>) -> bool {
        match (self, topic) {
            (TopicFilter::Any, _) => true,
            (TopicFilter::Exact(want), Some(got)) => want == got,
            (TopicFilter::OneOf(set), Some(got)) => set.contains(got),
            (_, None) => false,
        }
    }
}

impl From<B256> for TopicFilter {
    fn from(topic: B256) -> Self {
        TopicFilter::Exact(topic)
    }
}

impl Serialize for TopicFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TopicFilter::Any => serializer.serialize_none(),
            TopicFilter::Exact(topic) => topic.serialize(serializer),
            TopicFilter::OneOf(set) => set.serialize(serializer),
        }
    }
}

/// An `eth_getLogs` query and the local matcher for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressFilter>,
    pub topics: Vec<TopicFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockTag>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: impl Into<AddressFilter>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn topics(mut self, topics: Vec<TopicFilter>) -> Self {
        self.topics = topics;
        self
    }

    /// Sets `topics[0]`, keeping any later positions.
    pub fn event_signature(mut self, topic0: B256) -> Self {
        if self.topics.is_empty() {
            self.topics.push(TopicFilter::Exact(topic0));
        } else {
            self.topics[0] = TopicFilter::Exact(topic0);
        }
        self
    }

    pub fn from_block(mut self, block: impl Into<BlockTag>) -> Self {
        self.from_block = Some(block.into());
        self
    }

    pub fn to_block(mut self, block: impl Into<BlockTag>) -> Self {
        self.to_block = Some(block.into());
        self
    }

    /// Same address and topics over a different block range.
    pub fn with_range(&self, from: BlockTag, to: BlockTag) -> Self {
        Self {
            from_block: Some(from),
            to_block: Some(to),
            ..self.clone()
        }
    }

    /// Applies the address and topic rules to `log`. The block range is not
    /// checked; it is enforced by the node.
    ///
    /// Topic position `i` matches when the filter entry is `Any`, or when the
    /// log has a topic at `i` that equals the entry (or one of its members).
    /// Log topics beyond the filter's length are ignored.
    pub fn matches(&self, log: &Log) -> bool {
        if let Some(address) = &self.address {
            if !address.matches(&log.address) {
                return false;
            }
        }
        self.topics
            .iter()
            .enumerate()
            .all(|(i, filter)| filter.matches(log.topics.get(i)))
    }
}
