/// One key/value pair attached to an emitted event, already decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// An event emitted while executing a transaction, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxEvent {
    pub kind: String,
    pub attributes: Vec<EventAttribute>,
}

impl TxEvent {
    pub fn new(kind: impl Into<String>, attributes: &[(&str, &str)]) -> Self {
        Self {
            kind: kind.into(),
            attributes: attributes
                .iter()
                .map(|(k, v)| EventAttribute {
                    key: k.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        }
    }

    /// First attribute value stored under `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// A committed transaction as reported by the chain's search interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTx {
    pub hash: String,
    pub height: u64,
    /// ABCI result code; zero means the transaction succeeded.
    pub code: u32,
    pub events: Vec<TxEvent>,
}

impl RawTx {
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

/// Inclusive block-height window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightRange {
    pub from: u64,
    pub to: u64,
}

impl HeightRange {
    pub fn contains(&self, height: u64) -> bool {
        height >= self.from && height <= self.to
    }

    /// Event query string understood by `tx_search`.
    pub fn to_query(&self) -> String {
        format!("tx.height >= {} AND tx.height <= {}", self.from, self.to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// A search hit whose height or event payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodedTx {
    pub hash: String,
    pub reason: String,
}

/// One page of search results plus the server-reported total across all pages.
///
/// Hits that fail to decode are kept apart in `undecoded` so one bad
/// transaction does not discard the rest of the page.
#[derive(Debug, Clone, Default)]
pub struct TxSearchPage {
    pub txs: Vec<RawTx>,
    pub undecoded: Vec<UndecodedTx>,
    pub total_count: u64,
}

impl TxSearchPage {
    /// Hits returned on this page, decoded or not.
    pub fn returned(&self) -> u64 {
        (self.txs.len() + self.undecoded.len()) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty() && self.undecoded.is_empty()
    }
}
