// Chain access: address encodings, the query interface, and its RPC implementation
pub mod address;
pub mod client;
pub mod tendermint;
pub mod types;

#[cfg(test)]
pub mod mock;

pub use address::{Address, AddressCodec};
pub use client::ChainClient;
pub use tendermint::{fetch_evm_chain_id, TendermintClient};
pub use types::{HeightRange, RawTx, SortOrder, TxEvent};
