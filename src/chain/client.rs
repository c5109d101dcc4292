use async_trait::async_trait;

use super::types::{HeightRange, SortOrder, TxSearchPage};
use crate::error::ChainError;

/// Chain query interface consumed by the reconciliation scanner.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Latest committed block height.
    async fn current_height(&self) -> Result<u64, ChainError>;

    /// Transactions whose height falls inside `range`. Pages are 1-based.
    async fn search_transactions(
        &self,
        range: HeightRange,
        page: u32,
        per_page: u32,
        order: SortOrder,
    ) -> Result<TxSearchPage, ChainError>;
}
