use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::client::ChainClient;
use super::types::{HeightRange, RawTx, SortOrder, TxSearchPage, UndecodedTx};
use crate::error::ChainError;

/// Chain stand-in driven entirely by the test: a settable tip, a fixed set of
/// transactions, and a switch that makes every call fail.
#[derive(Default)]
pub struct ScriptedChain {
    tip: AtomicU64,
    txs: Mutex<Vec<RawTx>>,
    undecoded: Mutex<Vec<(u64, UndecodedTx)>>,
    failing: AtomicBool,
    search_delay: Mutex<Option<Duration>>,
    pub search_calls: AtomicU32,
}

impl ScriptedChain {
    pub fn new(tip: u64) -> Self {
        let chain = Self::default();
        chain.set_tip(tip);
        chain
    }

    pub fn set_tip(&self, tip: u64) {
        self.tip.store(tip, Ordering::SeqCst);
    }

    pub fn push_tx(&self, tx: RawTx) {
        self.txs.lock().unwrap().push(tx);
    }

    /// A hit at `height` that the client reports as undecodable.
    pub fn push_undecoded(&self, height: u64, hash: &str, reason: &str) {
        let tx = UndecodedTx {
            hash: hash.to_string(),
            reason: reason.to_string(),
        };
        self.undecoded.lock().unwrap().push((height, tx));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_search_delay(&self, delay: Duration) {
        *self.search_delay.lock().unwrap() = Some(delay);
    }

    fn check(&self) -> Result<(), ChainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc {
                code: -32603,
                message: "node unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn current_height(&self) -> Result<u64, ChainError> {
        self.check()?;
        Ok(self.tip.load(Ordering::SeqCst))
    }

    async fn search_transactions(
        &self,
        range: HeightRange,
        page: u32,
        per_page: u32,
        order: SortOrder,
    ) -> Result<TxSearchPage, ChainError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.search_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;

        let mut matching: Vec<(u64, Result<RawTx, UndecodedTx>)> = self
            .txs
            .lock()
            .unwrap()
            .iter()
            .map(|tx| (tx.height, Ok(tx.clone())))
            .chain(
                self.undecoded
                    .lock()
                    .unwrap()
                    .iter()
                    .map(|(height, tx)| (*height, Err(tx.clone()))),
            )
            .filter(|(height, _)| range.contains(*height))
            .collect();
        matching.sort_by_key(|(height, _)| *height);
        if order == SortOrder::Desc {
            matching.reverse();
        }

        let total_count = matching.len() as u64;
        let skip = (page.saturating_sub(1) * per_page) as usize;
        let (txs, undecoded): (Vec<_>, Vec<_>) = matching
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .map(|(_, hit)| hit)
            .partition(|hit| hit.is_ok());

        let txs = txs.into_iter().filter_map(Result::ok).collect();
        let undecoded = undecoded.into_iter().filter_map(Result::err).collect();

        Ok(TxSearchPage {
            txs,
            undecoded,
            total_count,
        })
    }
}
