//! Node glue: configuration, ledger, engine, and submission entry point.
//!
//! [`Node`] is the single mutation entry point the control plane goes
//! through. The RPC layer serializes access to it, so everything here can
//! assume exclusive ownership for the duration of one call.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::NodeConfig;
use crate::consensus::{ConsensusEngine, ConsensusError, TickOutcome};
use crate::ledger::LedgerManager;
use crate::pipeline::{PipelineError, Receipt, Transaction};
use crate::types::{AccountId, Drops, Hash256};

/// Submission failures surfaced over RPC with stable strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Blob is not valid hex or does not decode as a transaction.
    #[error("InvalidTxBlob")]
    InvalidTxBlob,
}

impl From<PipelineError> for SubmitError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::InvalidTxBlob => SubmitError::InvalidTxBlob,
        }
    }
}

/// A running node: config, ledger state, and the consensus engine.
#[derive(Debug)]
pub struct Node {
    pub config: NodeConfig,
    pub ledger: LedgerManager,
    pub engine: ConsensusEngine,
    /// Seconds of uptime as supplied by the embedding process; the node
    /// itself never reads a clock.
    pub uptime_secs: u64,
    /// Bodies of applied transactions, for expanded `ledger` responses.
    tx_store: BTreeMap<Hash256, Transaction>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        let engine = ConsensusEngine::new(config.consensus.clone());
        Self {
            config,
            ledger: LedgerManager::new(),
            engine,
            uptime_secs: 0,
            tx_store: BTreeMap::new(),
        }
    }

    /// Funds an account at genesis, outside the pipeline.
    pub fn genesis_fund(&mut self, id: AccountId, balance: Drops) {
        self.ledger.genesis_fund(id, balance);
    }

    /// Hex-decodes and applies a submitted transaction blob.
    ///
    /// Successful applications are admitted to the consensus engine and
    /// remembered for expanded ledger queries. The fee debit and
    /// sequence bump are atomic with the application itself.
    pub fn submit_blob(&mut self, blob_hex: &str) -> Result<(Transaction, Receipt), SubmitError> {
        let blob = hex::decode(blob_hex).map_err(|_| SubmitError::InvalidTxBlob)?;
        let tx = Transaction::decode(&blob)?;

        let receipt = self.ledger.apply_transaction(&tx, &self.config.fees);
        if receipt.result.is_success() {
            self.engine.admit_tx(receipt.tx_hash);
            self.tx_store.insert(receipt.tx_hash, tx);
        }
        Ok((tx, receipt))
    }

    /// Looks up an applied transaction body by hash.
    pub fn stored_tx(&self, hash: &Hash256) -> Option<&Transaction> {
        self.tx_store.get(hash)
    }

    /// Transactions sitting in the open ledger awaiting a close.
    pub fn pending_transactions(&self) -> usize {
        self.ledger.open_transaction_count()
    }

    /// Drives one consensus round to a terminal outcome and seals the
    /// open ledger on Accept.
    ///
    /// Submitted transactions are already applied to the open ledger, so
    /// an accepted position over them closes that ledger as-is; the
    /// engine hands the decision back and the manager does the sealing.
    pub fn run_round(
        &mut self,
        start_ms: u64,
        close_time: u64,
    ) -> Result<TickOutcome, ConsensusError> {
        self.engine.start_round(start_ms);
        let budget = self.engine.config().max_iterations.max(1);

        for t in 1..=budget {
            match self.engine.tick(start_ms + u64::from(t) * 100)? {
                TickOutcome::Pending => continue,
                outcome @ TickOutcome::Accepted(_) => {
                    self.ledger.close_ledger(close_time);
                    return Ok(outcome);
                }
                outcome => return Ok(outcome),
            }
        }
        // tick() stalls the round at max_iterations, so the loop cannot
        // fall through with a live round.
        Err(ConsensusError::Stalled(budget))
    }

    /// Advertised server state, derived from the active profile.
    pub fn server_state(&self) -> &'static str {
        match self.config.agent.profile {
            crate::config::Profile::Research => "proposing",
            crate::config::Profile::Production => "full",
        }
    }
}
