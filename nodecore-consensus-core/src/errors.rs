use crate::hash::Hash;
use thiserror::Error;

/// The top-level taxonomy every component surfaces to its caller. Only
/// `Storage` and `Service` are transient/retryable; everything else reflects
/// a permanent fact about the request and should not be retried as-is.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid transaction: {0}")]
    InvalidTx(#[from] TxRuleError),

    #[error("invalid block: {0}")]
    InvalidBlock(#[from] BlockRuleError),

    #[error("double spend on utxo {0}")]
    DoubleSpend(Hash),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("processing error: {0}")]
    Processing(String),
}

impl NodeError {
    /// Whether the caller may reasonably retry the same request unmodified.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NodeError::Storage(_) | NodeError::Service(_))
    }
}

pub type NodeResult<T> = Result<T, NodeError>;

/// Violations detected while validating a transaction in isolation or against
/// the UTXO set, in the order the tx validator checks them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxRuleError {
    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("transaction size {0} exceeds the maximum")]
    SizeTooLarge(usize),

    #[error("duplicate input at outpoint {0:?}")]
    DuplicateInput(crate::tx::TransactionOutpoint),

    #[error("output value {0} exceeds MAX_MONEY")]
    OutputValueTooHigh(u64),

    #[error("total output value {0} exceeds MAX_MONEY")]
    TotalValueTooHigh(u128),

    #[error("too many signature operations: {0}")]
    TooManySigOps(u32),

    #[error("non-push-only unlocking script on input {0} after the UAHF fork height")]
    NonPushOnlyScript(usize),

    #[error("fee {fee} below minimum relay fee for {size} bytes")]
    FeeTooLow { fee: u64, size: usize },

    #[error("script verification failed on input {0}")]
    ScriptVerificationFailed(usize),

    #[error("missing utxo entry for outpoint {0:?}")]
    MissingUtxoEntry(crate::tx::TransactionOutpoint),

    #[error("utxo-hash mismatch for outpoint {0:?}")]
    UtxoHashMismatch(crate::tx::TransactionOutpoint),

    #[error("spend of immature coinbase output at outpoint {0:?}")]
    ImmatureCoinbaseSpend(crate::tx::TransactionOutpoint),
}

/// Violations detected while validating a candidate block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockRuleError {
    #[error("block {0} already known")]
    DuplicateBlock(Hash),

    #[error("block header failed to parse")]
    MalformedHeader,

    #[error("merkle root mismatch: header has {header}, computed {computed}")]
    MerkleRootMismatch { header: Hash, computed: Hash },

    #[error("proof of work target not met")]
    InsufficientWork,

    #[error("block timestamp is too far in the future")]
    TimestampTooFarInFuture,

    #[error("block {0} is marked invalid")]
    AncestorInvalid(Hash),

    #[error("coinbase height mismatch: expected {expected}, found {found}")]
    CoinbaseHeightMismatch { expected: u32, found: u32 },

    #[error("coinbase not committed into subtree 0: expected leaf {expected}, found {found}")]
    CoinbaseNotCommitted { expected: Hash, found: Hash },

    #[error("catch-up header walk reached the zero hash without finding a known ancestor")]
    CatchupExhausted,

    #[error("no common ancestor within max_rollback")]
    NoCommonAncestor,
}
