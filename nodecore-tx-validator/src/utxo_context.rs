use crate::script::{count_sig_ops, is_push_only, ScriptVerifier};
use nodecore_consensus_core::config::Config;
use nodecore_consensus_core::errors::TxRuleError;
use nodecore_consensus_core::tx::Tx;

/// Validation order steps 4-7: sig-op policy, the post-UAHF push-only rule,
/// the minimum relay fee, and script verification.
pub fn validate_in_utxo_context(tx: &Tx, config: &Config, at_block_height: u32, verifier: &dyn ScriptVerifier) -> Result<(), TxRuleError> {
    check_sig_op_count(tx, config)?;
    check_push_only_after_uahf(tx, config, at_block_height)?;
    check_min_relay_fee(tx, config)?;
    check_scripts(tx, verifier)?;
    Ok(())
}

fn total_sig_ops(tx: &Tx) -> u32 {
    tx.inputs.iter().map(|i| count_sig_ops(&i.unlocking_script)).sum::<u32>()
        + tx.outputs.iter().map(|o| count_sig_ops(&o.locking_script)).sum::<u32>()
}

fn check_sig_op_count(tx: &Tx, config: &Config) -> Result<(), TxRuleError> {
    let count = total_sig_ops(tx);
    if count > config.max_sig_ops {
        return Err(TxRuleError::TooManySigOps(count));
    }
    Ok(())
}

fn check_push_only_after_uahf(tx: &Tx, config: &Config, at_block_height: u32) -> Result<(), TxRuleError> {
    if at_block_height < config.uahf_fork_height || tx.is_coinbase() {
        return Ok(());
    }
    for (i, input) in tx.inputs.iter().enumerate() {
        if !is_push_only(&input.unlocking_script) {
            return Err(TxRuleError::NonPushOnlyScript(i));
        }
    }
    Ok(())
}

/// `fee = Σ inputs − Σ outputs`.
pub fn compute_fee(tx: &Tx) -> u64 {
    let total_in: u128 = tx.inputs.iter().map(|i| i.previous_satoshis as u128).sum();
    let total_out: u128 = tx.total_output_value();
    total_in.saturating_sub(total_out) as u64
}

fn check_min_relay_fee(tx: &Tx, config: &Config) -> Result<(), TxRuleError> {
    if tx.is_coinbase() {
        return Ok(());
    }
    let fee = compute_fee(tx);
    let size = tx.serialized_size();
    let required = config.min_relay_fee_per_byte.saturating_mul(size as u64);
    if fee < required {
        return Err(TxRuleError::FeeTooLow { fee, size });
    }
    Ok(())
}

fn check_scripts(tx: &Tx, verifier: &dyn ScriptVerifier) -> Result<(), TxRuleError> {
    if tx.is_coinbase() {
        return Ok(());
    }
    for (i, input) in tx.inputs.iter().enumerate() {
        if !verifier.verify(&input.unlocking_script, &input.previous_script, i) {
            return Err(TxRuleError::ScriptVerificationFailed(i));
        }
    }
    Ok(())
}
