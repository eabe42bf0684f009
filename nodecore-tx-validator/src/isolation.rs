use nodecore_consensus_core::config::Config;
use nodecore_consensus_core::constants::MAX_MONEY;
use nodecore_consensus_core::errors::TxRuleError;
use nodecore_consensus_core::tx::Tx;
use std::collections::HashSet;

/// Validation order steps 1-3: shape and value-range checks that require no
/// external state (no UTXO lookups, no script interpreter).
pub fn validate_in_isolation(tx: &Tx, config: &Config) -> Result<(), TxRuleError> {
    check_non_empty(tx)?;
    check_size(tx, config)?;
    check_no_duplicate_inputs(tx)?;
    check_input_value_ranges(tx)?;
    check_output_value_ranges(tx)?;
    Ok(())
}

fn check_non_empty(tx: &Tx) -> Result<(), TxRuleError> {
    if !tx.is_coinbase() && tx.inputs.is_empty() {
        return Err(TxRuleError::NoInputs);
    }
    if tx.outputs.is_empty() {
        return Err(TxRuleError::NoOutputs);
    }
    Ok(())
}

fn check_size(tx: &Tx, config: &Config) -> Result<(), TxRuleError> {
    let size = tx.serialized_size();
    if size > config.max_tx_size {
        return Err(TxRuleError::SizeTooLarge(size));
    }
    Ok(())
}

fn check_no_duplicate_inputs(tx: &Tx) -> Result<(), TxRuleError> {
    let mut seen = HashSet::new();
    for input in &tx.inputs {
        if !seen.insert(input.previous_outpoint) {
            return Err(TxRuleError::DuplicateInput(input.previous_outpoint));
        }
    }
    Ok(())
}

fn check_input_value_ranges(tx: &Tx) -> Result<(), TxRuleError> {
    if tx.is_coinbase() {
        return Ok(());
    }
    for input in &tx.inputs {
        if input.previous_satoshis > MAX_MONEY {
            return Err(TxRuleError::OutputValueTooHigh(input.previous_satoshis));
        }
    }
    Ok(())
}

fn check_output_value_ranges(tx: &Tx) -> Result<(), TxRuleError> {
    let mut total: u128 = 0;
    for output in &tx.outputs {
        if output.satoshis > MAX_MONEY {
            return Err(TxRuleError::OutputValueTooHigh(output.satoshis));
        }
        total += output.satoshis as u128;
    }
    if total > MAX_MONEY as u128 {
        return Err(TxRuleError::TotalValueTooHigh(total));
    }
    Ok(())
}
