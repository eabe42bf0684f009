/// Maximum number of satoshis that can ever exist, used to bound individual
/// input/output amounts during isolated transaction validation.
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

/// Number of confirmations a coinbase output must accumulate before it is spendable.
pub const COINBASE_MATURITY: u32 = 100;

/// Activation height of the BIP34 rule requiring the coinbase scriptSig to
/// begin with the serialized block height.
pub const BIP34_ACTIVATION_HEIGHT: u32 = 227_835;

/// Activation height of the UAHF (Aug-2017) fork, past which non-coinbase
/// input unlocking scripts must be push-only.
pub const UAHF_FORK_HEIGHT: u32 = 478_559;

/// Header size in bytes: version(4) + prev_hash(32) + merkle_root(32) + time(4) + bits(4) + nonce(4).
pub const HEADER_SIZE: usize = 80;

/// Initial block subsidy, in satoshis.
pub const INITIAL_SUBSIDY: u64 = 50 * 100_000_000;

/// Number of blocks between subsidy halvings.
pub const SUBSIDY_HALVING_INTERVAL: u32 = 210_000;

/// The block subsidy due at `height`, halving every [`SUBSIDY_HALVING_INTERVAL`]
/// blocks until it reaches zero.
pub fn subsidy(height: u32) -> u64 {
    let halvings = height / SUBSIDY_HALVING_INTERVAL;
    if halvings >= 64 {
        return 0;
    }
    INITIAL_SUBSIDY >> halvings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsidy_at_genesis() {
        assert_eq!(subsidy(0), INITIAL_SUBSIDY);
    }

    #[test]
    fn test_subsidy_halves_on_schedule() {
        assert_eq!(subsidy(SUBSIDY_HALVING_INTERVAL), INITIAL_SUBSIDY / 2);
        assert_eq!(subsidy(SUBSIDY_HALVING_INTERVAL * 2), INITIAL_SUBSIDY / 4);
    }

    #[test]
    fn test_subsidy_eventually_reaches_zero() {
        assert_eq!(subsidy(SUBSIDY_HALVING_INTERVAL * 64), 0);
    }
}
