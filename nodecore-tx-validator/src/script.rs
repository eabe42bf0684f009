use nodecore_consensus_core::tx::ScriptBytes;

const OP_CHECKSIG: u8 = 0xac;
const OP_CHECKSIGVERIFY: u8 = 0xad;
const OP_CHECKMULTISIG: u8 = 0xae;
const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_1NEGATE: u8 = 0x4f;
const OP_16: u8 = 0x60;

/// Counts signature operations in a script, using the classic non-accurate
/// (pre-execution) heuristic: every `OP_CHECKSIG`/`OP_CHECKSIGVERIFY` counts
/// as 1, every `OP_CHECKMULTISIG`/`OP_CHECKMULTISIGVERIFY` counts as 20 since
/// the real multisig key count isn't known without interpreting the script.
pub fn count_sig_ops(script: &[u8]) -> u32 {
    let mut count = 0u32;
    let mut i = 0;
    while i < script.len() {
        let opcode = script[i];
        match opcode {
            OP_CHECKSIG | OP_CHECKSIGVERIFY => count += 1,
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => count += 20,
            _ => {}
        }
        i += 1 + push_data_len(script, i, opcode);
    }
    count
}

fn push_data_len(script: &[u8], i: usize, opcode: u8) -> usize {
    match opcode {
        0x01..=0x4b => opcode as usize,
        OP_PUSHDATA1 => script.get(i + 1).map(|&n| 1 + n as usize).unwrap_or(0),
        OP_PUSHDATA2 => 2,
        OP_PUSHDATA4 => 4,
        _ => 0,
    }
}

/// Whether every opcode in `script` is a push operation (a literal data push
/// or a small-integer constant), the rule the UAHF fork applies to every
/// non-coinbase unlocking script.
pub fn is_push_only(script: &ScriptBytes) -> bool {
    let mut i = 0;
    while i < script.len() {
        let opcode = script[i];
        let is_push = matches!(opcode, 0x00..=0x4e | OP_1NEGATE | 0x51..=OP_16);
        if !is_push {
            return false;
        }
        i += 1 + push_data_len(script, i, opcode);
    }
    true
}

/// Verifies an unlocking script against its previous locking script. Script
/// interpretation itself is an external collaborator (per scope): this
/// trait is the seam a real interpreter plugs into; validators are
/// generic over it so tests can substitute a trivial stand-in.
pub trait ScriptVerifier: Send + Sync {
    fn verify(&self, unlocking_script: &[u8], locking_script: &[u8], input_index: usize) -> bool;
}

/// A verifier that accepts everything, used only where no interpreter is
/// wired in (unit tests exercising the surrounding protocol).
pub struct AcceptAllVerifier;

impl ScriptVerifier for AcceptAllVerifier {
    fn verify(&self, _unlocking_script: &[u8], _locking_script: &[u8], _input_index: usize) -> bool {
        true
    }
}
