mod isolation;
mod script;
mod utxo_context;
mod validator;

pub use script::{AcceptAllVerifier, ScriptVerifier};
pub use validator::TxValidator;
