//! Session gateway for the Photon ledger.
//!
//! Wraps the node RPC behind [`ChainRpc`] and owns the set of accounts
//! that are currently signed in. The only way to prove a claimed posting
//! key controls an account is to exercise the signing path the chain
//! itself uses, so login signs a no-broadcast reference operation and
//! checks the recovered signer against the account's on-chain authority.

pub mod error;
pub mod gateway;
pub mod permlink;
pub mod rpc;

pub use error::ChainError;
pub use gateway::ChainGateway;
pub use permlink::derive_permlink;
pub use rpc::{AccountInfo, ChainRpc, HttpChainRpc, RpcError, SignedOperation};
