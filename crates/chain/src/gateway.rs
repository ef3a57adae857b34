use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{B256, keccak256};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::ChainError;
use crate::permlink::derive_permlink;
use crate::rpc::{ChainRpc, RpcError, SignedOperation};

/// Fixed account used for the no-broadcast reference follow operation
/// that login signs to prove key ownership.
const REFERENCE_ACCOUNT: &str = "photon";

/// Session gateway over the node RPC.
///
/// Owns the authenticated-account map exclusively: an account is present
/// iff its posting key passed verification, and the stored signer is what
/// later broadcasts sign with. The map is in-process only; after a
/// restart every account is signed out and must re-enter its key.
pub struct ChainGateway {
    rpc: Arc<dyn ChainRpc>,
    accounts: RwLock<HashMap<String, PrivateKeySigner>>,
}

impl ChainGateway {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self {
            rpc,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub async fn account_exists(&self, name: &str) -> Result<bool, ChainError> {
        let account = self
            .rpc
            .get_account(name)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(account.is_some())
    }

    /// Verify that `key` controls `account` and mark the account as
    /// signed in. Every failure mode collapses into `InvalidCredential`;
    /// callers never need to distinguish causes.
    pub async fn login(&self, account: &str, key: &str) -> Result<(), ChainError> {
        match self.verify_key(account, key).await {
            Ok(signer) => {
                info!("Account signed in: {}", account);
                self.accounts
                    .write()
                    .await
                    .insert(account.to_string(), signer);
                Ok(())
            }
            Err(cause) => {
                debug!("Key verification failed for {}: {}", account, cause);
                Err(ChainError::InvalidCredential)
            }
        }
    }

    pub async fn logout(&self, account: &str) {
        if self.accounts.write().await.remove(account).is_some() {
            info!("Account signed out: {}", account);
        }
    }

    pub async fn is_logged_in(&self, account: &str) -> bool {
        self.accounts.read().await.contains_key(account)
    }

    /// Sign the reference operation for `account` without broadcasting.
    /// The photo API requires this as proof of key ownership when staging
    /// a post.
    pub async fn sign_challenge(&self, account: &str) -> Result<Value, ChainError> {
        let signer = self.signer_for(account).await?;
        let signed = sign_op(&signer, account, reference_op(account))?;
        serde_json::to_value(&signed).map_err(|e| ChainError::Rpc(e.to_string()))
    }

    /// Broadcast a staged post. `prepared` is the raw prepare-endpoint
    /// response; author, title and body are taken from its payload and
    /// the permlink is derived here. Returns the content identifier.
    pub async fn broadcast_post(&self, prepared: Value) -> Result<String, ChainError> {
        let payload = prepared.get("payload").cloned().unwrap_or(Value::Null);
        let author = payload
            .get("username")
            .and_then(Value::as_str)
            .ok_or_else(|| ChainError::Rpc("staged post has no username".to_string()))?
            .to_string();
        let title = payload
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let body = payload.get("body").cloned().unwrap_or(Value::Null);

        let mut meta = prepared.get("meta").cloned().unwrap_or_else(|| json!({}));
        if let Some(obj) = meta.as_object_mut() {
            // The API echoes its own routing info here; the chain does
            // not want it.
            obj.remove("extensions");
        }
        let beneficiaries = prepared
            .get("beneficiaries")
            .cloned()
            .unwrap_or(Value::Null);

        let permlink = derive_permlink(&title);
        let op = json!({
            "type": "post",
            "author": author,
            "permlink": permlink,
            "title": title,
            "body": body,
            "meta": meta,
            "beneficiaries": beneficiaries,
        });

        let signer = self.signer_for(&author).await?;
        let signed = sign_op(&signer, &author, op)?;
        self.rpc
            .broadcast(&signed)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(format!("@{author}/{permlink}"))
    }

    pub async fn broadcast_vote(&self, identifier: &str, voter: &str) -> Result<(), ChainError> {
        let signer = self.signer_for(voter).await?;
        let op = json!({
            "type": "vote",
            "voter": voter,
            "identifier": identifier,
            "weight": 10_000,
        });
        let signed = sign_op(&signer, voter, op)?;
        self.rpc
            .broadcast(&signed)
            .await
            .map_err(|e| map_post_rejection(e, identifier))
    }

    pub async fn broadcast_reply(
        &self,
        identifier: &str,
        author: &str,
        body: &str,
    ) -> Result<(), ChainError> {
        let signer = self.signer_for(author).await?;
        let op = json!({
            "type": "reply",
            "author": author,
            "identifier": identifier,
            "body": body,
        });
        let signed = sign_op(&signer, author, op)?;
        self.rpc
            .broadcast(&signed)
            .await
            .map_err(|e| map_post_rejection(e, identifier))
    }

    async fn signer_for(&self, account: &str) -> Result<PrivateKeySigner, ChainError> {
        self.accounts
            .read()
            .await
            .get(account)
            .cloned()
            .ok_or_else(|| ChainError::NotAuthenticated(account.to_string()))
    }

    async fn verify_key(&self, account: &str, key: &str) -> Result<PrivateKeySigner, String> {
        let signer: PrivateKeySigner =
            key.trim().parse().map_err(|e| format!("unparseable key: {e}"))?;

        let info = self
            .rpc
            .get_account(account)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("no such account: {account}"))?;

        let op = reference_op(account);
        let digest = op_digest(&op)?;
        let signature = signer
            .sign_hash_sync(&digest)
            .map_err(|e| format!("signing failed: {e}"))?;
        let recovered = signature
            .recover_address_from_prehash(&digest)
            .map_err(|e| format!("recovery failed: {e}"))?;

        if !recovered
            .to_string()
            .eq_ignore_ascii_case(&info.posting_authority)
        {
            return Err(format!("signer does not match posting authority of {account}"));
        }
        Ok(signer)
    }
}

fn reference_op(account: &str) -> Value {
    json!({
        "type": "follow",
        "follower": account,
        "following": REFERENCE_ACCOUNT,
        "what": ["blog"],
    })
}

fn op_digest(op: &Value) -> Result<B256, String> {
    // serde_json maps are ordered, so the byte encoding is canonical.
    let bytes = serde_json::to_vec(op).map_err(|e| e.to_string())?;
    Ok(keccak256(&bytes))
}

fn sign_op(
    signer: &PrivateKeySigner,
    account: &str,
    op: Value,
) -> Result<SignedOperation, ChainError> {
    let digest = op_digest(&op).map_err(ChainError::Rpc)?;
    let signature = signer
        .sign_hash_sync(&digest)
        .map_err(|e| ChainError::Rpc(e.to_string()))?;
    Ok(SignedOperation {
        account: account.to_string(),
        op,
        signature: hex::encode(signature.as_bytes()),
    })
}

fn map_post_rejection(err: RpcError, identifier: &str) -> ChainError {
    match err {
        RpcError::PostNotFound => ChainError::PostNotFound(identifier.to_string()),
        RpcError::AlreadyVoted => ChainError::AlreadyVoted(identifier.to_string()),
        other => ChainError::Rpc(other.to_string()),
    }
}
