//! # Tessera KMS Engine
//!
//! An in-memory emulation of a cloud key-management service for local
//! development and testing. No network, no disk: every key lives in process
//! memory and is gone on restart, which is the point.
//!
//! ## Features
//!
//! - Key lifecycle: create, describe, enable, disable, list, tag, alias
//! - Envelope encryption: Encrypt/Decrypt/ReEncrypt/GenerateDataKey over
//!   AES-256-GCM with encryption-context binding
//! - Self-describing ciphertext blobs that round-trip through Decrypt and
//!   ReEncrypt without the caller naming a key
//! - Faithful error codes for the unsupported surface (grants, rotation,
//!   scheduled deletion, policy writes)
//!
//! ## Ciphertext Format
//!
//! Ciphertext blobs are a versioned binary container carrying the producing
//! key's id, the AEAD nonce, and the tagged ciphertext (the codec module
//! documents the exact layout); on the wire they appear only base64-encoded.
//!
//! ## Concurrency
//!
//! One process-wide mutex serializes every operation that touches the
//! registry. Operations are synchronous and do no I/O, so the critical
//! section is short and there is nothing to await.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod blob;
mod context;
mod registry;

pub mod error;
pub mod types;

pub use error::KmsError;

use std::sync::{Mutex, MutexGuard, PoisonError};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, info};
use zeroize::Zeroizing;

use tessera_crypto::{aead, random};

use registry::{KeyRecord, Registry};
use types::*;

/// Lower bound for GenerateRandom and explicit data-key sizes.
const MIN_RANDOM_BYTES: u32 = 1;
/// Upper bound for GenerateRandom and explicit data-key sizes.
const MAX_RANDOM_BYTES: u32 = 1024;

/// The KMS Engine: the key registry plus the envelope-encryption operations.
///
/// Cheap to share behind an `Arc`; all methods take `&self` and synchronize
/// internally.
pub struct KmsEngine {
    registry: Mutex<Registry>,
}

impl KmsEngine {
    /// Creates an engine with an empty registry.
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
        }
    }

    /// Acquires the registry lock.
    ///
    /// A poisoned lock is taken over rather than propagated: the registry
    /// is mutated in single atomic steps, so a panicking holder cannot have
    /// left it half-written.
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Random
    // ========================================================================

    /// Returns cryptographically secure random bytes.
    ///
    /// Touches no registry state and takes no lock.
    pub fn generate_random(
        &self,
        req: &GenerateRandomRequest,
    ) -> Result<GenerateRandomResult, KmsError> {
        if !(MIN_RANDOM_BYTES..=MAX_RANDOM_BYTES).contains(&req.number_of_bytes) {
            return Err(KmsError::InvalidParameter(format!(
                "NumberOfBytes must be between {} and {}",
                MIN_RANDOM_BYTES, MAX_RANDOM_BYTES
            )));
        }

        let bytes = random::generate_bytes(req.number_of_bytes as usize);
        Ok(GenerateRandomResult {
            plaintext: BASE64.encode(&*bytes),
        })
    }

    // ========================================================================
    // Key Management
    // ========================================================================

    /// Creates a key and returns its metadata.
    pub fn create_key(&self, req: &CreateKeyRequest) -> Result<CreateKeyResult, KmsError> {
        let key_usage = match req.key_usage.as_deref() {
            None | Some("") | Some("ENCRYPT_DECRYPT") => KeyUsage::EncryptDecrypt,
            Some(other) => {
                return Err(KmsError::InvalidParameter(format!(
                    "unsupported key usage: {}",
                    other
                )))
            }
        };

        let origin = match req.origin.as_deref() {
            None | Some("") | Some("AWS_KMS") => KeyOrigin::AwsKms,
            Some("EXTERNAL") => KeyOrigin::External,
            Some(other) => {
                return Err(KmsError::InvalidParameter(format!(
                    "unsupported origin: {}",
                    other
                )))
            }
        };

        if req.policy.as_deref().is_some_and(|p| !p.is_empty()) {
            return Err(KmsError::Unsupported("key policies"));
        }

        let tags = req
            .tags
            .iter()
            .map(|tag| (tag.tag_key.clone(), tag.tag_value.clone()))
            .collect();

        let meta = self
            .registry()
            .create_key(req.description.clone(), key_usage, origin, tags);

        info!(key_id = %meta.key_id, origin = %meta.origin, state = %meta.key_state, "Key created");

        Ok(CreateKeyResult { key_metadata: meta })
    }

    /// Returns a key's metadata. The key may be in any state.
    pub fn describe_key(&self, req: &DescribeKeyRequest) -> Result<DescribeKeyResult, KmsError> {
        reject_grant_tokens(&req.grant_tokens)?;

        let registry = self.registry();
        let record = registry.resolve(&req.key_id)?;

        Ok(DescribeKeyResult {
            key_metadata: record.meta.clone(),
        })
    }

    /// Lists every key, ordered by bare id.
    pub fn list_keys(&self, req: &ListKeysRequest) -> Result<ListKeysResult, KmsError> {
        check_pagination(req.marker.as_deref(), req.limit)?;

        let registry = self.registry();
        let keys = registry
            .keys()
            .map(|record| KeyListEntry {
                key_arn: record.meta.arn.clone(),
                key_id: record.meta.key_id.clone(),
            })
            .collect();

        Ok(ListKeysResult {
            keys,
            next_marker: None,
            truncated: false,
        })
    }

    /// Enables a key.
    pub fn enable_key(&self, req: &EnableKeyRequest) -> Result<(), KmsError> {
        let mut registry = self.registry();
        registry.resolve_mut(&req.key_id)?.enable()?;
        info!(key_id = %req.key_id, "Key enabled");
        Ok(())
    }

    /// Disables a key. Cryptographic operations against it fail until it is
    /// re-enabled.
    pub fn disable_key(&self, req: &DisableKeyRequest) -> Result<(), KmsError> {
        let mut registry = self.registry();
        registry.resolve_mut(&req.key_id)?.disable()?;
        info!(key_id = %req.key_id, "Key disabled");
        Ok(())
    }

    /// Replaces a key's description. Allowed in any state.
    pub fn update_key_description(
        &self,
        req: &UpdateKeyDescriptionRequest,
    ) -> Result<(), KmsError> {
        let mut registry = self.registry();
        let record = registry.resolve_mut(&req.key_id)?;
        record.meta.description = req.description.clone();
        debug!(key_id = %record.meta.key_id, "Key description updated");
        Ok(())
    }

    /// Not implemented; keys cannot be deleted.
    pub fn schedule_key_deletion(
        &self,
        _req: &ScheduleKeyDeletionRequest,
    ) -> Result<ScheduleKeyDeletionResult, KmsError> {
        Err(KmsError::Unsupported("key deletion scheduling"))
    }

    /// Not implemented; keys cannot be deleted, so there is nothing to cancel.
    pub fn cancel_key_deletion(
        &self,
        _req: &CancelKeyDeletionRequest,
    ) -> Result<CancelKeyDeletionResult, KmsError> {
        Err(KmsError::Unsupported("key deletion cancellation"))
    }

    // ========================================================================
    // Rotation
    // ========================================================================

    /// Reports rotation status for a key. Rotation is never enabled.
    pub fn get_key_rotation_status(
        &self,
        req: &GetKeyRotationStatusRequest,
    ) -> Result<GetKeyRotationStatusResult, KmsError> {
        let registry = self.registry();
        registry.resolve(&req.key_id)?;

        Ok(GetKeyRotationStatusResult {
            key_rotation_enabled: false,
        })
    }

    /// Not implemented.
    pub fn enable_key_rotation(&self, _req: &EnableKeyRotationRequest) -> Result<(), KmsError> {
        Err(KmsError::Unsupported("key rotation"))
    }

    /// Not implemented.
    pub fn disable_key_rotation(&self, _req: &DisableKeyRotationRequest) -> Result<(), KmsError> {
        Err(KmsError::Unsupported("key rotation"))
    }

    // ========================================================================
    // Policies
    // ========================================================================

    /// Lists a key's policy names, ordered lexicographically.
    pub fn list_key_policies(
        &self,
        req: &ListKeyPoliciesRequest,
    ) -> Result<ListKeyPoliciesResult, KmsError> {
        check_pagination(req.marker.as_deref(), req.limit)?;

        let registry = self.registry();
        let record = registry.resolve(&req.key_id)?;

        Ok(ListKeyPoliciesResult {
            policy_names: record.policies.keys().cloned().collect(),
            next_marker: None,
            truncated: false,
        })
    }

    /// Returns a named policy document for a key.
    pub fn get_key_policy(&self, req: &GetKeyPolicyRequest) -> Result<GetKeyPolicyResult, KmsError> {
        let registry = self.registry();
        let record = registry.resolve(&req.key_id)?;

        let policy = record
            .policies
            .get(&req.policy_name)
            .ok_or_else(|| KmsError::NotFound(req.policy_name.clone()))?;

        Ok(GetKeyPolicyResult {
            policy: policy.clone(),
        })
    }

    /// Not implemented; the policy surface is read-only.
    pub fn put_key_policy(&self, _req: &PutKeyPolicyRequest) -> Result<(), KmsError> {
        Err(KmsError::Unsupported("key policy writes"))
    }

    // ========================================================================
    // Aliases
    // ========================================================================

    /// Lists every alias, ordered by name.
    pub fn list_aliases(&self, req: &ListAliasesRequest) -> Result<ListAliasesResult, KmsError> {
        check_pagination(req.marker.as_deref(), req.limit)?;

        let registry = self.registry();
        let aliases = registry
            .aliases()
            .map(|(name, target_key_id)| AliasListEntry {
                alias_arn: registry::alias_arn(name),
                alias_name: name.to_string(),
                target_key_id: target_key_id.to_string(),
            })
            .collect();

        Ok(ListAliasesResult {
            aliases,
            next_marker: None,
            truncated: false,
        })
    }

    /// Points a new alias at a key.
    pub fn create_alias(&self, req: &CreateAliasRequest) -> Result<(), KmsError> {
        let mut registry = self.registry();
        registry.create_alias(&req.alias_name, &req.target_key_id)?;
        info!(alias = %req.alias_name, target = %req.target_key_id, "Alias created");
        Ok(())
    }

    /// Repoints an existing alias at another key.
    pub fn update_alias(&self, req: &UpdateAliasRequest) -> Result<(), KmsError> {
        let mut registry = self.registry();
        registry.update_alias(&req.alias_name, &req.target_key_id)?;
        info!(alias = %req.alias_name, target = %req.target_key_id, "Alias updated");
        Ok(())
    }

    /// Deletes an alias. The target key is untouched.
    pub fn delete_alias(&self, req: &DeleteAliasRequest) -> Result<(), KmsError> {
        let mut registry = self.registry();
        registry.delete_alias(&req.alias_name)?;
        info!(alias = %req.alias_name, "Alias deleted");
        Ok(())
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Lists a key's tags, ordered by tag key.
    pub fn list_resource_tags(
        &self,
        req: &ListResourceTagsRequest,
    ) -> Result<ListResourceTagsResult, KmsError> {
        check_pagination(req.marker.as_deref(), req.limit)?;

        let registry = self.registry();
        let record = registry.resolve(&req.key_id)?;

        let tags = record
            .tags
            .iter()
            .map(|(key, value)| Tag {
                tag_key: key.clone(),
                tag_value: value.clone(),
            })
            .collect();

        Ok(ListResourceTagsResult {
            tags,
            next_marker: None,
            truncated: false,
        })
    }

    /// Adds or overwrites tags on a key.
    pub fn tag_resource(&self, req: &TagResourceRequest) -> Result<(), KmsError> {
        let mut registry = self.registry();
        let record = registry.resolve_mut(&req.key_id)?;

        for tag in &req.tags {
            record.tags.insert(tag.tag_key.clone(), tag.tag_value.clone());
        }

        debug!(key_id = %record.meta.key_id, count = req.tags.len(), "Tags added");
        Ok(())
    }

    /// Removes tags from a key by tag key. Missing keys are ignored.
    pub fn untag_resource(&self, req: &UntagResourceRequest) -> Result<(), KmsError> {
        let mut registry = self.registry();
        let record = registry.resolve_mut(&req.key_id)?;

        for tag_key in &req.tag_keys {
            record.tags.remove(tag_key);
        }

        debug!(key_id = %record.meta.key_id, count = req.tag_keys.len(), "Tags removed");
        Ok(())
    }

    // ========================================================================
    // Grants
    // ========================================================================

    /// Lists grants for a key. The grant table is permanently empty because
    /// grant creation is unsupported.
    pub fn list_grants(&self, req: &ListGrantsRequest) -> Result<ListGrantsResult, KmsError> {
        check_pagination(req.marker.as_deref(), req.limit)?;

        let registry = self.registry();
        let grants = registry
            .grants()
            .filter(|grant| grant.key_id == req.key_id)
            .cloned()
            .collect();

        Ok(ListGrantsResult {
            grants,
            next_marker: None,
            truncated: false,
        })
    }

    /// Lists grants retireable by a principal. See [`KmsEngine::list_grants`].
    pub fn list_retireable_grants(
        &self,
        req: &ListRetireableGrantsRequest,
    ) -> Result<ListGrantsResult, KmsError> {
        check_pagination(req.marker.as_deref(), req.limit)?;

        let registry = self.registry();
        let grants = registry
            .grants()
            .filter(|grant| grant.retiring_principal == req.retiring_principal)
            .cloned()
            .collect();

        Ok(ListGrantsResult {
            grants,
            next_marker: None,
            truncated: false,
        })
    }

    /// Not implemented.
    pub fn create_grant(&self, _req: &CreateGrantRequest) -> Result<CreateGrantResult, KmsError> {
        Err(KmsError::GrantsNotSupported)
    }

    /// Retires a grant by token, or by key id and grant id.
    pub fn retire_grant(&self, req: &RetireGrantRequest) -> Result<(), KmsError> {
        let mut registry = self.registry();

        if !req.grant_token.is_empty() {
            registry.remove_grant_by_token(&req.grant_token);
            return Ok(());
        }

        let token = registry
            .find_grant_token(&req.key_id, &req.grant_id)
            .ok_or_else(|| KmsError::NotFound(req.grant_id.clone()))?;
        registry.remove_grant_by_token(&token);
        Ok(())
    }

    /// Revokes a grant by key id and grant id.
    pub fn revoke_grant(&self, req: &RevokeGrantRequest) -> Result<(), KmsError> {
        let mut registry = self.registry();

        let token = registry
            .find_grant_token(&req.key_id, &req.grant_id)
            .ok_or_else(|| KmsError::NotFound(req.grant_id.clone()))?;
        registry.remove_grant_by_token(&token);
        Ok(())
    }

    // ========================================================================
    // Crypto Operations
    // ========================================================================

    /// Generates a data key and returns it wrapped under the named key,
    /// together with its raw bytes.
    pub fn generate_data_key(
        &self,
        req: &GenerateDataKeyRequest,
    ) -> Result<GenerateDataKeyResult, KmsError> {
        self.do_generate_data_key(req, true)
    }

    /// Generates a data key and returns only the wrapped copy.
    pub fn generate_data_key_without_plaintext(
        &self,
        req: &GenerateDataKeyRequest,
    ) -> Result<GenerateDataKeyResult, KmsError> {
        self.do_generate_data_key(req, false)
    }

    fn do_generate_data_key(
        &self,
        req: &GenerateDataKeyRequest,
        with_plaintext: bool,
    ) -> Result<GenerateDataKeyResult, KmsError> {
        reject_grant_tokens(&req.grant_tokens)?;

        let len = data_key_len(req)?;

        let registry = self.registry();
        let record = registry.resolve_enabled(&req.key_id)?;

        let plaintext = random::generate_bytes(len);
        let ciphertext = seal_with(record, req.encryption_context.as_ref(), &plaintext)?;

        Ok(GenerateDataKeyResult {
            ciphertext_blob: BASE64.encode(&ciphertext),
            key_id: record.meta.key_id.clone(),
            plaintext: with_plaintext.then(|| BASE64.encode(&*plaintext)),
        })
    }

    /// Encrypts caller-supplied plaintext under the named key.
    pub fn encrypt(&self, req: &EncryptRequest) -> Result<EncryptResult, KmsError> {
        reject_grant_tokens(&req.grant_tokens)?;

        let registry = self.registry();
        let record = registry.resolve_enabled(&req.key_id)?;

        let plaintext = decode_plaintext_param(&req.plaintext)?;
        let ciphertext = seal_with(record, req.encryption_context.as_ref(), &plaintext)?;

        Ok(EncryptResult {
            ciphertext_blob: BASE64.encode(&ciphertext),
            key_id: record.meta.key_id.clone(),
        })
    }

    /// Decrypts a ciphertext blob. The blob names its own key; the caller
    /// only re-supplies the encryption context.
    pub fn decrypt(&self, req: &DecryptRequest) -> Result<DecryptResult, KmsError> {
        reject_grant_tokens(&req.grant_tokens)?;

        let blob_bytes = decode_blob_param(&req.ciphertext_blob)?;

        let registry = self.registry();
        let (key_id, plaintext) =
            open_blob(&registry, &blob_bytes, req.encryption_context.as_ref())?;

        Ok(DecryptResult {
            key_id,
            plaintext: BASE64.encode(&*plaintext),
        })
    }

    /// Decrypts a blob under its source key and context, then seals the
    /// recovered plaintext under the destination key and context. The
    /// plaintext never leaves the engine.
    pub fn re_encrypt(&self, req: &ReEncryptRequest) -> Result<ReEncryptResult, KmsError> {
        reject_grant_tokens(&req.grant_tokens)?;

        let blob_bytes = decode_blob_param(&req.ciphertext_blob)?;

        let registry = self.registry();
        let (source_key_id, plaintext) = open_blob(
            &registry,
            &blob_bytes,
            req.source_encryption_context.as_ref(),
        )?;

        let destination = registry.resolve_enabled(&req.destination_key_id)?;
        let ciphertext = seal_with(
            destination,
            req.destination_encryption_context.as_ref(),
            &plaintext,
        )?;

        Ok(ReEncryptResult {
            ciphertext_blob: BASE64.encode(&ciphertext),
            key_id: destination.meta.key_id.clone(),
            source_key_id,
        })
    }
}

impl Default for KmsEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Seals plaintext under a key record and packages it as a ciphertext blob.
fn seal_with(
    record: &KeyRecord,
    context: Option<&EncryptionContext>,
    plaintext: &[u8],
) -> Result<Vec<u8>, KmsError> {
    let key = record.material()?;
    let aad = context.map(context::canonical_aad).unwrap_or_default();

    let (nonce, ciphertext) = aead::seal(key.as_bytes(), plaintext, &aad)
        .map_err(|e| KmsError::Internal(e.to_string()))?;

    blob::encode(&record.meta.key_id, &nonce, &ciphertext)
}

/// Parses a ciphertext blob, resolves the key it names, and opens it.
fn open_blob(
    registry: &Registry,
    blob_bytes: &[u8],
    context: Option<&EncryptionContext>,
) -> Result<(String, Zeroizing<Vec<u8>>), KmsError> {
    let parsed = blob::decode(blob_bytes)?;

    let record = registry.resolve_enabled(&parsed.key_id)?;
    let key = record.material()?;
    let aad = context.map(context::canonical_aad).unwrap_or_default();

    let plaintext = aead::open(key.as_bytes(), &parsed.nonce, &parsed.ciphertext, &aad)
        .map_err(|_| KmsError::InvalidCiphertext)?;

    Ok((parsed.key_id, plaintext))
}

fn reject_grant_tokens(tokens: &Option<Vec<String>>) -> Result<(), KmsError> {
    if tokens.is_some() {
        return Err(KmsError::GrantsNotSupported);
    }
    Ok(())
}

fn check_pagination(marker: Option<&str>, limit: Option<u32>) -> Result<(), KmsError> {
    if marker.is_some_and(|m| !m.is_empty()) {
        return Err(KmsError::MarkerNotSupported);
    }
    if limit.unwrap_or(0) != 0 {
        return Err(KmsError::LimitNotSupported);
    }
    Ok(())
}

/// Resolves the requested data-key length from the mutually exclusive
/// `NumberOfBytes` / `KeySpec` pair.
fn data_key_len(req: &GenerateDataKeyRequest) -> Result<usize, KmsError> {
    let number_of_bytes = req.number_of_bytes.unwrap_or(0);
    let key_spec = req.key_spec.as_deref().unwrap_or("");

    if number_of_bytes == 0 {
        return match key_spec {
            "AES_128" => Ok(16),
            "AES_256" => Ok(32),
            other => Err(KmsError::InvalidKeyUsage(other.to_string())),
        };
    }

    if !key_spec.is_empty() {
        return Err(KmsError::InvalidParameterCombination(
            "NumberOfBytes and KeySpec",
        ));
    }

    if number_of_bytes > MAX_RANDOM_BYTES {
        return Err(KmsError::InvalidParameter(format!(
            "NumberOfBytes must be between {} and {}",
            MIN_RANDOM_BYTES, MAX_RANDOM_BYTES
        )));
    }

    Ok(number_of_bytes as usize)
}

fn decode_plaintext_param(value: &str) -> Result<Zeroizing<Vec<u8>>, KmsError> {
    BASE64
        .decode(value)
        .map(Zeroizing::new)
        .map_err(|_| KmsError::InvalidParameter("Plaintext is not valid base64".to_string()))
}

fn decode_blob_param(value: &str) -> Result<Vec<u8>, KmsError> {
    BASE64.decode(value).map_err(|_| KmsError::InvalidCiphertext)
}

// ============================================================================
// Tests
// ============================================================================
