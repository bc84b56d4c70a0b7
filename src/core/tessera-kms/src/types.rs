//! Request and result shapes for every KMS operation.
//!
//! Field names serialize to the service's exact wire names (`KeyId`,
//! `CiphertextBlob`, `AWSAccountId`, ...). `Plaintext` and `CiphertextBlob`
//! fields are base64 strings on the wire; the engine decodes and encodes at
//! its boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Key enumerations
// ============================================================================

/// Lifecycle state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    /// The key can be used for cryptographic operations.
    Enabled,
    /// The key exists but refuses all cryptographic operations.
    Disabled,
    /// The key was created with external origin and has no material yet.
    PendingImport,
    /// The key is scheduled for deletion. Unreachable: no deletion path exists.
    PendingDeletion,
}

impl std::fmt::Display for KeyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enabled => write!(f, "Enabled"),
            Self::Disabled => write!(f, "Disabled"),
            Self::PendingImport => write!(f, "PendingImport"),
            Self::PendingDeletion => write!(f, "PendingDeletion"),
        }
    }
}

/// Where a key's material comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyOrigin {
    /// Material is generated locally at creation time.
    #[serde(rename = "AWS_KMS")]
    AwsKms,
    /// Material must be imported before the key can be used.
    #[serde(rename = "EXTERNAL")]
    External,
}

impl std::fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwsKms => write!(f, "AWS_KMS"),
            Self::External => write!(f, "EXTERNAL"),
        }
    }
}

/// What a key may be used for. Symmetric encrypt/decrypt is the only usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyUsage {
    /// Symmetric encryption and decryption.
    #[serde(rename = "ENCRYPT_DECRYPT")]
    EncryptDecrypt,
}

impl std::fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EncryptDecrypt => write!(f, "ENCRYPT_DECRYPT"),
        }
    }
}

/// An encryption context: free-form string pairs bound to a ciphertext as
/// associated data. Ordered so canonicalization and listings are stable.
pub type EncryptionContext = BTreeMap<String, String>;

// ============================================================================
// General shapes
// ============================================================================

/// A request to GenerateRandom.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GenerateRandomRequest {
    /// Number of random bytes to return (1..=1024).
    pub number_of_bytes: u32,
}

/// The result of GenerateRandom.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GenerateRandomResult {
    /// The generated bytes, base64-encoded.
    pub plaintext: String,
}

/// A constraint attached to a grant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GrantConstraint {
    /// Context that must match exactly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_context_equals: Option<EncryptionContext>,
    /// Context that must be a superset of this map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_context_subset: Option<EncryptionContext>,
}

/// An entry in a list of grants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GrantListEntry {
    /// Constraints on the grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<GrantConstraint>,
    /// Creation timestamp (Unix seconds).
    pub creation_date: i64,
    /// Principal the grant was issued to.
    pub grantee_principal: String,
    /// Unique grant id.
    pub grant_id: String,
    /// Account that issued the grant.
    pub issuing_account: String,
    /// Key the grant applies to.
    pub key_id: String,
    /// Friendly name.
    pub name: String,
    /// Operations the grant permits.
    pub operations: Vec<String>,
    /// Principal allowed to retire the grant.
    pub retiring_principal: String,
}

/// A request to ListGrants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListGrantsRequest {
    /// Key to list grants for.
    pub key_id: String,
    /// Unsupported; must be absent or zero.
    pub limit: Option<u32>,
    /// Unsupported; must be absent or empty.
    pub marker: Option<String>,
}

/// The result of ListGrants and ListRetireableGrants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListGrantsResult {
    /// The matching grants.
    pub grants: Vec<GrantListEntry>,
    /// Always absent; pagination is unsupported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
    /// Always false; listings are a single page.
    pub truncated: bool,
}

/// A request to ListRetireableGrants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListRetireableGrantsRequest {
    /// Unsupported; must be absent or zero.
    pub limit: Option<u32>,
    /// Unsupported; must be absent or empty.
    pub marker: Option<String>,
    /// Principal to match against each grant's retiring principal.
    pub retiring_principal: String,
}

/// A request to CreateGrant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CreateGrantRequest {
    /// Constraints on the grant.
    pub constraints: Option<GrantConstraint>,
    /// Principal to issue the grant to.
    pub grantee_principal: String,
    /// Grant tokens; unsupported.
    pub grant_tokens: Option<Vec<String>>,
    /// Key the grant applies to.
    pub key_id: String,
    /// Friendly name.
    pub name: String,
    /// Operations to permit.
    pub operations: Vec<String>,
    /// Principal allowed to retire the grant.
    pub retiring_principal: String,
}

/// The result of CreateGrant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGrantResult {
    /// Unique grant id.
    pub grant_id: String,
    /// Token that carries the grant.
    pub grant_token: String,
}

/// A request to RetireGrant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct RetireGrantRequest {
    /// Grant id, used together with `key_id` when no token is given.
    pub grant_id: String,
    /// Token identifying the grant directly.
    pub grant_token: String,
    /// Key the grant applies to.
    pub key_id: String,
}

/// A request to RevokeGrant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct RevokeGrantRequest {
    /// Grant id.
    pub grant_id: String,
    /// Key the grant applies to.
    pub key_id: String,
}

/// A tag key/value pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Tag {
    /// Tag key.
    pub tag_key: String,
    /// Tag value.
    pub tag_value: String,
}

/// A request to ListResourceTags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListResourceTagsRequest {
    /// Key to list tags for.
    pub key_id: String,
    /// Unsupported; must be absent or zero.
    pub limit: Option<u32>,
    /// Unsupported; must be absent or empty.
    pub marker: Option<String>,
}

/// The result of ListResourceTags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResourceTagsResult {
    /// The key's tags, ordered by tag key.
    pub tags: Vec<Tag>,
    /// Always absent; pagination is unsupported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
    /// Always false; listings are a single page.
    pub truncated: bool,
}

/// A request to TagResource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TagResourceRequest {
    /// Key to tag.
    pub key_id: String,
    /// Tags to add or overwrite.
    pub tags: Vec<Tag>,
}

/// A request to UntagResource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UntagResourceRequest {
    /// Key to untag.
    pub key_id: String,
    /// Tag keys to remove.
    pub tag_keys: Vec<String>,
}

// ============================================================================
// Key metadata shapes
// ============================================================================

/// A request to ListKeys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListKeysRequest {
    /// Unsupported; must be absent or zero.
    pub limit: Option<u32>,
    /// Unsupported; must be absent or empty.
    pub marker: Option<String>,
}

/// An entry in a list of keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyListEntry {
    /// The key's ARN.
    pub key_arn: String,
    /// The key's bare id.
    pub key_id: String,
}

/// The result of ListKeys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListKeysResult {
    /// All keys, ordered by id.
    pub keys: Vec<KeyListEntry>,
    /// Always absent; pagination is unsupported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
    /// Always false; listings are a single page.
    pub truncated: bool,
}

/// A request to CreateKey.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CreateKeyRequest {
    /// Accepted and ignored; policies are not evaluated.
    pub bypass_policy_lockout_safety_check: bool,
    /// Free-form description.
    pub description: String,
    /// Key usage; only `ENCRYPT_DECRYPT` (the default) is valid.
    pub key_usage: Option<String>,
    /// Key origin; `AWS_KMS` (the default) or `EXTERNAL`.
    pub origin: Option<String>,
    /// Unsupported; must be absent or empty.
    pub policy: Option<String>,
    /// Initial tags.
    pub tags: Vec<Tag>,
}

/// Metadata about a key. Never contains key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyMetadata {
    /// The key's ARN.
    pub arn: String,
    /// Owning account id.
    #[serde(rename = "AWSAccountId")]
    pub aws_account_id: String,
    /// Creation timestamp (Unix seconds).
    pub creation_date: i64,
    /// Deletion timestamp, set only once deletion is scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_date: Option<i64>,
    /// Free-form description.
    pub description: String,
    /// Whether the key may perform cryptographic operations.
    pub enabled: bool,
    /// The key's bare id.
    pub key_id: String,
    /// Who manages the key; always `CUSTOMER`.
    pub key_manager: String,
    /// Lifecycle state.
    pub key_state: KeyState,
    /// What the key may be used for.
    pub key_usage: KeyUsage,
    /// Where the key material comes from.
    pub origin: KeyOrigin,
}

/// The result of CreateKey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateKeyResult {
    /// Metadata of the new key.
    pub key_metadata: KeyMetadata,
}

/// A request to DescribeKey.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DescribeKeyRequest {
    /// Key identifier: bare id, ARN, or alias.
    pub key_id: String,
    /// Grant tokens; unsupported.
    pub grant_tokens: Option<Vec<String>>,
}

/// The result of DescribeKey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeKeyResult {
    /// Metadata of the resolved key.
    pub key_metadata: KeyMetadata,
}

/// A request to UpdateKeyDescription.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpdateKeyDescriptionRequest {
    /// New description.
    pub description: String,
    /// Key identifier.
    pub key_id: String,
}

/// A request to EnableKey.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct EnableKeyRequest {
    /// Key identifier.
    pub key_id: String,
}

/// A request to DisableKey.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DisableKeyRequest {
    /// Key identifier.
    pub key_id: String,
}

/// A request to ScheduleKeyDeletion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ScheduleKeyDeletionRequest {
    /// Key identifier.
    pub key_id: String,
    /// Waiting period before deletion.
    pub pending_window_in_days: u32,
}

/// The result of ScheduleKeyDeletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleKeyDeletionResult {
    /// When the key would be deleted (Unix seconds).
    pub deletion_date: i64,
    /// Key identifier.
    pub key_id: String,
}

/// A request to CancelKeyDeletion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CancelKeyDeletionRequest {
    /// Key identifier.
    pub key_id: String,
}

/// The result of CancelKeyDeletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CancelKeyDeletionResult {
    /// Key identifier.
    pub key_id: String,
}

// ============================================================================
// Rotation shapes
// ============================================================================

/// A request to GetKeyRotationStatus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GetKeyRotationStatusRequest {
    /// Key identifier.
    pub key_id: String,
}

/// The result of GetKeyRotationStatus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetKeyRotationStatusResult {
    /// Always false; rotation is not implemented.
    pub key_rotation_enabled: bool,
}

/// A request to EnableKeyRotation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct EnableKeyRotationRequest {
    /// Key identifier.
    pub key_id: String,
}

/// A request to DisableKeyRotation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DisableKeyRotationRequest {
    /// Key identifier.
    pub key_id: String,
}

// ============================================================================
// Policy shapes
// ============================================================================

/// A request to ListKeyPolicies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListKeyPoliciesRequest {
    /// Key identifier.
    pub key_id: String,
    /// Unsupported; must be absent or zero.
    pub limit: Option<u32>,
    /// Unsupported; must be absent or empty.
    pub marker: Option<String>,
}

/// The result of ListKeyPolicies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListKeyPoliciesResult {
    /// Policy names, ordered lexicographically.
    pub policy_names: Vec<String>,
    /// Always absent; pagination is unsupported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
    /// Always false; listings are a single page.
    pub truncated: bool,
}

/// A request to GetKeyPolicy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GetKeyPolicyRequest {
    /// Key identifier.
    pub key_id: String,
    /// Policy name to fetch.
    pub policy_name: String,
}

/// The result of GetKeyPolicy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetKeyPolicyResult {
    /// Raw policy document.
    pub policy: String,
}

/// A request to PutKeyPolicy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PutKeyPolicyRequest {
    /// Accepted and ignored; policies are not evaluated.
    pub bypass_policy_lockout_safety_check: bool,
    /// Key identifier.
    pub key_id: String,
    /// Raw policy document.
    pub policy: String,
    /// Policy name.
    pub policy_name: String,
}

// ============================================================================
// Alias shapes
// ============================================================================

/// A request to ListAliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListAliasesRequest {
    /// Unsupported; must be absent or zero.
    pub limit: Option<u32>,
    /// Unsupported; must be absent or empty.
    pub marker: Option<String>,
}

/// An entry in an alias list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AliasListEntry {
    /// The alias's ARN.
    pub alias_arn: String,
    /// The alias name, including the `alias/` prefix.
    pub alias_name: String,
    /// Bare id of the key the alias points at.
    pub target_key_id: String,
}

/// The result of ListAliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListAliasesResult {
    /// All aliases, ordered by name.
    pub aliases: Vec<AliasListEntry>,
    /// Always absent; pagination is unsupported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
    /// Always false; listings are a single page.
    pub truncated: bool,
}

/// A request to CreateAlias.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CreateAliasRequest {
    /// Alias name; must start with `alias/`.
    pub alias_name: String,
    /// Identifier of the key to point at.
    pub target_key_id: String,
}

/// A request to UpdateAlias.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct UpdateAliasRequest {
    /// Existing alias name.
    pub alias_name: String,
    /// Identifier of the key to repoint at.
    pub target_key_id: String,
}

/// A request to DeleteAlias.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DeleteAliasRequest {
    /// Alias name to delete.
    pub alias_name: String,
}

// ============================================================================
// Crypto shapes
// ============================================================================

/// A request to GenerateDataKey or GenerateDataKeyWithoutPlaintext.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GenerateDataKeyRequest {
    /// Context bound to the wrapped key.
    pub encryption_context: Option<EncryptionContext>,
    /// Grant tokens; unsupported.
    pub grant_tokens: Option<Vec<String>>,
    /// Key identifier to wrap under.
    pub key_id: String,
    /// `AES_128` or `AES_256`; mutually exclusive with `number_of_bytes`.
    pub key_spec: Option<String>,
    /// Explicit data-key length in bytes; mutually exclusive with `key_spec`.
    pub number_of_bytes: Option<u32>,
}

/// The result of GenerateDataKey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GenerateDataKeyResult {
    /// The wrapped data key, base64-encoded.
    pub ciphertext_blob: String,
    /// Bare id of the wrapping key.
    pub key_id: String,
    /// The raw data key, base64-encoded; absent for the WithoutPlaintext variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plaintext: Option<String>,
}

/// A request to Encrypt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct EncryptRequest {
    /// Context bound to the ciphertext.
    pub encryption_context: Option<EncryptionContext>,
    /// Grant tokens; unsupported.
    pub grant_tokens: Option<Vec<String>>,
    /// Key identifier to encrypt under.
    pub key_id: String,
    /// Data to encrypt, base64-encoded.
    pub plaintext: String,
}

/// The result of Encrypt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptResult {
    /// The ciphertext blob, base64-encoded.
    pub ciphertext_blob: String,
    /// Bare id of the key that produced the ciphertext.
    pub key_id: String,
}

/// A request to Decrypt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DecryptRequest {
    /// The ciphertext blob, base64-encoded. Names its own key.
    pub ciphertext_blob: String,
    /// Context the ciphertext was bound to.
    pub encryption_context: Option<EncryptionContext>,
    /// Grant tokens; unsupported.
    pub grant_tokens: Option<Vec<String>>,
}

/// The result of Decrypt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DecryptResult {
    /// Bare id of the key the ciphertext was produced under.
    pub key_id: String,
    /// The recovered plaintext, base64-encoded.
    pub plaintext: String,
}

/// A request to ReEncrypt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ReEncryptRequest {
    /// The ciphertext blob to re-encrypt, base64-encoded.
    pub ciphertext_blob: String,
    /// Context to bind to the new ciphertext.
    pub destination_encryption_context: Option<EncryptionContext>,
    /// Identifier of the key to re-encrypt under.
    pub destination_key_id: String,
    /// Grant tokens; unsupported.
    pub grant_tokens: Option<Vec<String>>,
    /// Context the existing ciphertext was bound to.
    pub source_encryption_context: Option<EncryptionContext>,
}

/// The result of ReEncrypt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReEncryptResult {
    /// The new ciphertext blob, base64-encoded.
    pub ciphertext_blob: String,
    /// Bare id of the destination key.
    pub key_id: String,
    /// Bare id of the key the input ciphertext was produced under.
    pub source_key_id: String,
}
