//! The in-memory key registry.
//!
//! Owns every key record, the alias and ARN lookup tables, and the grant
//! table. All access goes through the engine's lock; nothing here is
//! synchronized on its own.

use std::collections::BTreeMap;

use tessera_crypto::SymmetricKey;

use crate::error::KmsError;
use crate::types::{GrantListEntry, KeyMetadata, KeyOrigin, KeyState, KeyUsage};

/// Prefix that marks an identifier as an alias reference.
pub const ALIAS_PREFIX: &str = "alias/";

/// Prefix that marks an identifier as an ARN.
const ARN_PREFIX: &str = "arn:";

/// Account id embedded in every key ARN.
const ACCOUNT_ID: &str = "x";

/// Region embedded in every ARN.
const REGION: &str = "us-local-1";

/// Key manager reported for every key.
const KEY_MANAGER_CUSTOMER: &str = "CUSTOMER";

/// Builds the ARN for a key id.
pub fn key_arn(key_id: &str) -> String {
    format!("arn:aws:kms:{}:{}:key/{}", REGION, ACCOUNT_ID, key_id)
}

/// Builds the ARN for an alias name (the name already carries `alias/`).
pub fn alias_arn(alias_name: &str) -> String {
    format!("arn:aws:kms:{}:-:{}", REGION, alias_name)
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// A key record: metadata plus the material and per-key tables.
///
/// Records live in the registry and are mutated in place; the id and ARN
/// assigned at creation never change.
pub struct KeyRecord {
    /// Raw key material; `None` while the key awaits an external import.
    pub material: Option<SymmetricKey>,
    /// Public metadata, returned (as a copy) from describe/create.
    pub meta: KeyMetadata,
    /// Tag key to tag value.
    pub tags: BTreeMap<String, String>,
    /// Policy name to raw policy document. Read-only surface; stays empty.
    pub policies: BTreeMap<String, String>,
}

impl KeyRecord {
    /// Marks the key enabled.
    ///
    /// Not allowed while the key awaits import or deletion.
    pub fn enable(&mut self) -> Result<(), KmsError> {
        self.check_transition()?;
        self.meta.enabled = true;
        self.meta.key_state = KeyState::Enabled;
        Ok(())
    }

    /// Marks the key disabled.
    ///
    /// Not allowed while the key awaits import or deletion.
    pub fn disable(&mut self) -> Result<(), KmsError> {
        self.check_transition()?;
        self.meta.enabled = false;
        self.meta.key_state = KeyState::Disabled;
        Ok(())
    }

    fn check_transition(&self) -> Result<(), KmsError> {
        match self.meta.key_state {
            KeyState::PendingImport | KeyState::PendingDeletion => Err(KmsError::InvalidState {
                key_id: self.meta.key_id.clone(),
                state: self.meta.key_state,
            }),
            KeyState::Enabled | KeyState::Disabled => Ok(()),
        }
    }

    /// The key material, for keys that have any.
    ///
    /// Enabled keys always carry material; hitting this error means the
    /// state machine was bypassed.
    pub fn material(&self) -> Result<&SymmetricKey, KmsError> {
        self.material
            .as_ref()
            .ok_or_else(|| KmsError::Internal(format!("key {} has no material", self.meta.key_id)))
    }
}

/// The registry: id, ARN, and alias tables over the key records.
pub struct Registry {
    counter: u64,
    keys: BTreeMap<String, KeyRecord>,
    arns: BTreeMap<String, String>,
    aliases: BTreeMap<String, String>,
    grants: BTreeMap<String, GrantListEntry>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            counter: 0,
            keys: BTreeMap::new(),
            arns: BTreeMap::new(),
            aliases: BTreeMap::new(),
            grants: BTreeMap::new(),
        }
    }

    /// Creates a key record and returns a copy of its metadata.
    ///
    /// Local-origin keys get fresh random material and start `Enabled`;
    /// external-origin keys start `PendingImport` with no material.
    pub fn create_key(
        &mut self,
        description: String,
        key_usage: KeyUsage,
        origin: KeyOrigin,
        tags: BTreeMap<String, String>,
    ) -> KeyMetadata {
        let key_id = self.counter.to_string();
        self.counter += 1;

        let (material, key_state, enabled) = match origin {
            KeyOrigin::AwsKms => (Some(SymmetricKey::generate()), KeyState::Enabled, true),
            KeyOrigin::External => (None, KeyState::PendingImport, false),
        };

        let meta = KeyMetadata {
            arn: key_arn(&key_id),
            aws_account_id: ACCOUNT_ID.to_string(),
            creation_date: now(),
            deletion_date: None,
            description,
            enabled,
            key_id: key_id.clone(),
            key_manager: KEY_MANAGER_CUSTOMER.to_string(),
            key_state,
            key_usage,
            origin,
        };

        self.arns.insert(meta.arn.clone(), key_id.clone());
        self.keys.insert(
            key_id,
            KeyRecord {
                material,
                meta: meta.clone(),
                tags,
                policies: BTreeMap::new(),
            },
        );

        meta
    }

    /// Maps an identifier to the bare key id it names, if any.
    ///
    /// The identifier's shape picks exactly one table: `alias/...` the alias
    /// table, `arn:...` the ARN table, anything else the bare-id table. An
    /// identifier that misses its table is never retried against another.
    fn resolve_id(&self, identifier: &str) -> Option<String> {
        if identifier.starts_with(ALIAS_PREFIX) {
            self.aliases.get(identifier).cloned()
        } else if identifier.starts_with(ARN_PREFIX) {
            self.arns.get(identifier).cloned()
        } else if self.keys.contains_key(identifier) {
            Some(identifier.to_string())
        } else {
            None
        }
    }

    /// Resolves an identifier to its key record.
    pub fn resolve(&self, identifier: &str) -> Result<&KeyRecord, KmsError> {
        let key_id = self
            .resolve_id(identifier)
            .ok_or_else(|| KmsError::NotFound(identifier.to_string()))?;
        self.keys
            .get(&key_id)
            .ok_or_else(|| KmsError::NotFound(identifier.to_string()))
    }

    /// Resolves an identifier to its key record for mutation.
    pub fn resolve_mut(&mut self, identifier: &str) -> Result<&mut KeyRecord, KmsError> {
        let key_id = self
            .resolve_id(identifier)
            .ok_or_else(|| KmsError::NotFound(identifier.to_string()))?;
        self.keys
            .get_mut(&key_id)
            .ok_or_else(|| KmsError::NotFound(identifier.to_string()))
    }

    /// Resolves an identifier and requires the key to be usable.
    ///
    /// Every cryptographic operation goes through this gate: the key must
    /// exist and be in the `Enabled` state.
    pub fn resolve_enabled(&self, identifier: &str) -> Result<&KeyRecord, KmsError> {
        let record = self.resolve(identifier)?;
        if record.meta.key_state != KeyState::Enabled {
            return Err(KmsError::Disabled(record.meta.key_id.clone()));
        }
        Ok(record)
    }

    /// All key records, ordered by bare id.
    pub fn keys(&self) -> impl Iterator<Item = &KeyRecord> {
        self.keys.values()
    }

    /// All aliases as `(name, target key id)`, ordered by name.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .iter()
            .map(|(name, id)| (name.as_str(), id.as_str()))
    }

    /// Points a new alias at the key `target` resolves to.
    pub fn create_alias(&mut self, alias_name: &str, target: &str) -> Result<(), KmsError> {
        if !alias_name.starts_with(ALIAS_PREFIX) {
            return Err(KmsError::InvalidAliasName(alias_name.to_string()));
        }
        if self.aliases.contains_key(alias_name) {
            return Err(KmsError::AliasExists(alias_name.to_string()));
        }

        let key_id = self
            .resolve_id(target)
            .ok_or_else(|| KmsError::NotFound(target.to_string()))?;

        self.aliases.insert(alias_name.to_string(), key_id);
        Ok(())
    }

    /// Repoints an existing alias at the key `target` resolves to.
    pub fn update_alias(&mut self, alias_name: &str, target: &str) -> Result<(), KmsError> {
        if !self.aliases.contains_key(alias_name) {
            return Err(KmsError::NotFound(alias_name.to_string()));
        }

        let key_id = self
            .resolve_id(target)
            .ok_or_else(|| KmsError::NotFound(target.to_string()))?;

        self.aliases.insert(alias_name.to_string(), key_id);
        Ok(())
    }

    /// Removes an alias. The target key is untouched.
    pub fn delete_alias(&mut self, alias_name: &str) -> Result<(), KmsError> {
        self.aliases
            .remove(alias_name)
            .map(|_| ())
            .ok_or_else(|| KmsError::NotFound(alias_name.to_string()))
    }

    /// All grants, ordered by token.
    pub fn grants(&self) -> impl Iterator<Item = &GrantListEntry> {
        self.grants.values()
    }

    /// Removes a grant by its token. Missing tokens are ignored.
    pub fn remove_grant_by_token(&mut self, token: &str) {
        self.grants.remove(token);
    }

    /// Finds the token of the grant matching a key id and grant id.
    pub fn find_grant_token(&self, key_id: &str, grant_id: &str) -> Option<String> {
        self.grants
            .iter()
            .find(|(_, grant)| grant.key_id == key_id && grant.grant_id == grant_id)
            .map(|(token, _)| token.clone())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
