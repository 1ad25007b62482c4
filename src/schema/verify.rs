//! Threshold signature verification of signed metadata.

use crate::schema::error::{self, Result};
use crate::schema::{Role, Root, Signed};
use snafu::{ensure, OptionExt};
use std::collections::HashSet;

impl Root {
    /// Verifies that `role` carries at least the threshold of valid signatures
    /// made by distinct keys authorized for `T`'s role by this root. Duplicate
    /// key IDs in the signature list count once toward the threshold.
    pub fn verify_role<T: Role>(&self, role: &Signed<T>) -> Result<()> {
        let role_keys = self
            .roles
            .get(&T::TYPE)
            .context(error::MissingRoleSnafu { role: T::TYPE })?;
        let data = role.signed.canonical_form()?;

        let mut valid = HashSet::new();
        for signature in &role.signatures {
            if !role_keys.keyids.contains(&signature.keyid) {
                continue;
            }
            if let Some(key) = self.keys.get(&signature.keyid) {
                if key.verify(&data, &signature.sig) {
                    valid.insert(&signature.keyid);
                }
            }
        }

        ensure!(
            valid.len() as u64 >= role_keys.threshold.get(),
            error::SignatureThresholdSnafu {
                role: T::TYPE,
                threshold: role_keys.threshold.get(),
                valid: valid.len() as u64,
            }
        );
        Ok(())
    }
}
