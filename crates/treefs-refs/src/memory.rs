//! In-memory reference store.
//!
//! [`InMemoryRefStore`] stores all refs in a `HashMap` protected by a
//! `RwLock`. It implements the full [`RefStore`] trait.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use treefs_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::{validate_branch_name, validate_ref_write};
use crate::traits::RefStore;
use crate::types::{Head, Ref};

/// An in-memory implementation of [`RefStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug)]
pub struct InMemoryRefStore {
    refs: RwLock<HashMap<String, Ref>>,
    head: RwLock<Option<Head>>,
}

fn poisoned<T>(e: PoisonError<T>) -> RefError {
    RefError::Poisoned(e.to_string())
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self {
            refs: RwLock::new(HashMap::new()),
            head: RwLock::new(None),
        }
    }
}

impl Default for InMemoryRefStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs.get(name).cloned())
    }

    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        validate_ref_write(name, reference)?;

        let mut refs = self.refs.write().map_err(poisoned)?;

        if let Some(existing) = refs.get(name) {
            if existing.is_tag() {
                return Err(RefError::TagImmutable {
                    name: name.to_string(),
                });
            }
        }

        tracing::debug!(refname = name, object = %reference.target().short_hex(), "ref updated");
        refs.insert(name.to_string(), reference.clone());
        Ok(())
    }

    fn head(&self) -> Result<Option<Head>> {
        let head = self.head.read().map_err(poisoned)?;
        Ok(head.clone())
    }

    fn set_head(&self, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        let mut head = self.head.write().map_err(poisoned)?;
        *head = Some(Head::Symbolic(branch.to_string()));
        Ok(())
    }

    fn set_head_detached(&self, target: ObjectId) -> Result<()> {
        let mut head = self.head.write().map_err(poisoned)?;
        *head = Some(Head::Detached(target));
        Ok(())
    }
}
