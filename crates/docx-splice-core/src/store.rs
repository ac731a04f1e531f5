use std::collections::BTreeMap;

use crate::error::{Result, SpliceError};

/// Live bytes of every part of one opened package, addressed by path.
///
/// Part names are stored without a leading `/` (`word/document.xml`,
/// `[Content_Types].xml`). Lookups accept either form.
#[derive(Debug, Default)]
pub struct PartStore {
    parts: BTreeMap<String, Vec<u8>>,
}

fn canonical(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

impl PartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(parts: BTreeMap<String, Vec<u8>>) -> Self {
        let parts = parts
            .into_iter()
            .map(|(name, bytes)| (canonical(&name).to_string(), bytes))
            .collect();
        Self { parts }
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(canonical(name)).map(Vec::as_slice)
    }

    /// Like [`PartStore::part`] but a missing part is an error.
    pub fn require(&self, name: &str) -> Result<&[u8]> {
        self.part(name)
            .ok_or_else(|| SpliceError::MissingPart(canonical(name).to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(canonical(name))
    }

    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        let name = name.into();
        self.parts.insert(canonical(&name).to_string(), bytes);
    }

    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(canonical(name))
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn parts(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.parts
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn into_parts(self) -> BTreeMap<String, Vec<u8>> {
        self.parts
    }

    /// Run a multi-part edit. Writes staged through the [`Transaction`] become
    /// visible only if `edit` returns `Ok`; on error every part keeps its
    /// pre-edit bytes.
    pub fn transact<T, E>(
        &mut self,
        edit: impl FnOnce(&mut Transaction<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let (value, staged) = {
            let mut tx = Transaction {
                base: self,
                staged: BTreeMap::new(),
            };
            let value = edit(&mut tx)?;
            (value, tx.staged)
        };
        self.parts.extend(staged);
        Ok(value)
    }
}

/// Staged view over a [`PartStore`]: reads see staged writes first.
#[derive(Debug)]
pub struct Transaction<'a> {
    base: &'a PartStore,
    staged: BTreeMap<String, Vec<u8>>,
}

impl Transaction<'_> {
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        let name = canonical(name);
        match self.staged.get(name) {
            Some(bytes) => Some(bytes.as_slice()),
            None => self.base.part(name),
        }
    }

    pub fn require(&self, name: &str) -> Result<&[u8]> {
        self.part(name)
            .ok_or_else(|| SpliceError::MissingPart(canonical(name).to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    pub fn put(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        let name = name.into();
        self.staged.insert(canonical(&name).to_string(), bytes);
    }

    /// Names of committed and staged parts, sorted and de-duplicated.
    pub fn part_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .base
            .part_names()
            .chain(self.staged.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
