//! Ordered directory lists used for header and library lookup.

use std::path::Path;

use serde::Serialize;

/// An ordered list of directories.
///
/// Entries added through [`SearchPath::insert`] never duplicate an
/// existing entry and always land after the last relative entry, so local
/// build directories keep precedence over system ones. [`SearchPath::push`]
/// appends unconditionally and is used where the caller owns ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SearchPath {
    dirs: Vec<String>,
}

impl SearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `dir` if it exists on disk, is a directory and is not already
    /// present. Returns whether it was inserted.
    pub fn insert(&mut self, dir: &str) -> bool {
        if dir.is_empty() || !Path::new(dir).is_dir() {
            return false;
        }
        self.insert_unchecked(dir)
    }

    /// Like [`SearchPath::insert`] without the existence check.
    pub fn insert_unchecked(&mut self, dir: &str) -> bool {
        if self.contains(dir) {
            return false;
        }

        let at = self
            .dirs
            .iter()
            .rposition(|d| !Path::new(d).is_absolute())
            .map_or(0, |i| i + 1);
        self.dirs.insert(at, dir.to_string());
        true
    }

    /// Append `dir` at the end, duplicates allowed.
    pub fn push(&mut self, dir: impl Into<String>) {
        self.dirs.push(dir.into());
    }

    pub fn extend<I, S>(&mut self, dirs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dirs.extend(dirs.into_iter().map(Into::into));
    }

    pub fn contains(&self, dir: &str) -> bool {
        self.dirs.iter().any(|d| d == dir)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.dirs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.dirs.iter()
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// A new list with `other` appended.
    pub fn chain(&self, other: &[String]) -> SearchPath {
        let mut dirs = self.dirs.clone();
        dirs.extend(other.iter().cloned());
        SearchPath { dirs }
    }
}

impl From<Vec<String>> for SearchPath {
    fn from(dirs: Vec<String>) -> Self {
        SearchPath { dirs }
    }
}

impl<'a> IntoIterator for &'a SearchPath {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.dirs.iter()
    }
}
