//! Subset selection state
//!
//! A selection maps every subset of the dataset (1..=N) to an independent
//! pair of flags: is the subset in the training split, is it in the testing
//! split. Selections are mutated one flag at a time and snapshotted by value
//! when submitted for a lookup.
//!
//! On the wire a selection keeps the shape the record store has always used:
//!
//! ```json
//! { "dataset1": { "training": true, "testing": false }, "dataset2": { ... } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Number of subsets the lesson dataset is split into
pub const DEFAULT_SUBSET_COUNT: usize = 4;

const WIRE_PREFIX: &str = "dataset";

/// Errors raised when building or decoding a selection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("subset {id} does not exist (selection has {count} subsets)")]
    UnknownSubset { id: usize, count: usize },

    #[error("subset ids start at 1, got 0")]
    ZeroSubsetId,

    #[error("selection is missing subset {0}")]
    MissingSubset(usize),

    #[error("invalid subset name '{0}', expected 'dataset<N>'")]
    InvalidSubsetName(String),

    #[error("selection needs at least one training subset and one testing subset")]
    Incomplete,
}

/// 1-based subset identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubsetId(usize);

impl SubsetId {
    /// Create an identifier, rejecting 0
    pub fn new(id: usize) -> Result<Self, SelectionError> {
        if id == 0 {
            return Err(SelectionError::ZeroSubsetId);
        }
        Ok(Self(id))
    }

    pub fn get(self) -> usize {
        self.0
    }

    fn index(self) -> usize {
        self.0 - 1
    }

    /// Parse the wire name (`dataset3`)
    pub fn from_wire_name(name: &str) -> Result<Self, SelectionError> {
        name.strip_prefix(WIRE_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .map(Self)
            .ok_or_else(|| SelectionError::InvalidSubsetName(name.to_string()))
    }

    pub fn wire_name(self) -> String {
        format!("{}{}", WIRE_PREFIX, self.0)
    }
}

impl fmt::Display for SubsetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which split a flag belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Training,
    Testing,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Training => write!(f, "training"),
            Role::Testing => write!(f, "testing"),
        }
    }
}

/// Flags for a single subset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubsetFlags {
    pub training: bool,
    pub testing: bool,
}

impl SubsetFlags {
    pub fn get(&self, role: Role) -> bool {
        match role {
            Role::Training => self.training,
            Role::Testing => self.testing,
        }
    }

    fn toggle(&mut self, role: Role) {
        match role {
            Role::Training => self.training = !self.training,
            Role::Testing => self.testing = !self.testing,
        }
    }
}

/// Training/testing assignment for every subset, in canonical id order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, SubsetFlags>",
    into = "BTreeMap<String, SubsetFlags>"
)]
pub struct SubsetSelection {
    flags: Vec<SubsetFlags>,
}

impl SubsetSelection {
    /// Selection with `count` subsets, nothing selected
    pub fn new(count: usize) -> Self {
        Self {
            flags: vec![SubsetFlags::default(); count],
        }
    }

    /// Build a selection from explicit per-subset flags (index 0 is subset 1)
    pub fn from_flags(flags: Vec<SubsetFlags>) -> Self {
        Self { flags }
    }

    /// Build a selection from lists of subset ids
    ///
    /// # Example
    /// ```
    /// use subset_lab::selection::SubsetSelection;
    ///
    /// let selection = SubsetSelection::from_assignments(4, &[1, 2], &[3]).unwrap();
    /// assert!(selection.is_complete());
    /// ```
    pub fn from_assignments(
        count: usize,
        training: &[usize],
        testing: &[usize],
    ) -> Result<Self, SelectionError> {
        let mut selection = Self::new(count);
        for &id in training {
            selection.set(SubsetId::new(id)?, Role::Training, true)?;
        }
        for &id in testing {
            selection.set(SubsetId::new(id)?, Role::Testing, true)?;
        }
        Ok(selection)
    }

    /// Number of subsets
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags for a subset
    pub fn flags(&self, id: SubsetId) -> Result<SubsetFlags, SelectionError> {
        self.flags
            .get(id.index())
            .copied()
            .ok_or(SelectionError::UnknownSubset {
                id: id.get(),
                count: self.flags.len(),
            })
    }

    /// Iterate subsets in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (SubsetId, SubsetFlags)> + '_ {
        self.flags
            .iter()
            .enumerate()
            .map(|(i, flags)| (SubsetId(i + 1), *flags))
    }

    /// Flip one flag of one subset
    pub fn toggle(&mut self, id: SubsetId, role: Role) -> Result<(), SelectionError> {
        let count = self.flags.len();
        let flags = self
            .flags
            .get_mut(id.index())
            .ok_or(SelectionError::UnknownSubset { id: id.get(), count })?;
        flags.toggle(role);
        Ok(())
    }

    fn set(&mut self, id: SubsetId, role: Role, value: bool) -> Result<(), SelectionError> {
        if self.flags(id)?.get(role) != value {
            self.toggle(id, role)?;
        }
        Ok(())
    }

    /// True when at least one subset trains and at least one subset tests
    pub fn is_complete(&self) -> bool {
        self.flags.iter().any(|f| f.training) && self.flags.iter().any(|f| f.testing)
    }

    /// Fail with [`SelectionError::Incomplete`] unless the selection may be looked up
    pub fn ensure_complete(&self) -> Result<(), SelectionError> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(SelectionError::Incomplete)
        }
    }

    /// Fraction of subsets assigned to `role` (0.0..=1.0)
    pub fn fill_fraction(&self, role: Role) -> f64 {
        if self.flags.is_empty() {
            return 0.0;
        }
        let selected = self.flags.iter().filter(|f| f.get(role)).count();
        selected as f64 / self.flags.len() as f64
    }

    pub(crate) fn raw_flags(&self) -> &[SubsetFlags] {
        &self.flags
    }
}

impl TryFrom<BTreeMap<String, SubsetFlags>> for SubsetSelection {
    type Error = SelectionError;

    fn try_from(map: BTreeMap<String, SubsetFlags>) -> Result<Self, Self::Error> {
        let mut by_id = BTreeMap::new();
        for (name, flags) in map {
            by_id.insert(SubsetId::from_wire_name(&name)?, flags);
        }

        // Ids must be exactly 1..=N
        let mut flags = Vec::with_capacity(by_id.len());
        for (expected, (id, value)) in (1..).zip(by_id) {
            if id.get() != expected {
                return Err(SelectionError::MissingSubset(expected));
            }
            flags.push(value);
        }

        Ok(Self { flags })
    }
}

impl From<SubsetSelection> for BTreeMap<String, SubsetFlags> {
    fn from(selection: SubsetSelection) -> Self {
        selection
            .iter()
            .map(|(id, flags)| (id.wire_name(), flags))
            .collect()
    }
}

impl fmt::Display for SubsetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |role: Role| {
            self.iter()
                .filter(|(_, flags)| flags.get(role))
                .map(|(id, _)| id.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        write!(
            f,
            "train=[{}] test=[{}]",
            list(Role::Training),
            list(Role::Testing)
        )
    }
}
