//! # Pairwise Combination
//!
//! Every ordered pair of distinct operands drawn from `main` and the leaf
//! strata produces one candidate combination:
//!
//! - When one operand is `main`, the combination is the other stratum alone,
//!   keyed `{stratum}_{operation}`.
//! - Otherwise the two names are sorted and the combination is the
//!   intersection of their rows, keyed `{first}_{second}_{operation}`.
//!
//! Candidates with no rows are dropped. `main_{operation}` is always present
//! and always holds every row of the input. A key produced twice (once per
//! ordering) overwrites the first result with an identical one.

use super::Operation;
use super::strata::{MAIN_KEY, RowSet, StrataCollection, Stratum};
use crate::frame;
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use polars::prelude::{DataFrame, PolarsResult};

/// One stratified subset, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset {
    key: String,
    members: Vec<String>,
    rows: RowSet,
}

impl Subset {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Names of the strata this subset was formed from, in sorted order.
    /// The main subset reports `["main"]`.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Ordered mapping from combination key to subset.
#[derive(Debug, Clone)]
pub struct Stratifications {
    operation: Operation,
    subsets: Vec<Subset>,
    index: AHashMap<String, usize>,
}

impl PartialEq for Stratifications {
    fn eq(&self, other: &Self) -> bool {
        self.operation == other.operation && self.subsets == other.subsets
    }
}

impl Stratifications {
    fn new(operation: Operation) -> Self {
        Self {
            operation,
            subsets: Vec::new(),
            index: AHashMap::new(),
        }
    }

    fn insert(&mut self, subset: Subset) {
        match self.index.get(&subset.key) {
            Some(&slot) => self.subsets[slot] = subset,
            None => {
                self.index.insert(subset.key.clone(), self.subsets.len());
                self.subsets.push(subset);
            }
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Key of the subset holding every row, e.g. `main_report`.
    pub fn main_key(&self) -> String {
        format!("{MAIN_KEY}_{}", self.operation)
    }

    pub fn main(&self) -> Option<&Subset> {
        self.get(&self.main_key())
    }

    pub fn get(&self, key: &str) -> Option<&Subset> {
        self.index.get(key).map(|&slot| &self.subsets[slot])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.subsets.iter().map(|s| s.key.as_str())
    }

    /// Subsets in insertion order.
    pub fn subsets(&self) -> &[Subset] {
        &self.subsets
    }

    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }

    /// Materialises the subset stored under `key` from the frame it was
    /// computed on.
    pub fn frame(&self, key: &str, data: &DataFrame) -> PolarsResult<Option<DataFrame>> {
        self.get(key)
            .map(|subset| frame::take_rows(data, subset.rows.as_slice()))
            .transpose()
    }
}

/// Combines the strata of `collection` for a dataset of `height` rows.
///
/// `height` sizes the main subset, so a collection cached from an earlier
/// split still yields a main subset covering the data being split now.
pub fn combine_strata(
    collection: &StrataCollection,
    height: usize,
    operation: Operation,
) -> Stratifications {
    let operands: Vec<Option<&Stratum>> = std::iter::once(None)
        .chain(collection.strata().iter().map(Some))
        .collect();
    let mut seen: AHashSet<String> = AHashSet::with_capacity(operands.len() * operands.len());
    let mut combined = Stratifications::new(operation);

    for ((i, first), (j, second)) in operands
        .iter()
        .enumerate()
        .cartesian_product(operands.iter().enumerate())
    {
        if i == j {
            continue;
        }
        let subset = match (first, second) {
            (None, Some(stratum)) | (Some(stratum), None) => Subset {
                key: format!("{}_{operation}", stratum.name),
                members: vec![stratum.name.clone()],
                rows: stratum.rows.clone(),
            },
            (Some(a), Some(b)) => {
                let (a, b) = if a.name <= b.name { (a, b) } else { (b, a) };
                Subset {
                    key: format!("{}_{}_{operation}", a.name, b.name),
                    members: vec![a.name.clone(), b.name.clone()],
                    rows: a.rows.intersection(&b.rows),
                }
            }
            (None, None) => continue,
        };

        if !seen.insert(subset.key.clone()) {
            log::trace!("Combination {} produced again", subset.key);
        }
        if !subset.rows.is_empty() {
            combined.insert(subset);
        }
    }

    combined.insert(Subset {
        key: combined.main_key(),
        members: vec![MAIN_KEY.to_string()],
        rows: RowSet::all(height),
    });
    log::debug!(
        "Formed {} {operation} combinations from {} strata ({} candidate keys)",
        combined.len(),
        collection.len(),
        seen.len()
    );
    combined
}
