use crate::frame;
use crate::profile::Dimension;
use ahash::AHashMap;
use polars::prelude::{DataFrame, IdxSize, PolarsResult};

/// Name of the distinguished stratum holding every row.
pub const MAIN_KEY: &str = "main";

/// A sorted, duplicate-free set of row positions into one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet(Vec<IdxSize>);

impl RowSet {
    /// Every row of a dataset with `height` rows.
    pub fn all(height: usize) -> Self {
        Self((0..height as IdxSize).collect())
    }

    /// Positions of `values` for which `keep` holds.
    pub fn from_predicate<T>(values: &[T], keep: impl Fn(&T) -> bool) -> Self {
        Self(
            values
                .iter()
                .enumerate()
                .filter(|(_, value)| keep(value))
                .map(|(position, _)| position as IdxSize)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[IdxSize] {
        &self.0
    }

    pub fn contains(&self, row: IdxSize) -> bool {
        self.0.binary_search(&row).is_ok()
    }

    /// Rows present in both sets. Both inputs are sorted, so this is a single
    /// linear merge and the result is sorted as well.
    pub fn intersection(&self, other: &RowSet) -> RowSet {
        let (left, right) = (&self.0, &other.0);
        let mut shared = Vec::with_capacity(left.len().min(right.len()));
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            match left[i].cmp(&right[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared.push(left[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        RowSet(shared)
    }

    /// Copies the selected rows of `data` into a new frame.
    pub fn materialize(&self, data: &DataFrame) -> PolarsResult<DataFrame> {
        frame::take_rows(data, &self.0)
    }
}

/// The dimension a stratum was cut along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StratumKind {
    Sex,
    Age,
    Hospital,
    InstrumentType,
    PatientClass,
}

impl From<Dimension> for StratumKind {
    fn from(dimension: Dimension) -> Self {
        match dimension {
            Dimension::Sex => Self::Sex,
            Dimension::Hospital => Self::Hospital,
            Dimension::InstrumentType => Self::InstrumentType,
            Dimension::PatientClass => Self::PatientClass,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stratum {
    pub name: String,
    pub kind: StratumKind,
    pub rows: RowSet,
}

impl Stratum {
    pub fn new(name: impl Into<String>, kind: StratumKind, rows: RowSet) -> Self {
        Self {
            name: name.into(),
            kind,
            rows,
        }
    }
}

/// All leaf strata of one dataset plus the distinguished main entry.
///
/// Insertion follows dictionary-update semantics: a stratum whose name is
/// already present replaces the earlier one in place. The main entry lives
/// outside the name table, so no stratum can displace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrataCollection {
    main: RowSet,
    strata: Vec<Stratum>,
    index: AHashMap<String, usize>,
}

impl StrataCollection {
    pub fn new(height: usize) -> Self {
        Self {
            main: RowSet::all(height),
            strata: Vec::new(),
            index: AHashMap::new(),
        }
    }

    pub fn insert(&mut self, stratum: Stratum) {
        match self.index.get(&stratum.name) {
            Some(&slot) => {
                let previous = &self.strata[slot];
                log::warn!(
                    "Stratum '{}' ({:?}) replaces an earlier stratum of the same name ({:?})",
                    stratum.name,
                    stratum.kind,
                    previous.kind
                );
                self.strata[slot] = stratum;
            }
            None => {
                self.index.insert(stratum.name.clone(), self.strata.len());
                self.strata.push(stratum);
            }
        }
    }

    pub fn extend(&mut self, strata: impl IntoIterator<Item = Stratum>) {
        for stratum in strata {
            self.insert(stratum);
        }
    }

    pub fn main(&self) -> &RowSet {
        &self.main
    }

    /// Row count of the dataset the collection was built from.
    pub fn height(&self) -> usize {
        self.main.len()
    }

    pub fn get(&self, name: &str) -> Option<&Stratum> {
        self.index.get(name).map(|&slot| &self.strata[slot])
    }

    /// Leaf strata in insertion order. The main entry is not included.
    pub fn strata(&self) -> &[Stratum] {
        &self.strata
    }

    pub fn len(&self) -> usize {
        self.strata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strata.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[IdxSize]) -> RowSet {
        RowSet::from_predicate(&(0..10).collect::<Vec<IdxSize>>(), |v| values.contains(v))
    }

    #[test]
    fn intersection_is_sorted_merge() {
        let a = rows(&[0, 2, 4, 6, 8]);
        let b = rows(&[1, 2, 3, 6, 9]);
        assert_eq!(a.intersection(&b).as_slice(), &[2, 6]);
        assert_eq!(a.intersection(&b), b.intersection(&a));
        assert!(a.intersection(&RowSet::default()).is_empty());
    }

    #[test]
    fn all_covers_every_row() {
        let all = RowSet::all(4);
        assert_eq!(all.as_slice(), &[0, 1, 2, 3]);
        assert!(all.contains(3));
        assert!(!all.contains(4));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut collection = StrataCollection::new(10);
        collection.insert(Stratum::new("male", StratumKind::Sex, rows(&[0, 1])));
        collection.insert(Stratum::new("hospital1", StratumKind::Hospital, rows(&[2])));
        collection.insert(Stratum::new("male", StratumKind::Hospital, rows(&[5])));

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.strata()[0].name, "male");
        assert_eq!(collection.strata()[0].kind, StratumKind::Hospital);
        assert_eq!(collection.get("male").unwrap().rows.as_slice(), &[5]);
        assert_eq!(collection.height(), 10);
        assert_eq!(collection.main().len(), 10);
    }
}
