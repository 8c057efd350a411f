use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    event::{Category, EventGroup},
    layout::RunValue,
};

/// All runs of one batch, with totals appended and master item lists built.
#[derive(Debug)]
pub struct Aggregate {
    groups: Vec<EventGroup>,
    master_lists: BTreeMap<Category, Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Parity {
    Consistent,
    Mismatch(StructuralMismatch),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum StructuralMismatch {
    #[error("{category} event counts differ: {left} vs {right}")]
    Length {
        category: Category,
        left: usize,
        right: usize,
    },
    #[error("{category} event {index} differs: {left:?} vs {right:?}")]
    Name {
        category: Category,
        index: usize,
        left: String,
        right: String,
    },
}

impl Aggregate {
    pub fn new(mut groups: Vec<EventGroup>) -> Self {
        // Totals are chartable items, so they must exist before the master lists are built.
        for group in groups.iter_mut() {
            group.append_totals();
        }

        let master_lists = Category::ALL
            .iter()
            .map(|&category| (category, master_list(&groups, category)))
            .collect::<BTreeMap<_, _>>();
        for (category, items) in &master_lists {
            debug!(%category, ?items, "Master list");
        }
        info!(runs = groups.len(), "Aggregated runs");

        Self {
            groups,
            master_lists,
        }
    }

    pub fn groups(&self) -> &[EventGroup] {
        &self.groups
    }

    pub fn master_list(&self, category: Category) -> &[String] {
        self.master_lists.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One value per run, in run order.
    pub fn values(&self, category: Category, item: &str) -> Vec<RunValue> {
        self.groups
            .iter()
            .map(|group| match group.find(category, item) {
                Some(event) => RunValue::Present(event.duration),
                None => RunValue::Missing,
            })
            .collect()
    }

    pub fn legend(&self) -> Vec<String> {
        self.groups
            .iter()
            .map(|group| group.description().to_owned())
            .collect()
    }

    /// Compares every run against the first, returning the paths of each inconsistent pair.
    pub fn check_parity(&self) -> Vec<(&str, &str, StructuralMismatch)> {
        let Some((first, rest)) = self.groups.split_first() else {
            return vec![];
        };
        rest.iter()
            .filter_map(|group| match compare(first, group) {
                Parity::Consistent => None,
                Parity::Mismatch(mismatch) => Some((&*first.path, &*group.path, mismatch)),
            })
            .collect()
    }
}

/// Item names in first-occurrence order across runs, then within each run.
fn master_list(groups: &[EventGroup], category: Category) -> Vec<String> {
    let mut seen = BTreeSet::default();
    groups
        .iter()
        .flat_map(|group| group.events(category))
        .filter(|event| seen.insert(event.name.clone()))
        .map(|event| event.name.clone())
        .collect()
}

/// Strict positional comparison of two runs. Lengths are checked for every category before any
/// names are compared.
pub fn compare(left: &EventGroup, right: &EventGroup) -> Parity {
    for category in Category::ALL {
        let (l, r) = (left.events(category).len(), right.events(category).len());
        if l != r {
            return Parity::Mismatch(StructuralMismatch::Length {
                category,
                left: l,
                right: r,
            });
        }
    }
    for category in Category::ALL {
        let pairs = left.events(category).iter().zip(right.events(category));
        for (index, (l, r)) in pairs.enumerate() {
            if l.name != r.name {
                return Parity::Mismatch(StructuralMismatch::Name {
                    category,
                    index,
                    left: l.name.clone(),
                    right: r.name.clone(),
                });
            }
        }
    }

    Parity::Consistent
}

#[cfg(test)]
fn group(path: &str, kernels: &[(&str, f64)]) -> EventGroup {
    use crate::event::Event;

    let mut result = EventGroup::new(path);
    for &(name, duration) in kernels {
        result.push(Event::new(Category::Kernel, name, duration));
    }
    result
}

#[test]
fn test_master_list_order() {
    let aggregate = Aggregate::new(vec![
        group("1", &[("A", 1.0), ("B", 2.0)]),
        group("2", &[("B", 3.0), ("C", 4.0)]),
    ]);
    assert_eq!(aggregate.master_list(Category::Kernel), ["A", "B", "Total", "C"]);
    assert_eq!(aggregate.master_list(Category::Io), ["Total"]);
    assert_eq!(
        aggregate.values(Category::Kernel, "C"),
        [RunValue::Missing, RunValue::Present(4.0)]
    );
    assert_eq!(
        aggregate.values(Category::Kernel, "Total"),
        [RunValue::Present(3.0), RunValue::Present(7.0)]
    );
}

#[test]
fn test_aggregate_does_not_double_count() {
    let mut first = group("1", &[("A", 10.0), ("B", 5.0)]);
    first.append_totals();
    let aggregate = Aggregate::new(vec![first]);
    assert_eq!(
        aggregate.values(Category::Kernel, "Total"),
        [RunValue::Present(15.0)]
    );
    assert_eq!(aggregate.groups()[0].events(Category::Kernel).len(), 3);
}

#[test]
fn test_compare() {
    assert_eq!(
        compare(
            &group("1", &[("A", 1.0), ("B", 1.0)]),
            &group("2", &[("A", 2.0), ("B", 2.0)])
        ),
        Parity::Consistent
    );
    assert_eq!(
        compare(
            &group("1", &[("A", 1.0), ("B", 1.0)]),
            &group("2", &[("A", 1.0), ("C", 1.0)])
        ),
        Parity::Mismatch(StructuralMismatch::Name {
            category: Category::Kernel,
            index: 1,
            left: "B".to_owned(),
            right: "C".to_owned(),
        })
    );
    assert_eq!(
        compare(
            &group("1", &[("A", 1.0), ("B", 1.0)]),
            &group("2", &[("X", 1.0), ("Y", 1.0), ("Z", 1.0)])
        ),
        Parity::Mismatch(StructuralMismatch::Length {
            category: Category::Kernel,
            left: 2,
            right: 3,
        })
    );
}

#[test]
fn test_check_parity() {
    let aggregate = Aggregate::new(vec![
        group("1", &[("A", 1.0)]),
        group("2", &[("A", 1.0)]),
        group("3", &[("B", 1.0)]),
    ]);
    let mismatches = aggregate.check_parity();
    assert_eq!(mismatches.len(), 1);
    assert_eq!((mismatches[0].0, mismatches[0].1), ("1", "3"));
}
