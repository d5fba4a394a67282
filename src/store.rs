//! The abstract store: a mapping from variable names to intervals.

use std::collections::BTreeMap;
use std::fmt;

use crate::interval::Interval;

/// Finite map from variable name to [`Interval`].
///
/// Keys are exactly the declared variables of the analyzed program; they are
/// inserted at declaration time and never removed. An ordered map keeps the
/// rendered output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    map: BTreeMap<String, Interval>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, var: impl Into<String>, interval: Interval) {
        self.map.insert(var.into(), interval);
    }

    /// Reads a variable; an absent key reads as ⊤. After the equation
    /// builder has validated the program every lookup hits an existing key.
    pub fn get(&self, var: &str) -> Interval {
        self.map.get(var).copied().unwrap_or(Interval::TOP)
    }

    pub fn contains_var(&self, var: &str) -> bool {
        self.map.contains_key(var)
    }

    /// Pointwise join: shared keys are joined, missing keys inserted as-is.
    pub fn join_all(&mut self, other: &Store) {
        for (var, interval) in &other.map {
            match self.map.get_mut(var) {
                Some(existing) => *existing = existing.join(interval),
                None => {
                    self.map.insert(var.clone(), *interval);
                }
            }
        }
    }

    /// Pointwise widening of `self` against a newer store.
    pub fn widen_all(&mut self, newer: &Store) {
        for (var, interval) in &newer.map {
            match self.map.get_mut(var) {
                Some(existing) => *existing = existing.widen(interval),
                None => {
                    self.map.insert(var.clone(), *interval);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Interval)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, interval)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var}: {interval}")?;
        }
        write!(f, "}}")
    }
}
