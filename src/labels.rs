//! Mapping between caller label values and the dense class codes the solver
//! works with.
//!
//! Codes start at 1 and follow first-seen order. The index only grows: once
//! a code is issued it keeps pointing at the same label.
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct LabelIndex<L> {
    codes: HashMap<L, i32>,
    labels: Vec<L>,
}

impl<L> Default for LabelIndex<L> {
    fn default() -> Self {
        Self {
            codes: HashMap::new(),
            labels: Vec::new(),
        }
    }
}

impl<L: Clone + Eq + Hash> LabelIndex<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a training label sequence, returning one code per label and
    /// the index that decodes them.
    pub fn encode(labels: &[L]) -> (Vec<i32>, Self) {
        let mut index = Self::new();
        let codes = labels.iter().map(|l| index.code_or_insert(l)).collect();
        (codes, index)
    }

    /// Codes for `values`, issuing new codes (after the existing ones) for
    /// labels not seen before. Existing codes are left untouched.
    pub fn encode_extra<'a, I>(&mut self, values: I) -> Vec<i32>
    where
        I: IntoIterator<Item = &'a L>,
        L: 'a,
    {
        values.into_iter().map(|l| self.code_or_insert(l)).collect()
    }

    fn code_or_insert(&mut self, label: &L) -> i32 {
        if let Some(&code) = self.codes.get(label) {
            return code;
        }
        self.labels.push(label.clone());
        let code = self.labels.len() as i32;
        self.codes.insert(label.clone(), code);
        code
    }

    pub fn code_of(&self, label: &L) -> Option<i32> {
        self.codes.get(label).copied()
    }
}

impl<L> LabelIndex<L> {
    /// Label behind `code`.
    pub fn decode(&self, code: i32) -> Result<&L> {
        usize::try_from(code)
            .ok()
            .and_then(|c| c.checked_sub(1))
            .and_then(|i| self.labels.get(i))
            .ok_or(Error::OutOfRange {
                code,
                len: self.labels.len(),
            })
    }

    /// Number of issued codes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels ordered by code (`labels()[code - 1]`).
    pub fn labels(&self) -> &[L] {
        &self.labels
    }
}
