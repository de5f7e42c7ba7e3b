//! Structural diff of two ugen graphs.
//!
//! The differ walks both graphs in lock-step from their roots, comparing ugen
//! class names, input counts and each input position. Matching is purely
//! positional: input `k` on one side is compared with input `k` on the other,
//! with no attempt to align permuted siblings.
//!
//! The result is a flat list of [`DiffEntry`] pairs in pre-order,
//! left-to-right discovery order. An empty list means the two graphs are
//! structurally identical.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::graph::{Graph, Input};

/// Ugen classes whose two operands may be swapped without changing the result.
///
/// The differ does not consult this table; swapped operands are still reported.
pub const COMMUTATIVE_KINDS: &[&str] = &["BinaryOpUGen"];

/// Returns `true` if `name` is listed in [`COMMUTATIVE_KINDS`].
pub fn is_commutative(name: &str) -> bool {
    COMMUTATIVE_KINDS.contains(&name)
}

/// One point of divergence, described once per side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffEntry {
    /// Description from the first graph's point of view.
    pub left: String,
    /// Description from the second graph's point of view.
    pub right: String,
}

impl DiffEntry {
    fn new(left: String, right: String) -> Self {
        Self { left, right }
    }

    /// Returns the entry with its two sides exchanged.
    pub fn swapped(self) -> Self {
        Self {
            left: self.right,
            right: self.left,
        }
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.left, self.right)
    }
}

/// Errors raised while walking two graphs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// The walk reached a pair of ugens it was already comparing.
    #[error("cyclic ugen graph: ugen {left} / ugen {right} reached again while still being compared")]
    Cycle {
        /// Ugen index in the first graph.
        left: usize,
        /// Ugen index in the second graph.
        right: usize,
    },
}

/// Compares two graphs and returns every structural difference found.
///
/// Graphs with a different number of ugens or constants are not walked; the
/// result is a single entry describing the counts.
pub fn diff(a: &Graph, b: &Graph) -> Result<Vec<DiffEntry>, DiffError> {
    if a.len() != b.len() {
        return Ok(vec![DiffEntry::new(
            format!("{} ugens", a.len()),
            format!("{} ugens", b.len()),
        )]);
    }
    if a.constants().len() != b.constants().len() {
        return Ok(vec![DiffEntry::new(
            format!("{} constants", a.constants().len()),
            format!("{} constants", b.constants().len()),
        )]);
    }
    if a.is_empty() {
        return Ok(Vec::new());
    }

    let (root_a, root_b) = (a.root(), b.root());
    tracing::debug!(root_a, root_b, ugens = a.len(), "diff: walking from roots");

    let mut differ = Differ {
        a,
        b,
        visiting: HashSet::new(),
        diffs: Vec::new(),
    };
    differ.walk(root_a, root_b)?;

    tracing::debug!(entries = differ.diffs.len(), "diff: done");
    Ok(differ.diffs)
}

struct Differ<'a> {
    a: &'a Graph,
    b: &'a Graph,
    /// Ugen pairs on the current recursion path.
    visiting: HashSet<(usize, usize)>,
    diffs: Vec<DiffEntry>,
}

impl Differ<'_> {
    fn walk(&mut self, idx_a: usize, idx_b: usize) -> Result<(), DiffError> {
        if !self.visiting.insert((idx_a, idx_b)) {
            return Err(DiffError::Cycle {
                left: idx_a,
                right: idx_b,
            });
        }
        let result = self.compare(idx_a, idx_b);
        self.visiting.remove(&(idx_a, idx_b));
        result
    }

    fn compare(&mut self, idx_a: usize, idx_b: usize) -> Result<(), DiffError> {
        let (a, b) = (self.a, self.b);
        let (ua, ub) = (a.ugen(idx_a), b.ugen(idx_b));

        if ua.name != ub.name {
            self.diffs.push(DiffEntry::new(
                format!("ugen {} is a {}", idx_a, ua.name),
                format!("ugen {} is a {}", idx_b, ub.name),
            ));
            return Ok(());
        }
        if ua.inputs.len() != ub.inputs.len() {
            self.diffs.push(DiffEntry::new(
                format!("{} has {} inputs", ua.name, ua.inputs.len()),
                format!("{} has {} inputs", ub.name, ub.inputs.len()),
            ));
            return Ok(());
        }

        for (i, (ia, ib)) in ua.inputs.iter().zip(&ub.inputs).enumerate() {
            match (*ia, *ib) {
                (Input::Constant { index: ca }, Input::Constant { index: cb }) => {
                    let (va, vb) = (a.constant(ca), b.constant(cb));
                    // Exact: no epsilon, and NaN equals NaN.
                    if va != vb && !(va.is_nan() && vb.is_nan()) {
                        self.diffs.push(DiffEntry::new(
                            format!(
                                "{} (ugen {}), input {} has constant value {:.6}",
                                ua.name, idx_a, i, va
                            ),
                            format!(
                                "{} (ugen {}), input {} has constant value {:.6}",
                                ub.name, idx_b, i, vb
                            ),
                        ));
                    }
                }
                (Input::Constant { index: ca }, Input::Ugen { node: nb, .. }) => {
                    self.diffs.push(DiffEntry::new(
                        constant_label(a, idx_a, i, ca),
                        reference_label(b, idx_b, i, nb),
                    ));
                }
                (Input::Ugen { node: na, .. }, Input::Constant { index: cb }) => {
                    self.diffs.push(DiffEntry::new(
                        reference_label(a, idx_a, i, na),
                        constant_label(b, idx_b, i, cb),
                    ));
                }
                (Input::Ugen { node: na, .. }, Input::Ugen { node: nb, .. }) => {
                    self.walk(na, nb)?;
                }
            }
        }
        Ok(())
    }
}

fn constant_label(g: &Graph, ugen: usize, input: usize, constant: usize) -> String {
    format!(
        "{}({}), input {} is constant ({:.6})",
        g.ugen(ugen).name,
        ugen,
        input,
        g.constant(constant)
    )
}

fn reference_label(g: &Graph, ugen: usize, input: usize, target: usize) -> String {
    format!(
        "{}({}), input {} points to {}({})",
        g.ugen(ugen).name,
        ugen,
        input,
        g.ugen(target).name,
        target
    )
}
