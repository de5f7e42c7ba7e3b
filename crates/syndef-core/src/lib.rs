//! Inspection tools for SuperCollider synthdefs.
//!
//! This crate loads SCgf synthdef files into an immutable ugen [`Graph`] and
//! offers three views of it:
//!
//! - **Structural diff**: [`diff`] walks two graphs in lock-step from their
//!   roots and reports where their shape, ugen classes, input counts or
//!   constant values diverge
//! - **Tree view**: [`render`] prints one graph as a box-drawing tree
//! - **Export**: [`export`] writes JSON, Graphviz or XML
//!
//! # Example
//!
//! ```rust,no_run
//! use syndef_core::{diff, load_synthdef};
//!
//! let a = load_synthdef("a.scsyndef", None).unwrap();
//! let b = load_synthdef("b.scsyndef", None).unwrap();
//!
//! for entry in diff(&a.graph, &b.graph).unwrap() {
//!     println!("{:<50}{:<50}", entry.left, entry.right);
//! }
//! ```

pub mod differ;
mod error;
pub mod export;
pub mod graph;
pub mod synthdef;
pub mod tree;

pub use differ::{COMMUTATIVE_KINDS, DiffEntry, DiffError, diff, is_commutative};
pub use error::{Error, Result};
pub use graph::{Graph, GraphError, Input, Rate, Ugen};
pub use synthdef::{
    EncodeError, LoadError, ParamName, Synthdef, Variant, load_synthdef, read_synthdefs,
    write_synthdefs,
};
pub use tree::{TreeLines, render, render_to_string};
