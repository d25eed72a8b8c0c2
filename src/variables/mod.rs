//! Variable resolution for stored requests.
//!
//! Environments supply string variables; [`resolve`] substitutes them into
//! URLs, header values and bodies using the `{{name}}` placeholder syntax.

pub mod substitution;

pub use substitution::{
    contains_placeholder, placeholder_names, resolve, try_resolve, unresolved_names, VarError,
    PLACEHOLDER_OPEN,
};
