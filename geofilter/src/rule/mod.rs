//! Declarative filter rules and their translation.
//!
//! # Translation
//!
//! ```text
//! FilterQuery ──► group rules by attribute ──► Predicate tree
//!                                                  │
//!                        ┌─────────────────────────┴──────────────┐
//!                        ▼                                        ▼
//!              Predicate::matches()                     ogc::encode_filter()
//!              (in-memory evaluation)                   (WFS Filter XML)
//! ```
//!
//! Both evaluation paths share the same predicate tree, so a rule selects the
//! same features whether it runs locally or on the server.

pub mod ogc;
mod predicate;
mod types;

pub use predicate::{CompareOp, Predicate};
pub use types::{Combinator, FilterQuery, FilterRule, Operator, RuleValue};
