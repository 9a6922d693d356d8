//! Per-user block list and visibility filtering.
//!
//! - [`store`]: add, remove, list and count rules
//! - [`audit`]: the ledger of reversed rules
//! - [`visibility`]: per-request filters for content listings
//! - [`relation`]: point queries between one viewer and one target

pub mod audit;
pub mod error;
pub mod relation;
pub mod safe_regex;
pub mod store;
pub mod validate;
pub mod visibility;

pub use crate::orm::block_entries::BlockKind;
pub use error::{BlockError, ErrorKind};
pub use relation::{RelationView, Relationship, ViewerRules};
pub use store::{BlockListStore, Page, Rule, RuleView, TagSummary};
pub use visibility::{FieldBinding, TagLink, VisibilityFilter, VisibilityFilterBuilder};
