//! rsharp_binder: Semantic analysis for the rsharp front end.
//!
//! The binder resolves types over a parsed compilation unit and reports
//! conversion, scope, label and loop-nesting errors. The flow pass then
//! reports unreachable code and unreferenced labels.

pub mod binder;
pub mod condition;
pub mod conversions;
pub mod flow;
pub mod scope;
pub mod types;

pub use binder::{Binder, BoundUnit};
pub use condition::{bind_condition, check_implicit_conversion};
pub use conversions::{ConversionClassifier, ConversionKind, UserDefinedConversion};
pub use flow::check_reachability;
pub use types::{SpecialType, TypeId, TypeKind, TypeTable, WellKnownGeneric};
