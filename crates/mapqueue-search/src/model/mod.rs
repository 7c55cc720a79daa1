//! Typed, validated search requests.

pub mod conditions;
pub mod filters;
pub mod regex_guard;
pub mod search;
pub mod sorting;
pub mod terms;
pub mod value;

pub use conditions::{Conditions, Operator};
pub use filters::{FieldFilters, FiltersSchema};
pub use regex_guard::{default_probe, DeadlineProbe, RegexSafetyProbe, StaticProbe};
pub use search::{ParseContext, RawQuery, SearchSchema};
pub use sorting::{SortingOption, SortingOrder, SortingSchema};
pub use terms::{FieldWeights, PatternKind, PatternMultipliers, SearchTermsSchema};
pub use value::ConditionValue;
