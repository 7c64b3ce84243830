// selector-core/src/lib.rs
// Pure Rust selector compiler and matcher core.

// Allow clippy lints that are too strict for this codebase
#![allow(clippy::too_many_arguments)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::nonminimal_bool)]
#![allow(clippy::result_large_err)]
#![allow(clippy::manual_unwrap_or_default)]
#![allow(clippy::manual_unwrap_or)]
#![allow(clippy::single_match)]
#![allow(clippy::unnecessary_cast)]
#![allow(clippy::approx_constant)]
// Tests may have helper functions not used in all test cases
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

pub mod branch;
pub mod compare;
pub mod error;
pub mod geo;
pub mod logging;
pub mod matcher;
pub mod path;
pub mod regex_cache;
pub mod structural;

// Public exports
pub use error::{Result, SelectorError};
pub use logging::{get_log_level, set_log_level, LogLevel};
pub use matcher::{MatchResult, Matcher, WhereRegistry};
pub use path::{lookup, lookup_for_sort, make_lookup_function, Branch, IndexStep};

pub use bson::{Bson, Document};
