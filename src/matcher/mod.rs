//! The selector matcher: compiles a `bson::Bson` selector into a tagged AST
//! (`ast`) and evaluates it in three layers (`element` C4, `branched` C5,
//! `document` C6), driven by the compiler façade (`compile`, C7).

mod ast;
mod branched;
mod compile;
mod document;
mod element;

pub use ast::MatchResult;
pub use compile::{Matcher, WhereRegistry};
