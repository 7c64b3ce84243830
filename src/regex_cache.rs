//! Compiled-regex cache shared by every `$regex` / regex-literal matcher.
//!
//! Grounded directly in `query/operators.rs`'s `REGEX_CACHE` /
//! `get_or_compile_regex`: an `lru::LruCache` behind a `Mutex`, populated
//! lazily via `lazy_static!`. Kept at the same capacity the teacher chose.

use lazy_static::lazy_static;
use lru::LruCache;
use regex::{Regex, RegexBuilder};
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::error::{Result, SelectorError};

const REGEX_CACHE_CAPACITY: usize = 100;

lazy_static! {
    static ref REGEX_CACHE: Mutex<LruCache<String, Regex>> =
        Mutex::new(LruCache::new(NonZeroUsize::new(REGEX_CACHE_CAPACITY).unwrap()));
}

/// Builds the cache key `/pattern/options` and returns a compiled `Regex`,
/// compiling and caching it on first use. `options` must already have been
/// validated as a subset of `i`, `m`, `g` by the caller (C4's `$regex`).
pub fn get_or_compile(pattern: &str, options: &str) -> Result<Regex> {
    let key = format!("{pattern}\0{options}");
    if let Some(cached) = REGEX_CACHE.lock().unwrap().get(&key) {
        return Ok(cached.clone());
    }

    let compiled = build_regex(pattern, options)?;
    REGEX_CACHE
        .lock()
        .unwrap()
        .put(key, compiled.clone());
    Ok(compiled)
}

fn build_regex(pattern: &str, options: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    // `g` (global) has no meaning for a single `is_match` test — the
    // `regex` crate has no mutable scan cursor to reset between calls, so
    // there is no `lastIndex`-equivalent state to carry. `i`/`m` map
    // directly onto crate-level case-insensitive / multi-line flags.
    for flag in options.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            'g' => {}
            other => {
                return Err(SelectorError::OperatorOperandTypeError(format!(
                    "unsupported regex option '{other}'"
                )))
            }
        }
    }
    builder.build().map_err(SelectorError::from)
}
