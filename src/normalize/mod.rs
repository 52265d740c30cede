// src/normalize/mod.rs
//! Field normalization applied to every raw feed entry before classification.

pub mod text;
pub mod title;
pub mod url;

pub use self::text::{clean, summarize, truncate_chars, SUMMARY_MAX_WORDS};
pub use self::title::{looks_generic, repair_title};
pub use self::url::{
    canonicalize, host_of, normalize_host, strip_tracking_params, HttpRedirectResolver,
    PassthroughResolver, RedirectResolver, Resolution,
};
