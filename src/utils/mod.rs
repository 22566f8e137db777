//! Utility functions and helpers.

pub mod url;

pub use url::{parse_link_header, strip_template, with_page, PageLinks};
