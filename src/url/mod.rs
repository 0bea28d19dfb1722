//! URL handling module for dir-harvest
//!
//! Directory pages hand out relative and sometimes malformed links; this
//! module turns them into absolute URLs and builds listing page URLs.

mod normalize;

pub use normalize::{absolutize, page_url};
