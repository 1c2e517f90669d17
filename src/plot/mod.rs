//! Profile plotting.
//!
//! - `ascii`: terminal plots for `steppar report`
//! - `svg`: per-parameter diagnostic figures written during the sweep

pub mod ascii;
pub mod svg;

pub use ascii::{AsciiProfile, render_profile_plot};
pub use svg::SvgProfileSink;
