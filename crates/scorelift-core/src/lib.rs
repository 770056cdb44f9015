//! Core building blocks for scorelift.
//!
//! This crate holds the pieces of the recognition pipeline that do not touch
//! the OMR engine: the fallback MusicXML document, a light structural
//! analysis of MusicXML text, output file naming, and the line-oriented
//! stdout protocol that orchestrating processes scrape.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod analysis;
pub mod error;
pub mod fallback;
pub mod output;
pub mod protocol;

pub use analysis::{analyze, ScoreSummary};
pub use error::{Error, Result};
pub use fallback::fallback_musicxml;
pub use output::output_path;
pub use protocol::Sentinel;
