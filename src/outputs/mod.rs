//! Output generation for the load stage.
//!
//! # Submodules
//!
//! - [`csv`]: writes the filtered records to the flat CSV file
//! - [`report`]: writes the JSON run report
//!
//! # Output Format
//!
//! ```text
//! 1,Budget passed,The assembly approved the budget.,https://www.dawn.com/news/1
//! 2,"Floods, again",Rivers rose overnight.,https://www.bbc.com/news/2
//! ```
//!
//! No header row; the file is replaced on every run.

pub mod csv;
pub mod report;
