//! Input/Output operations for QHA runs
//!
//! This module handles the input-file reader, logging setup and the result tables.

mod input_reader;
mod output;
mod results_writer;

pub use input_reader::{parse_input, read_input, InputData};
pub use output::{init_logging, RunSummary};
pub use results_writer::{sample_stride, ResultsWriter};
