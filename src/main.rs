//! QHA command-line interface
//!
//! Reads a YAML settings file and writes thermodynamic tables to the output directory.

use color_eyre::eyre::Result;
use qha::app::QhaApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    QhaApplication::from_cli()?.run()
}
