//! Quasi-harmonic approximation thermodynamics.
//!
//! Free energies F(T, V) from static energies and phonon frequencies, for a
//! single structure or a set of weighted configurations, turned into
//! thermodynamic properties on a (temperature, pressure) grid.

pub mod app;
pub mod config;
pub mod error;
pub mod fitting;
pub mod free_energy;
pub mod frequencies;
pub mod grid;
pub mod io;
pub mod multi_config;
pub mod pipeline;
pub mod statmech;
pub mod strain;
pub mod thermodynamics;
pub mod tools;
pub mod units;
pub mod v2p;

pub use error::{QhaError, Result};
