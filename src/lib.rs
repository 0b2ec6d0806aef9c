//! Annotating MALDI-TOF glycan mass lists with candidate compositions, from a library or a De-Novo search

mod config;
mod mass_list;
mod workflow;

// Re-exports
pub use config::{Config, ConfigError, DEFAULT_CONFIG};
pub use mass_list::{MassListError, parse_mass_list, read_mass_list, read_mass_lists};
pub use workflow::{DEFAULT_DATABASE, SearchSpace, Workflow, WorkflowError, default_output_dir};
