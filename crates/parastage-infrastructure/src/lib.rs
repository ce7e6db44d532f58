//! Infrastructure adapters for the Parastage staging engine: on-disk
//! persistence, configuration loading and the external collaborators.

pub mod assignment_proposer;
pub mod config_service;
pub mod dto;
pub mod openscad_renderer;
pub mod paths;
pub mod storage;
pub mod toml_version_repository;

pub use crate::assignment_proposer::AssignmentProposer;
pub use crate::config_service::ConfigService;
pub use crate::openscad_renderer::OpenScadRenderer;
pub use crate::paths::{ParastagePaths, PathError};
pub use crate::toml_version_repository::TomlVersionRepository;
