//! Resource kinds served by the regis registry.
//!
//! Two families share one backing store:
//!
//! - [`deploy`]: [`Deployment`] and [`DeploymentConfig`]
//! - [`image`]: [`Image`] and [`ImageRepository`]
//!
//! Each family is exposed through a façade holding one typed
//! [`Registry`](regis_registry::Registry) per kind.

pub mod deploy;
pub mod image;

pub use deploy::{
    ControllerTemplate, DeployRegistry, Deployment, DeploymentConfig, DeploymentStatus,
    DeploymentStrategy, DeploymentTemplate, DeploymentTrigger, StrategyType,
};
pub use image::{DockerImageMetadata, Image, ImageRegistry, ImageRepository, ImageRepositoryStatus};
