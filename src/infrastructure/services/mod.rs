//! Application services built on the domain layer

pub mod experiment_service;

pub use experiment_service::{
    CreateExperimentRequest, CreateVariantRequest, ExperimentOverview, ExperimentService,
};
