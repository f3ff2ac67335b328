//! Infrastructure layer - engine components and service implementations

pub mod experiment;
pub mod logging;
pub mod services;
