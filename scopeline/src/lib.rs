//! Application framework based on [scopeline_di] scoped containers.
//!
//! Traditional applications start in the `main()` function and explicitly initialize and pass
//! around various services. With a scoped container in place, application layers only describe
//! how to build their objects, and the container decides when to build, share and close them.
//! This, in turn, requires an entrypoint which collects definitions from all layers, creates the
//! root container and runs the actual business logic. This crate provides such entrypoint in the
//! form of [Application](application::Application), which also configures additional supporting
//! infrastructure, e.g. logging.

pub mod application;
pub mod config;
pub mod provider;
pub mod runner;
