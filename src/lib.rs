//! classifier-chains: ensembles of classifier chains for multi-label problems.
//!
//! This crate trains one binary classifier per label, chained so that each
//! classifier may consume the predictions of previously trained labels as
//! extra input features. Chains are combined into bagged ensembles, and both
//! layers (per-label slots within a chain, members within an ensemble) can be
//! trained on bounded worker pools.
//!
//! The base learner is an opaque capability supplied through the
//! [`models::learner::BaseLearner`] trait; a deterministic nearest-centroid
//! learner and a GBDT-backed learner ship with the crate.
pub mod chain;
pub mod config;
pub mod dataset;
pub mod ensemble;
pub mod error;
pub mod models;
pub mod predict;
pub mod registry;
pub mod sampling;
