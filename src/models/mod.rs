pub mod centroid;
pub mod factory;
pub mod gbdt;
pub mod learner;
