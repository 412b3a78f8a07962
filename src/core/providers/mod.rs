//! Provider implementations

pub mod replicate;

pub use replicate::ReplicateProvider;
