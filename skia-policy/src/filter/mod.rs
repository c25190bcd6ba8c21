//! Rule matching and the policy pipeline

pub mod matcher;
pub mod policy;
pub mod prefilter;

pub use matcher::{DomainSet, HostMatcher};
pub use policy::PolicyEngine;
pub use prefilter::BypassFilter;
