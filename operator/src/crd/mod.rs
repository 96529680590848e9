pub mod common;
pub mod convert;
pub mod v1alpha1;
pub mod v1beta1;

#[cfg(test)]
pub mod test_fixtures;

/// The shape every other component in this crate operates on. `v1alpha1` only exists for the
/// conversion webhook surface.
pub use v1beta1::{TeamCity, TeamCitySpec};
