pub mod admission;
pub mod builders;
pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod crd;
pub mod labels;
pub mod operator;
pub mod predicate;
pub mod upgrade;
pub mod validate;
