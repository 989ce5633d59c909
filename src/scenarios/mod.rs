//! Scenario catalogue

pub mod synapse;
