//! Infrastructure layer: state assembly from configuration.

pub mod state;
