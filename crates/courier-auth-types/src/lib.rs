//! Access-token types shared across the Courier workspace.
//!
//! Provides JWT issuing/validation and the `Identity` request extractor.

pub mod bearer;
pub mod token;
