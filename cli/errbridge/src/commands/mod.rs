//! CLI command implementations.

pub mod contract;
pub mod doctor;
pub mod init;
pub mod simulate;
