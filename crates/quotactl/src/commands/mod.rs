//! Command implementations

pub mod allocation;
pub mod group;
pub mod limit;
pub mod operation;
pub mod profile;
pub mod smoke;
pub mod subscription;
pub mod wait;
