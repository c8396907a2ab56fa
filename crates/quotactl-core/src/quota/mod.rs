//! Microsoft.Quota resources and workflows
//!
//! [`QuotaClient`] issues single requests. [`QuotaRequest`] and
//! [`ArmResourceOperation`] plug those requests into the tracking engine,
//! and the `*_and_wait` workflows run them end to end.

pub mod client;
pub mod operations;
pub mod params;
pub mod workflows;

pub use client::QuotaClient;
pub use operations::{ArmAction, ArmResourceOperation, QuotaRequest, RequestKind};
pub use params::*;
pub use workflows::*;
