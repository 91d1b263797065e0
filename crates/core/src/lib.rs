//! `kbgate-core`: shared building blocks.
//!
//! Identifiers and correlation metadata used by the job contract and the
//! admission controller. No runtime or infrastructure concerns live here.

pub mod error;
pub mod id;
pub mod meta;

pub use error::IdError;
pub use id::{JobId, TenantId, TenantKey};
pub use meta::JobMeta;
