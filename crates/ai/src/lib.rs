//! `kbgate-ai`
//!
//! **Responsibility:** contract between job producers (knowledge-base article
//! generation and similar LLM-backed work) and the admission controller.
//!
//! This crate does not run anything:
//! - It defines what a job body returns ([`JobOutcome`] / [`JobError`]).
//! - It defines the object form of a job ([`BackgroundJob`]).
//! - It maps the loosely typed collaborator report ([`JobReport`]) onto both.

pub mod job;
pub mod result;

pub use job::{BackgroundJob, JobFuture};
pub use result::{JobError, JobOutcome, JobReport};
