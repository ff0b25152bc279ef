//! # hostd-domain
//!
//! Pure domain model for the libvirt host control daemon.
//!
//! ## Responsibilities
//! - Foundational types: the 128-bit domain identifier and the normalized
//!   caller-supplied query used to look one up
//! - Define **Domain Records** (a snapshot of one active domain, with the
//!   handle needed to address it)
//! - Define **Lifecycle Commands** (`shutdown`, `reset`, `reboot`)
//! - Define the error conventions shared by every layer
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod command;
pub mod error;
pub mod id;
pub mod record;
