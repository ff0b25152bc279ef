//! # hostd-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **driven/outbound port** the hypervisor adapter implements:
//!   - `ManagementSession` — list active domains, run a lifecycle command
//! - Define the **driving/inbound** use-case:
//!   - `DispatchService` — normalize an identifier, resolve it against the
//!     live listing, issue exactly one lifecycle command
//! - Hold no state between requests
//!
//! ## Dependency rule
//! Depends on `hostd-domain` only.
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;
