//! REST client for the NetBox API.
//!
//! [`NetBoxRestClient`] implements the CRUD/bulk surface ([`NetBoxApi`]) and
//! branch lifecycle ([`BranchApi`]). Each request is scoped to a branch when
//! it is built, so branch administration never disturbs the session's active
//! branch.

pub mod api;
pub mod branch;
pub mod client;
pub mod error;

pub use api::{BranchApi, NetBoxApi};
pub use branch::{BRANCH_HEADER, BranchScope, NewBranch};
pub use client::{ClientConfig, NetBoxRestClient};
pub use error::ClientError;
