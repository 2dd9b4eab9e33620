use std::future::Future;

use serde_json::Value;

use crate::branch::NewBranch;
use crate::error::ClientError;

/// CRUD and bulk surface of NetBox.
///
/// `endpoint` is an API path such as `dcim/sites`; leading and trailing
/// slashes are ignored. List reads return the first page only.
pub trait NetBoxApi: Send + Sync {
    /// Single record when `id` is given, otherwise the list (with any
    /// pagination envelope unwrapped to its `results`).
    fn get(
        &self,
        endpoint: &str,
        id: Option<u64>,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;

    fn create(
        &self,
        endpoint: &str,
        data: &Value,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;

    /// Partial update: only fields present in `data` change.
    fn update(
        &self,
        endpoint: &str,
        id: u64,
        data: &Value,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;

    /// `true` only when NetBox answers 204 No Content.
    fn delete(
        &self,
        endpoint: &str,
        id: u64,
    ) -> impl Future<Output = Result<bool, ClientError>> + Send;

    fn bulk_create(
        &self,
        endpoint: &str,
        records: &[Value],
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;

    fn bulk_update(
        &self,
        endpoint: &str,
        records: &[Value],
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;

    fn bulk_delete(
        &self,
        endpoint: &str,
        ids: &[u64],
    ) -> impl Future<Output = Result<bool, ClientError>> + Send;
}

/// Branch lifecycle plus the session's active branch.
///
/// Every lifecycle call is issued against the main schema; the active branch
/// is left exactly as it was, whether the call succeeds or fails.
pub trait BranchApi: Send + Sync {
    fn active_branch(&self) -> Option<String>;

    /// `None` or an empty id clears the active branch.
    fn set_branch(&self, branch: Option<&str>);

    fn clear_branch(&self) {
        self.set_branch(None);
    }

    fn list_branches(&self) -> impl Future<Output = Result<Value, ClientError>> + Send;

    fn get_branch(&self, id: u64) -> impl Future<Output = Result<Value, ClientError>> + Send;

    fn create_branch(
        &self,
        branch: &NewBranch,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;

    fn update_branch(
        &self,
        id: u64,
        data: &Value,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;

    fn delete_branch(&self, id: u64) -> impl Future<Output = Result<bool, ClientError>> + Send;

    /// Merges into main, or into `target_branch` when one is given.
    fn merge_branch(
        &self,
        id: u64,
        target_branch: Option<&str>,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;
}
