use netbox_core::{BranchApi, ClientError, NetBoxApi, NewBranch};
use serde_json::{Value, json};
use thiserror::Error;

use crate::object_types;

const SEARCH_ENDPOINT: &str = "search";
pub const DEFAULT_SEARCH_LIMIT: u64 = 10;

/// Caller-facing failure of a dispatched tool.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid object_type. Must be one of:\n{valid}")]
    InvalidObjectType { object_type: String, valid: String },

    #[error("Item at index {index} is missing required 'id' field")]
    MissingIdentifier { index: usize },

    /// Read paths hand the client failure back untouched.
    #[error(transparent)]
    Request(#[from] ClientError),

    /// Write paths re-describe the failure with operation context.
    #[error("{message}")]
    OperationFailed {
        message: String,
        #[source]
        source: ClientError,
    },
}

impl DispatchError {
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::InvalidObjectType { .. } => "invalid_object_type",
            DispatchError::MissingIdentifier { .. } => "missing_identifier",
            DispatchError::Request(_) => "request_failed",
            DispatchError::OperationFailed { .. } => "operation_failed",
        }
    }

    pub fn to_value(&self) -> Value {
        let mut payload = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        match self {
            DispatchError::InvalidObjectType { object_type, .. } => {
                payload["field"] = json!("object_type");
                payload["details"] = json!({ "received": object_type });
            }
            DispatchError::MissingIdentifier { index } => {
                payload["field"] = json!("data_list");
                payload["details"] = json!({ "index": index });
            }
            DispatchError::Request(err) => {
                if let Some(status) = err.status() {
                    payload["details"] = json!({
                        "status": status,
                        "body": err.structured_body(),
                    });
                }
            }
            DispatchError::OperationFailed { .. } => {}
        }
        payload
    }
}

/// Builds the error mapper used by every write tool: the client failure is
/// kept as the source and its detail appended to `context`.
fn rewrap(context: String) -> impl FnOnce(ClientError) -> DispatchError {
    move |source| {
        let message = format!("{context}: {}", source.detail());
        tracing::warn!(status = ?source.status(), "{message}");
        DispatchError::OperationFailed { message, source }
    }
}

fn resolve(object_type: &str) -> Result<&'static str, DispatchError> {
    object_types::endpoint_for(object_type).ok_or_else(|| DispatchError::InvalidObjectType {
        object_type: object_type.to_string(),
        valid: object_types::sorted_name_list(),
    })
}

/// Validated tool surface over a NetBox client.
pub struct Dispatcher<C> {
    client: C,
}

impl<C> Dispatcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: NetBoxApi> Dispatcher<C> {
    pub async fn list_objects(
        &self,
        object_type: &str,
        filters: &[(String, String)],
    ) -> Result<Value, DispatchError> {
        let endpoint = resolve(object_type)?;
        Ok(self.client.get(endpoint, None, filters).await?)
    }

    /// The id travels inside the endpoint string, not as the client's id.
    pub async fn get_by_id(&self, object_type: &str, id: u64) -> Result<Value, DispatchError> {
        let endpoint = format!("{}/{id}", resolve(object_type)?);
        Ok(self.client.get(&endpoint, None, &[]).await?)
    }

    pub async fn search(&self, query: &str, limit: u64) -> Result<Value, DispatchError> {
        let params = [
            ("q".to_string(), query.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        Ok(self.client.get(SEARCH_ENDPOINT, None, &params).await?)
    }

    pub async fn create_object(
        &self,
        object_type: &str,
        data: &Value,
    ) -> Result<Value, DispatchError> {
        let endpoint = resolve(object_type)?;
        self.client
            .create(endpoint, data)
            .await
            .map_err(rewrap(format!("Failed to create {object_type}")))
    }

    pub async fn update_object(
        &self,
        object_type: &str,
        id: u64,
        data: &Value,
    ) -> Result<Value, DispatchError> {
        let endpoint = resolve(object_type)?;
        self.client
            .update(endpoint, id, data)
            .await
            .map_err(rewrap(format!("Failed to update {object_type} with ID {id}")))
    }

    pub async fn delete_object(&self, object_type: &str, id: u64) -> Result<bool, DispatchError> {
        let endpoint = resolve(object_type)?;
        self.client
            .delete(endpoint, id)
            .await
            .map_err(rewrap(format!("Failed to delete {object_type} with ID {id}")))
    }

    pub async fn bulk_create_objects(
        &self,
        object_type: &str,
        records: &[Value],
    ) -> Result<Value, DispatchError> {
        let endpoint = resolve(object_type)?;
        self.client
            .bulk_create(endpoint, records)
            .await
            .map_err(rewrap(format!("Failed to bulk create {object_type} objects")))
    }

    pub async fn bulk_update_objects(
        &self,
        object_type: &str,
        records: &[Value],
    ) -> Result<Value, DispatchError> {
        let endpoint = resolve(object_type)?;
        if let Some(index) = records.iter().position(|record| record.get("id").is_none()) {
            return Err(DispatchError::MissingIdentifier { index });
        }
        self.client
            .bulk_update(endpoint, records)
            .await
            .map_err(rewrap(format!("Failed to bulk update {object_type} objects")))
    }

    pub async fn bulk_delete_objects(
        &self,
        object_type: &str,
        ids: &[u64],
    ) -> Result<bool, DispatchError> {
        let endpoint = resolve(object_type)?;
        self.client
            .bulk_delete(endpoint, ids)
            .await
            .map_err(rewrap(format!("Failed to bulk delete {object_type} objects")))
    }
}

impl<C: BranchApi> Dispatcher<C> {
    pub async fn list_branches(&self) -> Result<Value, DispatchError> {
        Ok(self.client.list_branches().await?)
    }

    pub async fn get_branch(&self, id: u64) -> Result<Value, DispatchError> {
        Ok(self.client.get_branch(id).await?)
    }

    pub async fn create_branch(&self, branch: &NewBranch) -> Result<Value, DispatchError> {
        self.client
            .create_branch(branch)
            .await
            .map_err(rewrap(format!("Failed to create branch {}", branch.name)))
    }

    pub async fn update_branch(&self, id: u64, data: &Value) -> Result<Value, DispatchError> {
        self.client
            .update_branch(id, data)
            .await
            .map_err(rewrap(format!("Failed to update branch with ID {id}")))
    }

    pub async fn delete_branch(&self, id: u64) -> Result<bool, DispatchError> {
        self.client
            .delete_branch(id)
            .await
            .map_err(rewrap(format!("Failed to delete branch with ID {id}")))
    }

    pub async fn merge_branch(
        &self,
        id: u64,
        target_branch: Option<&str>,
    ) -> Result<Value, DispatchError> {
        self.client
            .merge_branch(id, target_branch)
            .await
            .map_err(rewrap(format!("Failed to merge branch with ID {id}")))
    }

    /// Switches the branch later object requests are scoped to.
    pub fn set_active_branch(&self, branch: Option<&str>) -> Value {
        self.client.set_branch(branch);
        json!({ "active_branch": self.client.active_branch() })
    }
}
