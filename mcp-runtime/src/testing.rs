use std::sync::Mutex;

use netbox_core::{BranchApi, ClientError, NetBoxApi, NewBranch};
use serde_json::{Value, json};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Call {
    pub op: &'static str,
    pub endpoint: String,
    pub id: Option<u64>,
    pub params: Vec<(String, String)>,
    pub body: Value,
}

enum Reply {
    Value(Value),
    Failure { status: u16, body: String },
}

/// In-memory client that records every call and answers each one the same way.
pub(crate) struct StubClient {
    calls: Mutex<Vec<Call>>,
    branch: Mutex<Option<String>>,
    reply: Reply,
}

impl StubClient {
    pub(crate) fn replying(value: Value) -> Self {
        Self::with_reply(Reply::Value(value))
    }

    pub(crate) fn failing(status: u16, body: &str) -> Self {
        Self::with_reply(Reply::Failure {
            status,
            body: body.to_string(),
        })
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            branch: Mutex::new(None),
            reply,
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(
        &self,
        op: &'static str,
        endpoint: &str,
        id: Option<u64>,
        params: &[(String, String)],
        body: Value,
    ) -> Result<Value, ClientError> {
        self.calls.lock().unwrap().push(Call {
            op,
            endpoint: endpoint.to_string(),
            id,
            params: params.to_vec(),
            body,
        });
        match &self.reply {
            Reply::Value(value) => Ok(value.clone()),
            Reply::Failure { status, body } => Err(ClientError::RequestFailure {
                status: *status,
                method: op.to_uppercase(),
                url: format!("http://netbox.test/api/{endpoint}/"),
                body: body.clone(),
            }),
        }
    }

    fn answer_bool(
        &self,
        op: &'static str,
        endpoint: &str,
        id: Option<u64>,
        body: Value,
    ) -> Result<bool, ClientError> {
        self.answer(op, endpoint, id, &[], body)
            .map(|value| value.as_bool().unwrap_or(true))
    }
}

impl NetBoxApi for StubClient {
    async fn get(
        &self,
        endpoint: &str,
        id: Option<u64>,
        params: &[(String, String)],
    ) -> Result<Value, ClientError> {
        self.answer("get", endpoint, id, params, Value::Null)
    }

    async fn create(&self, endpoint: &str, data: &Value) -> Result<Value, ClientError> {
        self.answer("create", endpoint, None, &[], data.clone())
    }

    async fn update(&self, endpoint: &str, id: u64, data: &Value) -> Result<Value, ClientError> {
        self.answer("update", endpoint, Some(id), &[], data.clone())
    }

    async fn delete(&self, endpoint: &str, id: u64) -> Result<bool, ClientError> {
        self.answer_bool("delete", endpoint, Some(id), Value::Null)
    }

    async fn bulk_create(&self, endpoint: &str, records: &[Value]) -> Result<Value, ClientError> {
        self.answer("bulk_create", endpoint, None, &[], Value::Array(records.to_vec()))
    }

    async fn bulk_update(&self, endpoint: &str, records: &[Value]) -> Result<Value, ClientError> {
        self.answer("bulk_update", endpoint, None, &[], Value::Array(records.to_vec()))
    }

    async fn bulk_delete(&self, endpoint: &str, ids: &[u64]) -> Result<bool, ClientError> {
        self.answer_bool("bulk_delete", endpoint, None, json!(ids))
    }
}

impl BranchApi for StubClient {
    fn active_branch(&self) -> Option<String> {
        self.branch.lock().unwrap().clone()
    }

    fn set_branch(&self, branch: Option<&str>) {
        *self.branch.lock().unwrap() = branch.filter(|b| !b.is_empty()).map(str::to_string);
    }

    async fn list_branches(&self) -> Result<Value, ClientError> {
        self.answer("list_branches", "extras/branches", None, &[], Value::Null)
    }

    async fn get_branch(&self, id: u64) -> Result<Value, ClientError> {
        self.answer("get_branch", "extras/branches", Some(id), &[], Value::Null)
    }

    async fn create_branch(&self, branch: &NewBranch) -> Result<Value, ClientError> {
        let body = serde_json::to_value(branch).unwrap();
        self.answer("create_branch", "extras/branches", None, &[], body)
    }

    async fn update_branch(&self, id: u64, data: &Value) -> Result<Value, ClientError> {
        self.answer("update_branch", "extras/branches", Some(id), &[], data.clone())
    }

    async fn delete_branch(&self, id: u64) -> Result<bool, ClientError> {
        self.answer_bool("delete_branch", "extras/branches", Some(id), Value::Null)
    }

    async fn merge_branch(
        &self,
        id: u64,
        target_branch: Option<&str>,
    ) -> Result<Value, ClientError> {
        let body = json!({ "target_branch": target_branch });
        self.answer("merge_branch", "extras/branches", Some(id), &[], body)
    }
}
