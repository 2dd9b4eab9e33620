use serde::Serialize;

/// Endpoint that administers branches themselves.
pub const BRANCHES_ENDPOINT: &str = "extras/branches";

/// Header NetBox reads to scope a request to a branch schema.
pub const BRANCH_HEADER: &str = "X-NetBox-Branch";

/// Which branch a single outgoing request is scoped to.
///
/// Resolved when the request is built, so the session's active branch is
/// never mutated on behalf of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchScope {
    /// Whatever branch the session currently has active (possibly none).
    Session,
    /// Main schema, no branch header. Branch administration always uses this.
    Main,
}

/// Payload for creating a branch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewBranch {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
}

impl NewBranch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            base_branch: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Empty schema ids are treated as "no base branch".
    pub fn with_base_branch(mut self, base_branch: Option<String>) -> Self {
        self.base_branch = base_branch.filter(|b| !b.is_empty());
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MergeRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<&'a str>,
}

impl<'a> MergeRequest<'a> {
    pub(crate) fn new(target_branch: Option<&'a str>) -> Self {
        Self {
            target_branch: target_branch.filter(|t| !t.is_empty()),
        }
    }
}
