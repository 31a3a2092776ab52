use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterSchema {
    pub username: String,
    pub email: String,
    pub password: String,
}

// Either an email or a username goes in `identifier`
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginSchema {
    #[serde(alias = "email", alias = "username")]
    pub identifier: String,
    pub password: String,
}

// Struct representing the request body for creating a new Task
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskSchema {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
}

// Struct representing the request body for updating a Task; absent fields stay as they are
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskSchema {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusSchema {
    pub completed: bool,
}

/// Optional query-string filters for `GET /api/tasks`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilterParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub due_date: Option<String>,
}
