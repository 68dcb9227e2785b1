use serde::{Deserialize, Serialize};
use validator::Validate;

/// Raw file content handed to the coordinator by the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub original_name: String,
    pub content: Vec<u8>,
}

impl UploadFile {
    pub fn new(original_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            content,
        }
    }
}

/// Command to register a new account
#[derive(Debug, Clone, Default, Validate)]
pub struct CreateAccount {
    #[validate(range(min = 1))]
    pub telegram_id: i64,
    #[validate(length(min = 1, max = 64))]
    pub first_name: String,
    #[validate(length(max = 64))]
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub last_name: String,
    #[validate(length(max = 64))]
    pub nickname: Option<String>,
    pub role: String,
    #[validate(length(max = 2048))]
    pub about_me: Option<String>,
    pub gender: String,
    pub country: Option<String>,
    pub location: Option<String>,
    #[validate(length(max = 128))]
    pub company_name: Option<String>,
    #[validate(length(max = 2048))]
    pub company_description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category_ids: Option<Vec<i64>>,
    pub avatar: Option<UploadFile>,
    pub document: Option<UploadFile>,
}

impl CreateAccount {
    /// A company is only created when both its name and description are supplied
    pub fn has_company(&self) -> bool {
        self.company_name.is_some() && self.company_description.is_some()
    }
}

/// Command to edit an existing account. Absent lists leave links untouched.
#[derive(Debug, Clone, Default, Validate)]
pub struct EditAccount {
    pub id: i64,
    #[validate(length(min = 1, max = 64))]
    pub first_name: String,
    #[validate(length(max = 64))]
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub last_name: String,
    #[validate(length(max = 64))]
    pub nickname: Option<String>,
    pub role: String,
    #[validate(length(max = 2048))]
    pub about_me: Option<String>,
    pub gender: String,
    pub country: Option<String>,
    pub location: Option<String>,
    #[validate(length(max = 128))]
    pub company_name: Option<String>,
    #[validate(length(max = 2048))]
    pub company_description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category_ids: Option<Vec<i64>>,
    pub avatar: Option<UploadFile>,
    pub document: Option<UploadFile>,
}

impl EditAccount {
    pub fn has_company(&self) -> bool {
        self.company_name.is_some()
    }
}

/// Query for the candidate feed
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GetMatchAccountsQuery {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

/// Query for the likers page
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GetLikersQuery {
    #[serde(default)]
    #[validate(range(min = 0))]
    pub offset: i64,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

/// Body of a like/dislike request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchActionRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "target_id", rename = "targetId")]
    pub target_id: i64,
}

/// Body of a task creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateTask {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(min = 1, max = 4096))]
    pub description: String,
}

/// Query for one owner's tasks
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GetTasksQuery {
    #[validate(range(min = 1))]
    pub account_id: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub offset: i64,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangeRoleRequest {
    #[validate(length(min = 1))]
    pub role: String,
}
