// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Account, AccountDetails, Attachment, AttachmentStatus, CandidateQuery, Category, Company,
    DislikeAccount, Gender, LikeAccount, MatchAction, MatchResult, NewAccount, NewAttachment,
    NewCompany, NewTask, Page, ParseEnumError, Ranking, Role, Tag, Task,
};
pub use requests::{
    ChangeRoleRequest, CreateAccount, CreateTask, EditAccount, GetLikersQuery,
    GetMatchAccountsQuery, GetTasksQuery, MatchActionRequest, UploadFile,
};
pub use responses::{ErrorResponse, HealthResponse, MatchResultResponse, PageResponse, RoleResponse};
