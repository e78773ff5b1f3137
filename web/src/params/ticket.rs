use serde::Deserialize;
use service::store::TicketStatus;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateParams {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateParams {
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentParams {
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusParams {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignParams {
    pub assignee_id: String,
}
