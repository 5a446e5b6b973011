//! Customer group management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;

use super::{Feedback, NoticeQuery, done, non_blank, with_status};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::AuthenticatedUser;
use crate::routes::layout::PageContext;
use crate::routes::or_empty;
use crate::state::AppState;
use crate::supabase::CustomerGroupRow;

const PATH: &str = "/admin/customer_groups";

/// Add customer group form data.
#[derive(Debug, Deserialize)]
pub struct CustomerGroupForm {
    pub group_name: Option<String>,
}

/// Customer groups page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/customer_groups.html")]
pub struct CustomerGroupsTemplate {
    pub page: PageContext,
    pub feedback: Feedback,
    pub groups: Vec<CustomerGroupRow>,
}

async fn render(
    state: &AppState,
    admin: &AuthenticatedUser,
    page: PageContext,
    feedback: Feedback,
) -> CustomerGroupsTemplate {
    let groups = state
        .supabase()
        .tables(&admin.user.access_token)
        .customer_groups()
        .await;

    CustomerGroupsTemplate {
        page,
        feedback,
        groups: or_empty(groups, "customer groups"),
    }
}

/// List customer groups.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Query(query): Query<NoticeQuery>,
) -> CustomerGroupsTemplate {
    render(&state, &admin, page, Feedback::from_query(&query)).await
}

/// Add a customer group.
#[instrument(skip(state, admin, page))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Form(form): Form<CustomerGroupForm>,
) -> Response {
    let Some(name) = non_blank(form.group_name.as_deref()) else {
        let page = render(&state, &admin, page, Feedback::error("error-group-name-required")).await;
        return with_status(StatusCode::BAD_REQUEST, page);
    };

    match state
        .supabase()
        .tables(&admin.user.access_token)
        .insert_customer_group(name)
        .await
    {
        Ok(group) => {
            tracing::info!(customer_group = %group.id, "Customer group added");
            done(PATH, "added")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to add customer group");
            let page =
                render(&state, &admin, page, Feedback::error("error-add-customer-group")).await;
            with_status(StatusCode::INTERNAL_SERVER_ERROR, page)
        }
    }
}
