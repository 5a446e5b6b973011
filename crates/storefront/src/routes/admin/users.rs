//! User invitations and customer group assignment.

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
use wholesale_core::{CustomerGroupId, Email, UserId, UserRole};

use super::{Feedback, NoticeQuery, done, non_blank, with_status};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::AuthenticatedUser;
use crate::routes::layout::PageContext;
use crate::routes::or_empty;
use crate::state::AppState;
use crate::supabase::{CustomerGroupRow, SupabaseError};

const PATH: &str = "/admin/users";

/// Invite form data.
#[derive(Debug, Deserialize)]
pub struct InviteForm {
    pub email: Option<String>,
}

/// Group assignment form data.
#[derive(Debug, Deserialize)]
pub struct AssignGroupForm {
    pub user_id: Option<String>,
    /// Blank clears the group.
    pub customer_group_id: Option<String>,
}

/// A customer group choice in a user's row.
#[derive(Debug, Clone)]
pub struct GroupOption {
    pub id: CustomerGroupId,
    pub name: String,
    pub selected: bool,
}

/// User row for the admin table.
#[derive(Debug, Clone)]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    /// Blank when unknown.
    pub name: String,
    /// Blank when unknown.
    pub company: String,
    /// Message id of the role label.
    pub role: &'static str,
    pub has_group: bool,
    pub groups: Vec<GroupOption>,
}

/// Users page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub page: PageContext,
    pub feedback: Feedback,
    pub users: Vec<UserView>,
}

/// Message id for a backend role. Unknown roles read as customers.
fn role_message(role: Option<&str>) -> &'static str {
    match UserRole::from_backend(role.map(str::trim)) {
        UserRole::Admin => "role-admin",
        UserRole::Customer => "role-customer",
    }
}

fn group_options(
    groups: &[CustomerGroupRow],
    current: Option<CustomerGroupId>,
) -> Vec<GroupOption> {
    groups
        .iter()
        .map(|group| GroupOption {
            id: group.id,
            name: group.group_name.clone(),
            selected: Some(group.id) == current,
        })
        .collect()
}

async fn render(
    state: &AppState,
    admin: &AuthenticatedUser,
    page: PageContext,
    feedback: Feedback,
) -> UsersTemplate {
    let tables = state.supabase().tables(&admin.user.access_token);
    let (profiles, groups) = tokio::join!(tables.profiles(), tables.customer_groups());

    let groups = or_empty(groups, "customer groups");

    let users = or_empty(profiles, "profiles")
        .into_iter()
        .map(|profile| UserView {
            name: profile.full_name().unwrap_or_default(),
            has_group: profile.customer_group.is_some(),
            groups: group_options(&groups, profile.customer_group),
            id: profile.id,
            email: profile.email.unwrap_or_default(),
            company: profile.company.unwrap_or_default(),
            role: role_message(profile.role.as_deref()),
        })
        .collect();

    UsersTemplate {
        page,
        feedback,
        users,
    }
}

/// List users with their customer groups.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Query(query): Query<NoticeQuery>,
) -> UsersTemplate {
    render(&state, &admin, page, Feedback::from_query(&query)).await
}

/// Email an invitation that lands on the set-password page.
#[instrument(skip(state, admin, page))]
pub async fn invite(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Form(form): Form<InviteForm>,
) -> Response {
    let Some(email) = non_blank(form.email.as_deref()).and_then(|e| Email::parse(e).ok()) else {
        let page = render(&state, &admin, page, Feedback::error("error-email-required")).await;
        return with_status(StatusCode::BAD_REQUEST, page);
    };

    let redirect_to = format!(
        "{}/auth/set-password",
        state.config().base_url.trim_end_matches('/')
    );

    match state
        .supabase()
        .invite_user_by_email(&email, &redirect_to)
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User invited");
            done(PATH, "invited")
        }
        Err(SupabaseError::Api { status, message }) if (400..500).contains(&status) => {
            tracing::info!(status, message = %message, "Invitation rejected");
            let feedback = Feedback::rejected("error-invite-rejected", message);
            let page = render(&state, &admin, page, feedback).await;
            with_status(StatusCode::BAD_REQUEST, page)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to invite user");
            let page = render(&state, &admin, page, Feedback::error("error-invite-user")).await;
            with_status(StatusCode::INTERNAL_SERVER_ERROR, page)
        }
    }
}

/// Parse an assignment form: the user and the (possibly cleared) group.
fn parse_assignment(form: &AssignGroupForm) -> Option<(UserId, Option<CustomerGroupId>)> {
    let user = non_blank(form.user_id.as_deref())?.parse().ok()?;
    let group = match non_blank(form.customer_group_id.as_deref()) {
        None => None,
        Some(group) => Some(group.parse().ok()?),
    };
    Some((user, group))
}

/// Assign a user to a customer group, or clear the assignment.
#[instrument(skip(state, admin, page))]
pub async fn assign_group(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Form(form): Form<AssignGroupForm>,
) -> Response {
    let Some((user, group)) = parse_assignment(&form) else {
        let page = render(&state, &admin, page, Feedback::error("error-user-id-required")).await;
        return with_status(StatusCode::BAD_REQUEST, page);
    };

    match state
        .supabase()
        .tables(&admin.user.access_token)
        .set_customer_group(user, group)
        .await
    {
        Ok(()) => {
            tracing::info!(user_id = %user, customer_group = ?group, "Customer group assigned");
            done(PATH, "saved")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to assign customer group");
            let page =
                render(&state, &admin, page, Feedback::error("error-update-user")).await;
            with_status(StatusCode::INTERNAL_SERVER_ERROR, page)
        }
    }
}
