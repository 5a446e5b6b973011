//! Category management.

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
use wholesale_core::{CategoryId, LanguageId};

use super::{Feedback, NoticeQuery, done, non_blank, with_status};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::AuthenticatedUser;
use crate::routes::layout::PageContext;
use crate::routes::or_empty;
use crate::state::AppState;
use crate::supabase::CategoryTranslationRow;

const PATH: &str = "/admin/categories";

/// Add category form data.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub category_name: Option<String>,
}

/// Delete category form data.
#[derive(Debug, Deserialize)]
pub struct DeleteCategoryForm {
    pub category_id: Option<String>,
}

/// Category translation form data.
#[derive(Debug, Deserialize)]
pub struct CategoryTranslationForm {
    pub category_id: Option<String>,
    pub language_id: Option<String>,
    pub category_name: Option<String>,
}

/// A translation cell in the category table.
#[derive(Debug, Clone)]
pub struct TranslationCell {
    pub language: String,
    pub name: Option<String>,
}

/// Category row for the admin table.
#[derive(Debug, Clone)]
pub struct CategoryAdminView {
    pub id: CategoryId,
    pub name: String,
    pub translations: Vec<TranslationCell>,
}

/// Language choice for translation forms.
#[derive(Debug, Clone)]
pub struct LanguageOption {
    pub id: LanguageId,
    pub name: String,
}

/// Category management page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/categories.html")]
pub struct CategoriesTemplate {
    pub page: PageContext,
    pub feedback: Feedback,
    pub categories: Vec<CategoryAdminView>,
    pub languages: Vec<LanguageOption>,
}

async fn render(
    state: &AppState,
    admin: &AuthenticatedUser,
    page: PageContext,
    feedback: Feedback,
) -> CategoriesTemplate {
    let tables = state.supabase().tables(&admin.user.access_token);
    let (categories, languages, translations) = tokio::join!(
        tables.categories(),
        tables.languages(),
        tables.category_translations(None),
    );
    let languages = or_empty(languages, "languages");
    let translations = or_empty(translations, "category translations");

    let categories = or_empty(categories, "categories")
        .into_iter()
        .map(|category| CategoryAdminView {
            translations: languages
                .iter()
                .map(|language| TranslationCell {
                    language: language.code.clone(),
                    name: translations
                        .iter()
                        .find(|t| t.category_id == category.id && t.language_id == language.id)
                        .map(|t| t.category_name.clone()),
                })
                .collect(),
            id: category.id,
            name: category.category_name,
        })
        .collect();

    CategoriesTemplate {
        page,
        feedback,
        categories,
        languages: languages
            .into_iter()
            .map(|language| LanguageOption {
                id: language.id,
                name: language.name,
            })
            .collect(),
    }
}

/// List categories with their translations.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Query(query): Query<NoticeQuery>,
) -> CategoriesTemplate {
    render(&state, &admin, page, Feedback::from_query(&query)).await
}

/// Add a category.
#[instrument(skip(state, admin, page))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Form(form): Form<CategoryForm>,
) -> Response {
    let Some(name) = non_blank(form.category_name.as_deref()) else {
        let feedback = Feedback::error("error-category-name-required");
        let page = render(&state, &admin, page, feedback).await;
        return with_status(StatusCode::BAD_REQUEST, page);
    };

    match state
        .supabase()
        .tables(&admin.user.access_token)
        .insert_category(name)
        .await
    {
        Ok(category) => {
            tracing::info!(category_id = %category.id, "Category added");
            done(PATH, "added")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to add category");
            let page = render(&state, &admin, page, Feedback::error("error-add-category")).await;
            with_status(StatusCode::INTERNAL_SERVER_ERROR, page)
        }
    }
}

/// Delete a category.
#[instrument(skip(state, admin, page))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Form(form): Form<DeleteCategoryForm>,
) -> Response {
    let Some(id) =
        non_blank(form.category_id.as_deref()).and_then(|id| id.parse::<CategoryId>().ok())
    else {
        let feedback = Feedback::error("error-category-id-required");
        let page = render(&state, &admin, page, feedback).await;
        return with_status(StatusCode::BAD_REQUEST, page);
    };

    match state
        .supabase()
        .tables(&admin.user.access_token)
        .delete_category(id)
        .await
    {
        Ok(()) => {
            tracing::info!(category_id = %id, "Category deleted");
            done(PATH, "deleted")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete category");
            let page =
                render(&state, &admin, page, Feedback::error("error-delete-category")).await;
            with_status(StatusCode::INTERNAL_SERVER_ERROR, page)
        }
    }
}

/// Parse a complete category translation form.
fn parse_translation(form: &CategoryTranslationForm) -> Option<CategoryTranslationRow> {
    Some(CategoryTranslationRow {
        category_id: non_blank(form.category_id.as_deref())?.parse().ok()?,
        language_id: non_blank(form.language_id.as_deref())?.parse().ok()?,
        category_name: non_blank(form.category_name.as_deref())?.to_string(),
    })
}

/// Create or replace a category's name in one language.
#[instrument(skip(state, admin, page))]
pub async fn save_translation(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Form(form): Form<CategoryTranslationForm>,
) -> Response {
    let Some(row) = parse_translation(&form) else {
        let page = render(&state, &admin, page, Feedback::error("error-fields-required")).await;
        return with_status(StatusCode::BAD_REQUEST, page);
    };

    match state
        .supabase()
        .tables(&admin.user.access_token)
        .upsert_category_translation(&row)
        .await
    {
        Ok(()) => done(PATH, "saved"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update category translation");
            let page =
                render(&state, &admin, page, Feedback::error("error-update-translation")).await;
            with_status(StatusCode::INTERNAL_SERVER_ERROR, page)
        }
    }
}
