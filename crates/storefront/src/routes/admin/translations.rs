//! Product name translations.

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
use wholesale_core::ProductId;

use super::categories::{LanguageOption, TranslationCell};
use super::{Feedback, NoticeQuery, done, non_blank, with_status};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::AuthenticatedUser;
use crate::routes::layout::PageContext;
use crate::routes::or_empty;
use crate::state::AppState;
use crate::supabase::ProductTranslationRow;

const PATH: &str = "/admin/products/translations";

/// Product translation form data.
#[derive(Debug, Deserialize)]
pub struct ProductTranslationForm {
    pub product_id: Option<String>,
    pub language_id: Option<String>,
    pub part_name: Option<String>,
}

/// Product row with its names in every language.
#[derive(Debug, Clone)]
pub struct ProductTranslationsView {
    pub id: ProductId,
    pub part_code: String,
    pub part_name: String,
    pub translations: Vec<TranslationCell>,
}

/// Product translations page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/translations.html")]
pub struct TranslationsTemplate {
    pub page: PageContext,
    pub feedback: Feedback,
    pub products: Vec<ProductTranslationsView>,
    pub languages: Vec<LanguageOption>,
}

async fn render(
    state: &AppState,
    admin: &AuthenticatedUser,
    page: PageContext,
    feedback: Feedback,
) -> TranslationsTemplate {
    let tables = state.supabase().tables(&admin.user.access_token);
    let (products, languages, translations) = tokio::join!(
        tables.products(),
        tables.languages(),
        tables.product_translations(None),
    );
    let languages = or_empty(languages, "languages");
    let translations = or_empty(translations, "product translations");

    let products = or_empty(products, "products")
        .into_iter()
        .map(|product| ProductTranslationsView {
            translations: languages
                .iter()
                .map(|language| TranslationCell {
                    language: language.code.clone(),
                    name: translations
                        .iter()
                        .find(|t| t.product_id == product.id && t.language_id == language.id)
                        .map(|t| t.part_name.clone()),
                })
                .collect(),
            id: product.id,
            part_code: product.part_code,
            part_name: product.part_name,
        })
        .collect();

    TranslationsTemplate {
        page,
        feedback,
        products,
        languages: languages
            .into_iter()
            .map(|language| LanguageOption {
                id: language.id,
                name: language.name,
            })
            .collect(),
    }
}

/// List products with their translated names.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Query(query): Query<NoticeQuery>,
) -> TranslationsTemplate {
    render(&state, &admin, page, Feedback::from_query(&query)).await
}

fn parse_translation(form: &ProductTranslationForm) -> Option<ProductTranslationRow> {
    Some(ProductTranslationRow {
        product_id: non_blank(form.product_id.as_deref())?.parse().ok()?,
        language_id: non_blank(form.language_id.as_deref())?.parse().ok()?,
        part_name: non_blank(form.part_name.as_deref())?.to_string(),
    })
}

/// Create or replace a product's name in one language.
#[instrument(skip(state, admin, page))]
pub async fn save(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Form(form): Form<ProductTranslationForm>,
) -> Response {
    let Some(row) = parse_translation(&form) else {
        let page = render(&state, &admin, page, Feedback::error("error-fields-required")).await;
        return with_status(StatusCode::BAD_REQUEST, page);
    };

    match state
        .supabase()
        .tables(&admin.user.access_token)
        .upsert_product_translation(&row)
        .await
    {
        Ok(()) => {
            tracing::info!(
                product_id = %row.product_id,
                language_id = %row.language_id,
                "Translation saved"
            );
            done(PATH, "saved")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update product translation");
            let page =
                render(&state, &admin, page, Feedback::error("error-update-translation")).await;
            with_status(StatusCode::INTERNAL_SERVER_ERROR, page)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wholesale_core::LanguageId;

    #[test]
    fn test_parse_translation() {
        let form = ProductTranslationForm {
            product_id: Some("12".to_string()),
            language_id: Some("3".to_string()),
            part_name: Some("Sėjamoji".to_string()),
        };
        let row = parse_translation(&form).unwrap();
        assert_eq!(row.product_id, ProductId::new(12));
        assert_eq!(row.language_id, LanguageId::new(3));
        assert_eq!(row.part_name, "Sėjamoji");

        let blank = ProductTranslationForm {
            part_name: Some(" ".to_string()),
            ..form
        };
        assert!(parse_translation(&blank).is_none());
    }
}
