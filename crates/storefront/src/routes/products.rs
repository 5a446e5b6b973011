//! Product catalog route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;
use wholesale_core::{CategoryId, ProductId};

use crate::filters;
use crate::middleware::RequireUser;
use crate::routes::layout::PageContext;
use crate::routes::or_empty;
use crate::services::localization::{localize_categories, localize_product_names, resolve_language};
use crate::services::pricing::PriceBook;
use crate::state::AppState;
use crate::supabase::ProductRow;

/// Pages past this are served as this page.
const MAX_PAGE: u32 = 10_000;

/// Query parameters for the catalog.
#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub page: Option<u32>,
    /// Category id; blank means all categories.
    pub category: Option<String>,
}

impl ProductsQuery {
    /// One-based page number, clamped to `1..=MAX_PAGE`.
    fn page(&self) -> u32 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    fn category(&self) -> Option<CategoryId> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .and_then(|value| value.parse().ok())
    }
}

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub part_code: String,
    pub name: String,
    pub group_name: Option<String>,
    pub image_url: Option<String>,
    /// Unit price for the viewer's customer group.
    pub price: Option<String>,
}

/// Category filter entry.
#[derive(Debug, Clone)]
pub struct CategoryView {
    pub id: CategoryId,
    pub name: String,
    pub selected: bool,
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "products.html")]
pub struct ProductsTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryView>,
    pub all_selected: bool,
    pub current_page: u32,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
    /// `&category=N` for pagination links, or empty.
    pub category_param: String,
    pub notice: Option<&'static str>,
}

/// Resolve a product's image to a URL.
///
/// The column holds either a full URL or a path inside the image bucket.
fn image_url(state: &AppState, product: &ProductRow) -> Option<String> {
    let image = product.image.as_deref().map(str::trim).filter(|i| !i.is_empty())?;
    if image.starts_with("https://") || image.starts_with("http://") {
        Some(image.to_string())
    } else {
        Some(
            state
                .supabase()
                .public_url(&state.config().catalog.image_bucket, image),
        )
    }
}

/// Display one page of the catalog.
#[instrument(skip(state, user, page), fields(user_id = %user.user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    page: PageContext,
    Query(query): Query<ProductsQuery>,
) -> impl IntoResponse {
    let tables = state.supabase().tables(&user.user.access_token);
    let page_size = state.config().catalog.page_size.max(1);
    let current_page = query.page();
    let offset = (current_page - 1).saturating_mul(page_size);
    let category = query.category();

    let languages = or_empty(tables.languages().await, "languages");
    let language_id = resolve_language(&languages, &page.language).map(|language| language.id);

    // One extra row tells whether a next page exists.
    let (products, categories, category_translations, product_translations, profile) = tokio::join!(
        tables.products_page(offset, page_size.saturating_add(1), category),
        tables.categories(),
        tables.category_translations(language_id),
        tables.product_translations(language_id),
        tables.profile(user.user.id),
    );

    let mut products = or_empty(products, "products");
    let has_next = products.len() > page_size as usize;
    products.truncate(page_size as usize);

    let group = match profile {
        Ok(profile) => profile.and_then(|p| p.customer_group),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load profile");
            None
        }
    };

    let book = match group {
        Some(group) if !products.is_empty() => {
            let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();
            let prices = or_empty(tables.prices_for_group(group, Some(&ids)).await, "prices");
            Some(PriceBook::for_group(group, &prices))
        }
        _ => None,
    };

    let names = localize_product_names(
        &products,
        &or_empty(product_translations, "product translations"),
        language_id,
    );

    let product_views = products
        .iter()
        .map(|product| ProductView {
            id: product.id,
            part_code: product.part_code.clone(),
            name: names
                .get(&product.id)
                .cloned()
                .unwrap_or_else(|| product.part_name.clone()),
            group_name: product.group_name.clone(),
            image_url: image_url(&state, product),
            price: book
                .as_ref()
                .and_then(|book| book.unit_price(product.id))
                .map(|price| price.display()),
        })
        .collect();

    let categories = localize_categories(
        &or_empty(categories, "categories"),
        &or_empty(category_translations, "category translations"),
        language_id,
    )
    .into_iter()
    .map(|c| CategoryView {
        selected: Some(c.id) == category,
        id: c.id,
        name: c.name,
    })
    .collect();

    ProductsTemplate {
        page,
        products: product_views,
        categories,
        all_selected: category.is_none(),
        current_page,
        prev_page: (current_page > 1).then(|| current_page - 1),
        next_page: has_next.then(|| current_page + 1),
        category_param: category.map(|c| format!("&category={c}")).unwrap_or_default(),
        notice: group.is_none().then_some("products-no-group"),
    }
}
