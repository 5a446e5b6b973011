//! Product and price management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::Response,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use wholesale_core::{CategoryId, CustomerGroupId, Price, ProductId};

use super::{Feedback, NoticeQuery, done, non_blank, with_status};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::AuthenticatedUser;
use crate::routes::layout::PageContext;
use crate::routes::or_empty;
use crate::state::AppState;
use crate::supabase::{NewPrice, NewProduct};

const PATH: &str = "/admin/products";

// =============================================================================
// Form Types
// =============================================================================

/// Delete product form data.
#[derive(Debug, Deserialize)]
pub struct DeleteProductForm {
    pub product_id: Option<String>,
}

/// Group price form data.
#[derive(Debug, Deserialize)]
pub struct PriceForm {
    pub product_id: Option<String>,
    pub customer_group_id: Option<String>,
    pub price: Option<String>,
}

/// Fields of the multipart new-product form.
#[derive(Debug, Default)]
pub struct ProductUpload {
    pub part_name: Option<String>,
    pub part_code: Option<String>,
    pub group_name: Option<String>,
    pub category_id: Option<String>,
    pub image: Option<Vec<u8>>,
}

/// Read the multipart form. Empty file inputs count as no image.
async fn read_product_form(mut multipart: Multipart) -> Result<ProductUpload, MultipartError> {
    let mut upload = ProductUpload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let bytes = field.bytes().await?;
            if !bytes.is_empty() {
                upload.image = Some(bytes.to_vec());
            }
            continue;
        }

        let value = field.text().await?;
        match name.as_str() {
            "part_name" => upload.part_name = Some(value),
            "part_code" => upload.part_code = Some(value),
            "group_name" => upload.group_name = Some(value),
            "category_id" => upload.category_id = Some(value),
            _ => {}
        }
    }

    Ok(upload)
}

/// Image formats accepted for product photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageFormat {
    /// Detect the format from the file's leading bytes.
    ///
    /// The browser-supplied content type is not trusted.
    fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            _ => None,
        }
    }

    const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }

    const fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }
}

/// Parse a non-negative price with at most two decimal places.
fn parse_price(value: &str) -> Option<Decimal> {
    let price = value.trim().replace(',', ".").parse::<Decimal>().ok()?;
    (price >= Decimal::ZERO && price.scale() <= 2).then_some(price)
}

// =============================================================================
// View Types
// =============================================================================

/// A group price cell.
#[derive(Debug, Clone)]
pub struct GroupPriceView {
    pub group_name: String,
    pub price: String,
}

/// Product row for the admin table.
#[derive(Debug, Clone)]
pub struct ProductAdminView {
    pub id: ProductId,
    pub part_name: String,
    pub part_code: String,
    pub group_name: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub prices: Vec<GroupPriceView>,
}

/// Select option.
#[derive(Debug, Clone)]
pub struct OptionView {
    pub id: i64,
    pub name: String,
}

/// Product management page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsAdminTemplate {
    pub page: PageContext,
    pub feedback: Feedback,
    pub products: Vec<ProductAdminView>,
    pub categories: Vec<OptionView>,
    pub groups: Vec<OptionView>,
}

async fn render(
    state: &AppState,
    admin: &AuthenticatedUser,
    page: PageContext,
    feedback: Feedback,
) -> ProductsAdminTemplate {
    let tables = state.supabase().tables(&admin.user.access_token);
    let (products, categories, groups, prices) = tokio::join!(
        tables.products(),
        tables.categories(),
        tables.customer_groups(),
        tables.prices_with_groups(),
    );
    let categories = or_empty(categories, "categories");
    let groups = or_empty(groups, "customer groups");
    let prices = or_empty(prices, "prices");

    let products = or_empty(products, "products")
        .into_iter()
        .map(|product| ProductAdminView {
            category: product.category_id.and_then(|id| {
                categories
                    .iter()
                    .find(|c| c.id == id)
                    .map(|c| c.category_name.clone())
            }),
            image_url: product.image.clone().filter(|i| !i.trim().is_empty()),
            prices: prices
                .iter()
                .filter(|p| p.product_id == product.id)
                .map(|p| GroupPriceView {
                    group_name: p.customer_groups.as_ref().map_or_else(
                        || format!("Group {}", p.customer_group_id),
                        |g| g.group_name.clone(),
                    ),
                    price: Price::eur(p.price).display(),
                })
                .collect(),
            id: product.id,
            part_name: product.part_name,
            part_code: product.part_code,
            group_name: product.group_name,
        })
        .collect();

    ProductsAdminTemplate {
        page,
        feedback,
        products,
        categories: categories
            .into_iter()
            .map(|c| OptionView {
                id: c.id.as_i64(),
                name: c.category_name,
            })
            .collect(),
        groups: groups
            .into_iter()
            .map(|g| OptionView {
                id: g.id.as_i64(),
                name: g.group_name,
            })
            .collect(),
    }
}

/// Re-render the page with an error.
async fn fail(
    state: &AppState,
    admin: &AuthenticatedUser,
    page: PageContext,
    status: StatusCode,
    message: &'static str,
) -> Response {
    let page = render(state, admin, page, Feedback::error(message)).await;
    with_status(status, page)
}

// =============================================================================
// Handlers
// =============================================================================

/// List products with their group prices.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Query(query): Query<NoticeQuery>,
) -> ProductsAdminTemplate {
    render(&state, &admin, page, Feedback::from_query(&query)).await
}

/// Why a product image could not be stored.
enum ImageRejection {
    Format,
    Upload,
}

/// Upload a product image, returning its object path in the bucket.
async fn store_image(
    state: &AppState,
    admin: &AuthenticatedUser,
    bytes: Vec<u8>,
) -> Result<String, ImageRejection> {
    let format = ImageFormat::sniff(&bytes).ok_or(ImageRejection::Format)?;
    let object_path = format!("products/{}.{}", Uuid::new_v4(), format.extension());

    state
        .supabase()
        .upload_object(
            &admin.user.access_token,
            &state.config().catalog.image_bucket,
            &object_path,
            bytes,
            format.content_type(),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to upload product image");
            ImageRejection::Upload
        })?;

    Ok(object_path)
}

/// Remove an image whose product was never created.
async fn discard_image(state: &AppState, admin: &AuthenticatedUser, object_path: &str) {
    let bucket = &state.config().catalog.image_bucket;
    match state
        .supabase()
        .delete_object(&admin.user.access_token, bucket, object_path)
        .await
    {
        Ok(()) => tracing::info!(object_path, "Discarded image of unsaved product"),
        Err(e) => tracing::warn!(object_path, error = %e, "Failed to discard product image"),
    }
}

/// Create a product, uploading its image to storage first.
///
/// If the product row cannot be written the uploaded image is deleted again.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    multipart: Multipart,
) -> Response {
    let upload = match read_product_form(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            tracing::info!(error = %e, "Malformed product form");
            let message = "error-invalid-product-form";
            return fail(&state, &admin, page, StatusCode::BAD_REQUEST, message).await;
        }
    };

    let (Some(part_name), Some(part_code)) = (
        non_blank(upload.part_name.as_deref()),
        non_blank(upload.part_code.as_deref()),
    ) else {
        let message = "error-part-name-code-required";
        return fail(&state, &admin, page, StatusCode::BAD_REQUEST, message).await;
    };

    let category_id = match non_blank(upload.category_id.as_deref()) {
        None => None,
        Some(id) => match id.parse::<CategoryId>() {
            Ok(id) => Some(id),
            Err(_) => {
                let message = "error-invalid-category";
                return fail(&state, &admin, page, StatusCode::BAD_REQUEST, message).await;
            }
        },
    };

    let object_path = match upload.image {
        None => None,
        Some(bytes) => match store_image(&state, &admin, bytes).await {
            Ok(object_path) => Some(object_path),
            Err(ImageRejection::Format) => {
                let message = "error-image-format";
                return fail(&state, &admin, page, StatusCode::BAD_REQUEST, message).await;
            }
            Err(ImageRejection::Upload) => {
                let message = "error-image-upload";
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                return fail(&state, &admin, page, status, message).await;
            }
        },
    };

    let bucket = &state.config().catalog.image_bucket;
    let product = NewProduct {
        part_name: part_name.to_string(),
        part_code: part_code.to_string(),
        group_name: non_blank(upload.group_name.as_deref()).map(String::from),
        image: object_path
            .as_deref()
            .map(|object_path| state.supabase().public_url(bucket, object_path)),
        category_id,
    };

    match state
        .supabase()
        .tables(&admin.user.access_token)
        .insert_product(&product)
        .await
    {
        Ok(row) => {
            tracing::info!(product_id = %row.id, "Product added");
            done(PATH, "added")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to add product");
            if let Some(object_path) = &object_path {
                discard_image(&state, &admin, object_path).await;
            }
            let message = "error-add-product";
            fail(&state, &admin, page, StatusCode::INTERNAL_SERVER_ERROR, message).await
        }
    }
}

/// Delete a product.
#[instrument(skip(state, admin, page))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Form(form): Form<DeleteProductForm>,
) -> Response {
    let Some(id) =
        non_blank(form.product_id.as_deref()).and_then(|id| id.parse::<ProductId>().ok())
    else {
        let page = render(&state, &admin, page, Feedback::error("error-product-id-required")).await;
        return with_status(StatusCode::BAD_REQUEST, page);
    };

    match state
        .supabase()
        .tables(&admin.user.access_token)
        .delete_product(id)
        .await
    {
        Ok(()) => {
            tracing::info!(product_id = %id, "Product deleted");
            done(PATH, "deleted")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete product");
            let page =
                render(&state, &admin, page, Feedback::error("error-delete-product")).await;
            with_status(StatusCode::INTERNAL_SERVER_ERROR, page)
        }
    }
}

/// Parse a complete price form.
fn parse_price_form(form: &PriceForm) -> Result<NewPrice, &'static str> {
    let (Some(product_id), Some(group_id), Some(price)) = (
        non_blank(form.product_id.as_deref()),
        non_blank(form.customer_group_id.as_deref()),
        non_blank(form.price.as_deref()),
    ) else {
        return Err("error-fields-required");
    };

    Ok(NewPrice {
        product_id: product_id
            .parse::<ProductId>()
            .map_err(|_| "error-invalid-product")?,
        customer_group_id: group_id
            .parse::<CustomerGroupId>()
            .map_err(|_| "error-invalid-customer-group")?,
        price: parse_price(price).ok_or("error-invalid-price")?,
    })
}

/// Create or replace a product's price for one customer group.
#[instrument(skip(state, admin, page))]
pub async fn save_price(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Form(form): Form<PriceForm>,
) -> Response {
    let price = match parse_price_form(&form) {
        Ok(price) => price,
        Err(message) => {
            let page = render(&state, &admin, page, Feedback::error(message)).await;
            return with_status(StatusCode::BAD_REQUEST, page);
        }
    };

    match state
        .supabase()
        .tables(&admin.user.access_token)
        .upsert_price(&price)
        .await
    {
        Ok(()) => {
            tracing::info!(
                product_id = %price.product_id,
                customer_group = %price.customer_group_id,
                price = %price.price,
                "Price saved"
            );
            done(PATH, "saved")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update price");
            let page =
                render(&state, &admin, page, Feedback::error("error-update-price")).await;
            with_status(StatusCode::INTERNAL_SERVER_ERROR, page)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("12.50"), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_price(" 3,20 "), Some(Decimal::new(320, 2)));
        assert_eq!(parse_price("0"), Some(Decimal::ZERO));
        assert!(parse_price("-1").is_none());
        assert!(parse_price("1.005").is_none());
        assert!(parse_price("abc").is_none());
    }

    #[test]
    fn test_parse_price_form() {
        let form = PriceForm {
            product_id: Some("7".to_string()),
            customer_group_id: Some("2".to_string()),
            price: Some("80".to_string()),
        };
        let price = parse_price_form(&form).unwrap();
        assert_eq!(price.product_id, ProductId::new(7));
        assert_eq!(price.customer_group_id, CustomerGroupId::new(2));

        let missing = PriceForm {
            price: None,
            ..form
        };
        assert_eq!(
            parse_price_form(&missing).unwrap_err(),
            "error-fields-required"
        );
    }

    #[test]
    fn test_image_format_is_sniffed_from_bytes() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        assert_eq!(ImageFormat::sniff(&png), Some(ImageFormat::Png));
        assert_eq!(
            ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::sniff(b"RIFF\x10\0\0\0WEBPVP8 "),
            Some(ImageFormat::Webp)
        );
        assert_eq!(ImageFormat::sniff(b"GIF89a..."), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn test_non_images_are_refused() {
        let svg = b"<svg xmlns='http://www.w3.org/2000/svg'/>";
        assert!(ImageFormat::sniff(svg).is_none());
        assert!(ImageFormat::sniff(b"<html><script>").is_none());
        assert!(ImageFormat::sniff(b"RIFF\x10\0\0\0WAVEfmt ").is_none());
        assert!(ImageFormat::sniff(&[0x89, b'P']).is_none());
        assert!(ImageFormat::sniff(&[]).is_none());
    }
}
