//! Typed table access for one access token.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use wholesale_core::{
    CategoryId, CustomerGroupId, Email, LanguageId, ProductId, UserId, UserRole,
};

use super::{
    CategoryRow, CategoryTranslationRow, CustomerGroupRow, LanguageRow, NewPrice, NewProduct,
    PriceRow, PriceWithGroupRow, ProductRow, ProductTranslationRow, ProfileRow, Query,
    SupabaseClient, SupabaseError, check_status, read_json,
};

/// Columns embedded when listing prices for the back-office.
const PRICE_WITH_GROUP_COLUMNS: &str =
    "id,product_id,customer_group_id,price,customer_groups(group_name)";

/// Columns shown on the users page.
const PROFILE_COLUMNS: &str = "id,email,first_name,last_name,company,customer_group,role";

/// Table access scoped to one bearer token.
///
/// Every request carries the token, so the backend's row-level security
/// decides what the caller may read and write.
#[derive(Clone, Copy)]
pub struct Tables<'a> {
    client: &'a SupabaseClient,
    token: &'a str,
}

impl<'a> Tables<'a> {
    pub(super) const fn new(client: &'a SupabaseClient, token: &'a str) -> Self {
        Self { client, token }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// One catalog page, optionally limited to a category.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn products_page(
        &self,
        offset: u32,
        limit: u32,
        category: Option<CategoryId>,
    ) -> Result<Vec<ProductRow>, SupabaseError> {
        let mut query = Query::new().select("*");
        if let Some(category) = category {
            query = query.eq("category_id", category);
        }
        self.select("products", query.order("id", true).page(offset, limit))
            .await
    }

    /// Every product, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn products(&self) -> Result<Vec<ProductRow>, SupabaseError> {
        self.select("products", Query::new().select("*").order("id", true))
            .await
    }

    /// Products with the given ids. Unknown ids are simply absent.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductRow>, SupabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            "products",
            Query::new().select("*").is_in("id", ids.iter()),
        )
        .await
    }

    /// Insert a product and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or nothing was returned.
    pub async fn insert_product(&self, product: &NewProduct) -> Result<ProductRow, SupabaseError> {
        single(self.insert("products", Query::new(), product).await?)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), SupabaseError> {
        self.delete("products", Query::new().eq("id", id)).await
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Every category, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn categories(&self) -> Result<Vec<CategoryRow>, SupabaseError> {
        self.select("categories", Query::new().select("*").order("id", true))
            .await
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or nothing was returned.
    pub async fn insert_category(&self, name: &str) -> Result<CategoryRow, SupabaseError> {
        let body = serde_json::json!({ "category_name": name });
        single(self.insert("categories", Query::new(), &body).await?)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), SupabaseError> {
        self.delete("categories", Query::new().eq("id", id)).await
    }

    /// Category translations, for one language or all of them.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn category_translations(
        &self,
        language: Option<LanguageId>,
    ) -> Result<Vec<CategoryTranslationRow>, SupabaseError> {
        let mut query = Query::new().select("category_id,language_id,category_name");
        if let Some(language) = language {
            query = query.eq("language_id", language);
        }
        self.select("category_translations", query).await
    }

    /// Create or replace a category translation.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn upsert_category_translation(
        &self,
        row: &CategoryTranslationRow,
    ) -> Result<(), SupabaseError> {
        self.upsert::<_, CategoryTranslationRow>(
            "category_translations",
            "category_id,language_id",
            row,
        )
        .await
        .map(|_| ())
    }

    // =========================================================================
    // Languages and product translations
    // =========================================================================

    /// Every language, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn languages(&self) -> Result<Vec<LanguageRow>, SupabaseError> {
        self.select(
            "languages",
            Query::new().select("id,name,code").order("id", true),
        )
        .await
    }

    /// Product translations, for one language or all of them.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn product_translations(
        &self,
        language: Option<LanguageId>,
    ) -> Result<Vec<ProductTranslationRow>, SupabaseError> {
        let mut query = Query::new().select("product_id,language_id,part_name");
        if let Some(language) = language {
            query = query.eq("language_id", language);
        }
        self.select("product_translations", query).await
    }

    /// Create or replace a product translation.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn upsert_product_translation(
        &self,
        row: &ProductTranslationRow,
    ) -> Result<(), SupabaseError> {
        self.upsert::<_, ProductTranslationRow>(
            "product_translations",
            "product_id,language_id",
            row,
        )
        .await
        .map(|_| ())
    }

    // =========================================================================
    // Prices
    // =========================================================================

    /// Every price with its customer group name.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn prices_with_groups(&self) -> Result<Vec<PriceWithGroupRow>, SupabaseError> {
        self.select(
            "prices",
            Query::new()
                .select(PRICE_WITH_GROUP_COLUMNS)
                .order("product_id", true),
        )
        .await
    }

    /// Prices for one customer group, optionally limited to some products.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn prices_for_group(
        &self,
        group: CustomerGroupId,
        products: Option<&[ProductId]>,
    ) -> Result<Vec<PriceRow>, SupabaseError> {
        let mut query = Query::new()
            .select("id,product_id,customer_group_id,price")
            .eq("customer_group_id", group);
        if let Some(products) = products {
            if products.is_empty() {
                return Ok(Vec::new());
            }
            query = query.is_in("product_id", products.iter());
        }
        self.select("prices", query).await
    }

    /// Create or replace the price of a product for a customer group.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn upsert_price(&self, price: &NewPrice) -> Result<(), SupabaseError> {
        self.upsert::<_, PriceRow>("prices", "product_id,customer_group_id", price)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Customer groups
    // =========================================================================

    /// Every customer group, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn customer_groups(&self) -> Result<Vec<CustomerGroupRow>, SupabaseError> {
        self.select(
            "customer_groups",
            Query::new().select("*").order("id", true),
        )
        .await
    }

    /// Create a customer group.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or nothing was returned.
    pub async fn insert_customer_group(
        &self,
        name: &str,
    ) -> Result<CustomerGroupRow, SupabaseError> {
        let body = serde_json::json!({ "group_name": name });
        single(self.insert("customer_groups", Query::new(), &body).await?)
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Every profile visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn profiles(&self) -> Result<Vec<ProfileRow>, SupabaseError> {
        self.select(
            "profiles",
            Query::new().select(PROFILE_COLUMNS).order("email", true),
        )
        .await
    }

    /// The profile of one user, if visible.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn profile(&self, id: UserId) -> Result<Option<ProfileRow>, SupabaseError> {
        let rows: Vec<ProfileRow> = self
            .select(
                "profiles",
                Query::new().select(PROFILE_COLUMNS).eq("id", id).limit(1),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// The profile registered under an email address, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn profile_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<ProfileRow>, SupabaseError> {
        let rows: Vec<ProfileRow> = self
            .select(
                "profiles",
                Query::new()
                    .select(PROFILE_COLUMNS)
                    .eq("email", email)
                    .limit(1),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Assign (or clear) a user's customer group.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn set_customer_group(
        &self,
        user: UserId,
        group: Option<CustomerGroupId>,
    ) -> Result<(), SupabaseError> {
        let body = serde_json::json!({ "customer_group": group });
        self.update("profiles", Query::new().eq("id", user), &body)
            .await
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn set_role(&self, user: UserId, role: UserRole) -> Result<(), SupabaseError> {
        let body = serde_json::json!({ "role": role.to_string() });
        self.update("profiles", Query::new().eq("id", user), &body)
            .await
    }

    /// Look up a user's role through the `get_user_role` remote procedure.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn user_role(&self, user: UserId) -> Result<Option<String>, SupabaseError> {
        self.rpc("get_user_role", &serde_json::json!({ "user_id": user }))
            .await
    }

    // =========================================================================
    // Request helpers
    // =========================================================================

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: Query,
    ) -> Result<Vec<T>, SupabaseError> {
        let mut url = self.client.endpoint(&format!("rest/v1/{table}"))?;
        query.apply_to(&mut url);

        let response = self
            .client
            .request(Method::GET, url, self.token)
            .send()
            .await?;
        read_json(response).await
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        query: Query,
        body: &B,
    ) -> Result<Vec<T>, SupabaseError> {
        let mut url = self.client.endpoint(&format!("rest/v1/{table}"))?;
        query.apply_to(&mut url);

        let response = self
            .client
            .request(Method::POST, url, self.token)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    async fn upsert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        on_conflict: &str,
        body: &B,
    ) -> Result<Vec<T>, SupabaseError> {
        let mut url = self.client.endpoint(&format!("rest/v1/{table}"))?;
        Query::new().on_conflict(on_conflict).apply_to(&mut url);

        let response = self
            .client
            .request(Method::POST, url, self.token)
            .header(
                "Prefer",
                "resolution=merge-duplicates,return=representation",
            )
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    async fn update<B: Serialize + ?Sized>(
        &self,
        table: &str,
        query: Query,
        body: &B,
    ) -> Result<(), SupabaseError> {
        let url = self.filtered_url(table, &query)?;
        let response = self
            .client
            .request(Method::PATCH, url, self.token)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    async fn delete(&self, table: &str, query: Query) -> Result<(), SupabaseError> {
        let url = self.filtered_url(table, &query)?;
        let response = self
            .client
            .request(Method::DELETE, url, self.token)
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    async fn rpc<A: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        function: &str,
        args: &A,
    ) -> Result<T, SupabaseError> {
        let url = self.client.endpoint(&format!("rest/v1/rpc/{function}"))?;
        let response = self
            .client
            .request(Method::POST, url, self.token)
            .json(args)
            .send()
            .await?;
        read_json(response).await
    }

    /// URL for a write that must be limited by a filter.
    fn filtered_url(&self, table: &str, query: &Query) -> Result<url::Url, SupabaseError> {
        if !query.has_filter() {
            return Err(SupabaseError::Parse(format!(
                "refusing unfiltered write to {table}"
            )));
        }
        let mut url = self.client.endpoint(&format!("rest/v1/{table}"))?;
        query.apply_to(&mut url);
        Ok(url)
    }
}

/// Take the single row a write returned.
fn single<T>(rows: Vec<T>) -> Result<T, SupabaseError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| SupabaseError::Parse("write returned no rows".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::SupabaseConfig;

    async fn client_for(server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: url::Url::parse(&server.uri()).unwrap(),
            anon_key: SecretString::from("anon-key"),
            service_role_key: Some(SecretString::from("service-key")),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_select_sends_user_token_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("category_id", "eq.2"))
            .and(query_param("offset", "30"))
            .and(query_param("limit", "30"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 31, "part_name": "Harrow tine", "part_code": "HT-31", "category_id": 2}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let rows = client
            .tables("user-token")
            .products_page(30, 30, Some(CategoryId::new(2)))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].part_code, "HT-31");
    }

    #[tokio::test]
    async fn test_last_possible_page_is_requested_as_is() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("offset", u32::MAX.to_string()))
            .and(query_param("limit", "31"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let rows = client
            .tables("user-token")
            .products_page(u32::MAX, 31, None)
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_merges_on_unique_columns() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/product_translations"))
            .and(query_param("on_conflict", "product_id,language_id"))
            .and(body_json(serde_json::json!({
                "product_id": 5, "language_id": 2, "part_name": "Sėjamoji"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!([
                {"product_id": 5, "language_id": 2, "part_name": "Sėjamoji"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client
            .tables("user-token")
            .upsert_product_translation(&ProductTranslationRow {
                product_id: ProductId::new(5),
                language_id: LanguageId::new(2),
                part_name: "Sėjamoji".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_service_tables_use_service_key() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let user: UserId = "2b7c1d9e-52f4-4a4b-9d36-7d3a3c1e8f10".parse().unwrap();
        client
            .service_tables()
            .unwrap()
            .set_role(user, UserRole::Admin)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_user_role_rpc_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_user_role"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let user: UserId = "2b7c1d9e-52f4-4a4b-9d36-7d3a3c1e8f10".parse().unwrap();
        let role = client.tables("user-token").user_role(user).await.unwrap();
        assert!(role.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/categories"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "code": "PGRST301", "message": "JWT expired"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.tables("stale").categories().await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_empty_id_list_skips_request() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        let rows = client.tables("user-token").products_by_ids(&[]).await.unwrap();
        assert!(rows.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
