//! Localized category and product names.
//!
//! Translations live in their own tables keyed by `(row id, language id)`.
//! A translation is used only when it exists for the requested language and
//! is not blank; otherwise the default name from the base table is shown.

use std::collections::HashMap;

use wholesale_core::{CategoryId, LanguageCode, LanguageId, ProductId};

use crate::config::I18nConfig;
use crate::supabase::{
    CategoryRow, CategoryTranslationRow, LanguageRow, ProductRow, ProductTranslationRow,
};

/// A category with the name to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedCategory {
    pub id: CategoryId,
    pub name: String,
    /// Whether `name` came from a translation.
    pub translated: bool,
}

/// Find the language row for a code. `None` means default names are used.
#[must_use]
pub fn resolve_language<'a>(
    languages: &'a [LanguageRow],
    code: &LanguageCode,
) -> Option<&'a LanguageRow> {
    languages.iter().find(|language| {
        LanguageCode::parse(&language.code).is_ok_and(|parsed| &parsed == code)
    })
}

/// Pick the display language for a request.
///
/// A supported language stored in the language cookie wins, then the best supported
/// match from `Accept-Language`, then the configured default.
#[must_use]
pub fn preferred_language(
    config: &I18nConfig,
    stored_language: Option<&str>,
    accept_language: Option<&str>,
) -> LanguageCode {
    stored_language
        .and_then(|code| LanguageCode::parse(code).ok())
        .filter(|code| config.supports(code))
        .or_else(|| {
            accept_language
                .and_then(|header| LanguageCode::negotiate(header, &config.supported_languages))
        })
        .unwrap_or_else(|| config.default_language.clone())
}

/// Resolve display names for categories, ordered by category id.
#[must_use]
pub fn localize_categories(
    categories: &[CategoryRow],
    translations: &[CategoryTranslationRow],
    language: Option<LanguageId>,
) -> Vec<LocalizedCategory> {
    let translated = translation_map(
        language,
        translations
            .iter()
            .map(|t| (t.category_id, t.language_id, t.category_name.as_str())),
    );

    let mut localized: Vec<LocalizedCategory> = categories
        .iter()
        .map(|category| match translated.get(&category.id) {
            Some(name) => LocalizedCategory {
                id: category.id,
                name: (*name).to_string(),
                translated: true,
            },
            None => LocalizedCategory {
                id: category.id,
                name: category.category_name.clone(),
                translated: false,
            },
        })
        .collect();

    localized.sort_by_key(|category| category.id);
    localized
}

/// Resolve display names for products, keyed by product id.
#[must_use]
pub fn localize_product_names(
    products: &[ProductRow],
    translations: &[ProductTranslationRow],
    language: Option<LanguageId>,
) -> HashMap<ProductId, String> {
    let translated = translation_map(
        language,
        translations
            .iter()
            .map(|t| (t.product_id, t.language_id, t.part_name.as_str())),
    );

    products
        .iter()
        .map(|product| {
            let name = translated
                .get(&product.id)
                .map_or_else(|| product.part_name.clone(), |name| (*name).to_string());
            (product.id, name)
        })
        .collect()
}

/// Usable translations for one language, keyed by row id.
fn translation_map<'a, K>(
    language: Option<LanguageId>,
    rows: impl Iterator<Item = (K, LanguageId, &'a str)>,
) -> HashMap<K, &'a str>
where
    K: std::hash::Hash + Eq,
{
    let Some(language) = language else {
        return HashMap::new();
    };

    rows.filter(|(_, row_language, name)| *row_language == language && !name.trim().is_empty())
        .map(|(id, _, name)| (id, name.trim()))
        .collect()
}
