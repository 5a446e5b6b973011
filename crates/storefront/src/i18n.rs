//! Interface message catalogs.
//!
//! Messages live in Fluent files under `locales/<language>/main.ftl` and are
//! compiled into the binary. A message missing from a catalog falls back to
//! English.

use fluent_templates::{LanguageIdentifier, Loader, static_loader};
use wholesale_core::LanguageCode;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "en",
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

/// Interface messages for one display language.
#[derive(Debug, Clone)]
pub struct Messages {
    language: LanguageIdentifier,
}

impl Messages {
    /// Messages for `language`. Languages without a catalog read as English.
    #[must_use]
    pub fn new(language: &LanguageCode) -> Self {
        Self {
            language: language.as_str().parse().unwrap_or_default(),
        }
    }

    /// The message for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> String {
        LOCALES.lookup(&self.language, id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    const EN: &str = include_str!("../locales/en/main.ftl");
    const LT: &str = include_str!("../locales/lt/main.ftl");

    fn messages(code: &str) -> Messages {
        Messages::new(&LanguageCode::parse(code).unwrap())
    }

    fn message_ids(catalog: &str) -> BTreeSet<&str> {
        catalog
            .lines()
            .filter_map(|line| line.split_once(" ="))
            .map(|(id, _)| id)
            .filter(|id| id.starts_with(|c: char| c.is_ascii_lowercase()))
            .collect()
    }

    #[test]
    fn test_catalogs_define_the_same_messages() {
        let en = message_ids(EN);
        let lt = message_ids(LT);
        assert!(!en.is_empty());
        assert_eq!(
            en.difference(&lt).collect::<Vec<_>>(),
            Vec::<&&str>::new(),
            "missing in lt"
        );
        assert_eq!(
            lt.difference(&en).collect::<Vec<_>>(),
            Vec::<&&str>::new(),
            "missing in en"
        );
    }

    #[test]
    fn test_messages_follow_the_language() {
        assert_eq!(messages("en").get("nav-cart"), "Cart");
        assert_eq!(messages("lt").get("nav-cart"), "Krepšelis");
        assert_eq!(
            messages("lt").get("products-price-on-request"),
            "Kaina pagal užklausą"
        );
    }

    #[test]
    fn test_language_without_catalog_reads_english() {
        assert_eq!(messages("de").get("nav-cart"), "Cart");
    }
}
