//! Keyword filter applied to fetched items.

use crate::article::Item;

/// Drops items whose title or categories match a configured keyword.
///
/// Title matching is a case-insensitive substring test. Category matching
/// is exact and case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    /// Keywords as configured, for category matching.
    keywords: Vec<String>,
    /// Lower-cased keywords, for title matching.
    lowered: Vec<String>,
}

impl KeywordFilter {
    /// Create a filter from the configured keywords. Blank keywords are ignored.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .collect();
        let lowered = keywords.iter().map(|k| k.to_lowercase()).collect();

        Self { keywords, lowered }
    }

    /// Whether no keywords are configured.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Whether `item` should be dropped.
    pub fn rejects(&self, item: &Item) -> bool {
        if self.is_empty() {
            return false;
        }

        let title = item.title.to_lowercase();
        if self.lowered.iter().any(|k| title.contains(k.as_str())) {
            return true;
        }

        item.categories
            .iter()
            .any(|category| self.keywords.iter().any(|k| k == category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str) -> Item {
        Item::new(title, "https://example.com/1")
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = KeywordFilter::new(Vec::<String>::new());
        assert!(filter.is_empty());
        assert!(!filter.rejects(&item("Anything").with_category("ads")));
    }

    #[test]
    fn test_title_match_is_case_insensitive_substring() {
        let filter = KeywordFilter::new(["sponsored"]);
        assert!(filter.rejects(&item("This post is SPONSORED content")));
        assert!(filter.rejects(&item("Sponsoredlink")));
        assert!(!filter.rejects(&item("Sports news")));

        // Keywords configured in upper case still match titles
        let filter = KeywordFilter::new(["Advert"]);
        assert!(filter.rejects(&item("an advertisement")));
    }

    #[test]
    fn test_category_match_is_exact_and_case_sensitive() {
        let filter = KeywordFilter::new(["Promo"]);
        assert!(filter.rejects(&item("Plain title").with_category("Promo")));
        assert!(!filter.rejects(&item("Plain title").with_category("promo")));
        assert!(!filter.rejects(&item("Plain title").with_category("Promotions")));
    }

    #[test]
    fn test_blank_keywords_are_ignored() {
        let filter = KeywordFilter::new(["", "  "]);
        assert!(filter.is_empty());
        assert!(!filter.rejects(&item("Anything")));
    }
}
