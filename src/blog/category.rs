//! Category catalogue and slug -> title resolution.
//!
//! Posts reference their category by title, so every category-scoped query first
//! resolves the URL slug to a title.

use super::BlogCategory;

/// Slug that disables category filtering.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Copy)]
pub struct DefaultCategory {
    pub title: &'static str,
    pub slug: &'static str,
    pub description: &'static str,
    pub long_description: &'static str,
    pub icon: &'static str,
}

/// Built-in catalogue. Seeds `blog_categories` and backs resolution while the
/// table is empty.
pub const DEFAULT_CATEGORIES: &[DefaultCategory] = &[
    DefaultCategory {
        title: "Personal Finance",
        slug: "personal-finance",
        description: "Everyday money decisions made simple.",
        long_description: "Banking, saving and spending habits that keep your finances healthy month after month.",
        icon: "wallet",
    },
    DefaultCategory {
        title: "Investing",
        slug: "investing",
        description: "Build long-term wealth with confidence.",
        long_description: "Index funds, asset allocation and the fundamentals of growing your money over decades.",
        icon: "trending-up",
    },
    DefaultCategory {
        title: "Budgeting",
        slug: "budgeting",
        description: "Plan where every dollar goes.",
        long_description: "Budget frameworks, expense tracking and emergency funds for every income level.",
        icon: "pie-chart",
    },
    DefaultCategory {
        title: "Retirement Planning",
        slug: "retirement-planning",
        description: "Prepare for the years ahead.",
        long_description: "Retirement accounts, contribution strategies and withdrawal planning explained.",
        icon: "sunset",
    },
    DefaultCategory {
        title: "Credit & Debt",
        slug: "credit-and-debt",
        description: "Borrow wisely and pay it down faster.",
        long_description: "Credit scores, loans and proven strategies for getting out of debt.",
        icon: "credit-card",
    },
    DefaultCategory {
        title: "Taxes",
        slug: "taxes",
        description: "Keep more of what you earn.",
        long_description: "Filing basics, deductions and tax-advantaged accounts in plain language.",
        icon: "file-text",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryScope {
    /// The `all` sentinel: no filtering.
    All,
    /// A known category, carrying its title.
    Title(String),
    Unknown,
}

/// Resolve a URL slug against `categories`, falling back to the built-in catalogue
/// when `categories` is empty. Matching is case-insensitive on the slug.
pub fn resolve(slug: &str, categories: &[BlogCategory]) -> CategoryScope {
    let slug = slug.trim();
    if slug.eq_ignore_ascii_case(ALL_CATEGORIES) {
        return CategoryScope::All;
    }

    let found = if categories.is_empty() {
        DEFAULT_CATEGORIES
            .iter()
            .find(|c| c.slug.eq_ignore_ascii_case(slug))
            .map(|c| c.title.to_string())
    } else {
        categories
            .iter()
            .find(|c| c.slug.eq_ignore_ascii_case(slug))
            .map(|c| c.title.clone())
    };

    match found {
        Some(title) => CategoryScope::Title(title),
        None => CategoryScope::Unknown,
    }
}

/// Whether `title` names a category in `categories` (or the built-in catalogue).
pub fn is_known_title(title: &str, categories: &[BlogCategory]) -> bool {
    if categories.is_empty() {
        DEFAULT_CATEGORIES.iter().any(|c| c.title == title)
    } else {
        categories.iter().any(|c| c.title == title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn stored(title: &str, slug: &str) -> BlogCategory {
        BlogCategory {
            id: Uuid::new_v4(),
            title: title.into(),
            slug: slug.into(),
            description: String::new(),
            long_description: String::new(),
            icon: String::new(),
        }
    }

    #[test]
    fn test_all_sentinel_bypasses_lookup() {
        assert_eq!(resolve("all", &[]), CategoryScope::All);
        assert_eq!(resolve("ALL", &[stored("X", "x")]), CategoryScope::All);
    }

    #[test]
    fn test_resolves_builtin_catalogue_when_store_empty() {
        assert_eq!(
            resolve("credit-and-debt", &[]),
            CategoryScope::Title("Credit & Debt".into())
        );
    }

    #[test]
    fn test_stored_categories_take_precedence() {
        let categories = vec![stored("Side Hustles", "side-hustles")];
        assert_eq!(
            resolve("side-hustles", &categories),
            CategoryScope::Title("Side Hustles".into())
        );
        assert_eq!(resolve("investing", &categories), CategoryScope::Unknown);
    }

    #[test]
    fn test_unknown_slug() {
        assert_eq!(resolve("crypto-moonshots", &[]), CategoryScope::Unknown);
    }

    #[test]
    fn test_default_slugs_are_url_safe() {
        for category in DEFAULT_CATEGORIES {
            assert!(crate::blog::slug::is_valid_slug(category.slug), "{}", category.slug);
        }
    }
}
