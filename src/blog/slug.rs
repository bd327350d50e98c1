use regex::Regex;

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

pub const INVALID_SLUG_MESSAGE: &str =
    "Slug must contain only lowercase letters, numbers, and hyphens";

pub const MAX_SLUG_CHARS: usize = 200;

/// Generated slugs stop here so a `-N` suffix still fits under [`MAX_SLUG_CHARS`].
const GENERATED_SLUG_CHARS: usize = MAX_SLUG_CHARS - 10;

/// Post slugs shadowed by the fixed `/api/blog/featured` and `/api/blog/category/..` routes.
pub const RESERVED_POST_SLUGS: &[&str] = &["featured", "category"];

pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_CHARS && SLUG_REGEX.is_match(slug)
}

pub fn is_reserved_post_slug(slug: &str) -> bool {
    RESERVED_POST_SLUGS.contains(&slug)
}

/// URL-safe slug derived from free text. Empty input yields `"post"`.
/// Long titles are cut back to the last whole word.
pub fn slugify(text: &str) -> String {
    let slug = slug::slugify(text);
    if slug.is_empty() {
        return "post".to_string();
    }
    if slug.len() <= GENERATED_SLUG_CHARS {
        return slug;
    }
    // slug::slugify output is ASCII, so byte offsets are char offsets.
    let cut = &slug[..GENERATED_SLUG_CHARS];
    match cut.rfind('-') {
        Some(i) if i > 0 => cut[..i].to_string(),
        _ => cut.trim_end_matches('-').to_string(),
    }
}

/// `base`, or `base-2`, `base-3`, ... whichever `taken` first rejects.
pub async fn first_free<F, Fut, E>(base: &str, mut taken: F) -> Result<String, E>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Result<bool, E>>,
{
    if !taken(base.to_string()).await? {
        return Ok(base.to_string());
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(candidate.clone()).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        assert!(is_valid_slug("how-to-budget-2025"));
        assert!(!is_valid_slug("How-To"));
        assert!(!is_valid_slug("double--hyphen"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify("Credit & Debt: A Primer"), "credit-debt-a-primer");
        assert_eq!(slugify("!!!"), "post");
        assert!(is_valid_slug(&slugify("Ünïcödé Títle 101")));
    }

    #[test]
    fn test_long_title_is_cut_at_word_boundary() {
        let title = "saving ".repeat(60);
        let slug = slugify(&title);
        assert!(slug.len() <= GENERATED_SLUG_CHARS);
        assert!(slug.ends_with("saving"));
        assert!(is_valid_slug(&slug));
        assert!(is_valid_slug(&format!("{slug}-99")));

        let unbroken = slugify(&"a".repeat(500));
        assert_eq!(unbroken.len(), GENERATED_SLUG_CHARS);
        assert!(is_valid_slug(&unbroken));
    }

    #[test]
    fn test_reserved_post_slugs() {
        assert!(is_reserved_post_slug("featured"));
        assert!(is_reserved_post_slug("category"));
        assert!(!is_reserved_post_slug("featured-funds"));
    }

    #[tokio::test]
    async fn test_first_free_appends_counter() {
        let existing = ["budget-basics", "budget-basics-2"];
        let slug = first_free("budget-basics", |candidate| async move {
            Ok::<_, ()>(existing.contains(&candidate.as_str()))
        })
        .await
        .unwrap();
        assert_eq!(slug, "budget-basics-3");
    }
}
