use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::DateTime;

use crate::blog::PostFilter;
use crate::db::models::BlogPostRow;
use crate::error::ApiResult;
use crate::pagination::Pagination;
use crate::state::AppState;

const FEED_SIZE: i64 = 50;

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn rfc822(dt: &DateTime<chrono::Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

fn render_item(base_url: &str, post: &BlogPostRow) -> String {
    let post_url = format!("{}/blog/{}", base_url, post.slug);
    let desc = post.excerpt.as_deref().unwrap_or("");
    let category = post
        .category
        .as_deref()
        .map(|c| format!("      <category>{}</category>\n", escape_xml(c)))
        .unwrap_or_default();
    format!(
        "    <item>\n\
               <title>{}</title>\n\
               <link>{}</link>\n\
               <description>{}</description>\n\
         {}\
               <pubDate>{}</pubDate>\n\
               <guid isPermaLink=\"true\">{}</guid>\n\
             </item>\n",
        escape_xml(&post.title),
        escape_xml(&post_url),
        escape_xml(desc),
        category,
        rfc822(&post.created_at),
        escape_xml(&post_url),
    )
}

/// GET /rss.xml - the newest posts as RSS 2.0
pub async fn rss_feed(State(state): State<AppState>) -> ApiResult<Response> {
    let config = state.config();
    let (rows, _) = state
        .store()
        .list_posts(&PostFilter::default(), Some(Pagination::new(1, FEED_SIZE)))
        .await?;

    let items: String = rows
        .iter()
        .map(|post| render_item(&config.site_url, post))
        .collect();

    let feed_url = format!("{}/rss.xml", config.site_url);
    let blog_url = format!("{}/blog", config.site_url);

    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>{}</description>
    <language>en-us</language>
    <atom:link href="{}" rel="self" type="application/rss+xml"/>
    <lastBuildDate>{}</lastBuildDate>
{}  </channel>
</rss>"#,
        escape_xml(&config.site_title),
        escape_xml(&blog_url),
        escape_xml(&config.site_description),
        escape_xml(&feed_url),
        rows.first()
            .map(|post| rfc822(&post.created_at))
            .unwrap_or_default(),
        items,
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/rss+xml; charset=utf-8"),
            (
                header::CACHE_CONTROL,
                "public, max-age=3600, stale-while-revalidate=600",
            ),
        ],
        xml,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::{queries, NewPost};
    use crate::testing::{empty_request, send, test_state};
    use axum::http::{Method, StatusCode};
    use axum::routing::get;
    use axum::Router;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<title>"), "&lt;title&gt;");
        assert_eq!(escape_xml("\"quote\""), "&quot;quote&quot;");
    }

    #[test]
    fn test_rfc822_format() {
        use chrono::TimeZone;
        let dt = chrono::Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(rfc822(&dt), "Mon, 15 Jan 2024 12:00:00 +0000");
    }

    #[tokio::test]
    async fn test_feed_lists_posts() {
        let state = test_state();
        queries::create_post(
            state.store(),
            NewPost {
                title: "Credit Scores & You".into(),
                category: "Credit & Debt".into(),
                excerpt: Some("What moves the number".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let app = Router::new()
            .route("/rss.xml", get(rss_feed))
            .with_state(state);
        let (status, headers, body) =
            send(app, empty_request(Method::GET, "/rss.xml", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("application/rss+xml"));

        let xml = String::from_utf8(body.to_vec()).unwrap();
        assert!(xml.contains("<title>Credit Scores &amp; You</title>"));
        assert!(xml.contains("/blog/credit-scores-you</link>"));
        assert!(xml.contains("<category>Credit &amp; Debt</category>"));
    }
}
