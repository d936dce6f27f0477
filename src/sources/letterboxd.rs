//! Letterboxd film review feed adapter.
//!
//! Reads the member's RSS feed (or a local fixture) and keeps the newest
//! few reviews. An item that is missing its film title is skipped rather
//! than failing the whole feed.

use std::path::PathBuf;

use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::SyncError;
use crate::feed;
use crate::sources::SourceAdapter;

const SOURCE: &str = "letterboxd";
const RECENT_LIMIT: usize = 3;

#[derive(Debug, Serialize)]
struct FilmReview {
    title: String,
    year: Option<i32>,
    rating: Option<f64>,
    watched_date: Option<String>,
    is_rewatch: bool,
    review: String,
    image_url: String,
    link: String,
}

pub struct LetterboxdSource {
    client: Client,
    username: String,
    fixture: Option<PathBuf>,
}

impl LetterboxdSource {
    pub fn new(client: Client, username: String, fixture: Option<PathBuf>) -> Self {
        Self {
            client,
            username,
            fixture,
        }
    }

    fn feed_url(&self) -> String {
        format!("https://letterboxd.com/{}/rss/", self.username)
    }

    async fn feed_body(&self) -> Result<String, SyncError> {
        if let Some(path) = &self.fixture {
            return std::fs::read_to_string(path)
                .map_err(|err| SyncError::source_failure(SOURCE, err));
        }
        let response = self
            .client
            .get(self.feed_url())
            .send()
            .await
            .map_err(|err| SyncError::source_failure(SOURCE, err))?
            .error_for_status()
            .map_err(|err| SyncError::source_failure(SOURCE, err))?;
        response
            .text()
            .await
            .map_err(|err| SyncError::source_failure(SOURCE, err))
    }
}

#[async_trait]
impl SourceAdapter for LetterboxdSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    fn empty_block(&self) -> Value {
        json!({
            "username": self.username,
            "recent_reviews": [],
        })
    }

    async fn produce(&self) -> Result<Value, SyncError> {
        let body = self.feed_body().await?;
        let reviews = parse_reviews(&body);
        Ok(json!({
            "username": self.username,
            "recent_reviews": reviews,
        }))
    }
}

fn parse_reviews(xml: &str) -> Vec<FilmReview> {
    let mut reviews = Vec::new();
    for item in feed::items(xml) {
        match parse_review(item) {
            Some(review) => reviews.push(review),
            None => warn!("skipping unparsable letterboxd item"),
        }
        if reviews.len() == RECENT_LIMIT {
            break;
        }
    }
    reviews
}

fn parse_review(item: &str) -> Option<FilmReview> {
    let title = feed::tag_text(item, "letterboxd:filmTitle")?;
    let description = feed::tag_text(item, "description").unwrap_or_default();
    Some(FilmReview {
        title,
        year: feed::tag_text(item, "letterboxd:filmYear").and_then(|y| y.parse().ok()),
        rating: feed::tag_text(item, "letterboxd:memberRating").and_then(|r| r.parse().ok()),
        watched_date: feed::tag_text(item, "letterboxd:watchedDate"),
        is_rewatch: feed::tag_text(item, "letterboxd:rewatch").as_deref() == Some("Yes"),
        review: feed::strip_tags(&description),
        image_url: feed::tag_attr(&description, "img", "src").unwrap_or_default(),
        link: feed::tag_text(item, "link").unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, date: &str) -> String {
        format!(
            r#"<item>
                <title>{title}, 2020 - 4 stars</title>
                <link>https://letterboxd.com/u/film/{title}/</link>
                <letterboxd:watchedDate>{date}</letterboxd:watchedDate>
                <letterboxd:rewatch>No</letterboxd:rewatch>
                <letterboxd:filmTitle>{title}</letterboxd:filmTitle>
                <letterboxd:filmYear>2020</letterboxd:filmYear>
                <letterboxd:memberRating>4.0</letterboxd:memberRating>
                <description><![CDATA[ <p><img src="https://a.ltrbxd.com/p.jpg"/></p> <p>Loved it.</p> ]]></description>
            </item>"#
        )
    }

    #[test]
    fn parses_fields_from_namespaced_tags() {
        let xml = format!("<rss><channel>{}</channel></rss>", item("Heat", "2024-05-01"));
        let reviews = parse_reviews(&xml);
        assert_eq!(reviews.len(), 1);
        let review = &reviews[0];
        assert_eq!(review.title, "Heat");
        assert_eq!(review.year, Some(2020));
        assert_eq!(review.rating, Some(4.0));
        assert_eq!(review.watched_date.as_deref(), Some("2024-05-01"));
        assert!(!review.is_rewatch);
        assert!(review.review.contains("Loved it."));
        assert_eq!(review.image_url, "https://a.ltrbxd.com/p.jpg");
    }

    #[test]
    fn malformed_item_is_skipped_not_fatal() {
        let xml = format!(
            "<rss><channel><item><title>junk</title></item>{}</channel></rss>",
            item("Alien", "2024-04-01")
        );
        let reviews = parse_reviews(&xml);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].title, "Alien");
    }

    #[test]
    fn keeps_only_the_newest_three() {
        let xml = format!(
            "<rss><channel>{}{}{}{}</channel></rss>",
            item("A", "2024-05-04"),
            item("B", "2024-05-03"),
            item("C", "2024-05-02"),
            item("D", "2024-05-01"),
        );
        let reviews = parse_reviews(&xml);
        assert_eq!(reviews.len(), 3);
        assert_eq!(reviews[2].title, "C");
    }

    #[tokio::test]
    async fn fixture_mode_reads_the_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letterboxd.xml");
        std::fs::write(
            &path,
            format!("<rss><channel>{}</channel></rss>", item("Heat", "2024-05-01")),
        )
        .unwrap();
        let source = LetterboxdSource::new(Client::new(), "someone".into(), Some(path));
        let block = source.produce().await.unwrap();
        assert_eq!(block["username"], "someone");
        assert_eq!(block["recent_reviews"][0]["title"], "Heat");
    }

    #[tokio::test]
    async fn missing_fixture_is_a_source_error() {
        let source = LetterboxdSource::new(
            Client::new(),
            "someone".into(),
            Some(PathBuf::from("/definitely/not/here.xml")),
        );
        let err = source.produce().await.unwrap_err();
        assert_eq!(err.code(), "SRC-1003");
    }
}
