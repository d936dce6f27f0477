//! Goodreads reading feed adapter.
//!
//! Reads the review-list RSS feed (or a local fixture). The interesting
//! fields hide inside the item description, so a few scanning helpers pull
//! out the member's own rating (not the average), the read date, and the
//! review text. A feed failure degrades to an empty-but-valid block.

use std::cmp::Ordering;
use std::path::PathBuf;

use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::SyncError;
use crate::feed;
use crate::sources::SourceAdapter;

const SOURCE: &str = "goodreads";
const RECENT_LIMIT: usize = 8;

// Some hosts reject default client UAs outright.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Serialize)]
struct BookReview {
    title: String,
    author: String,
    rating: f64,
    read_at: Option<String>,
    image_url: String,
    link: String,
    review: String,
}

pub struct GoodreadsSource {
    client: Client,
    user_id: String,
    fixture: Option<PathBuf>,
}

impl GoodreadsSource {
    pub fn new(client: Client, user_id: String, fixture: Option<PathBuf>) -> Self {
        Self {
            client,
            user_id,
            fixture,
        }
    }

    fn feed_url(&self) -> String {
        format!("https://www.goodreads.com/review/list_rss/{}", self.user_id)
    }

    fn profile_url(&self) -> String {
        format!("https://www.goodreads.com/user/show/{}", self.user_id)
    }

    async fn feed_body(&self) -> Result<String, SyncError> {
        if let Some(path) = &self.fixture {
            return std::fs::read_to_string(path)
                .map_err(|err| SyncError::source_failure(SOURCE, err));
        }
        let response = self
            .client
            .get(self.feed_url())
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
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
impl SourceAdapter for GoodreadsSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    fn empty_block(&self) -> Value {
        json!({
            "recent_reviews": [],
            "profile_url": self.profile_url(),
        })
    }

    async fn produce(&self) -> Result<Value, SyncError> {
        // The feed is flaky; a fetch failure degrades rather than erroring
        // so the document still carries the profile link.
        let body = match self.feed_body().await {
            Ok(body) => body,
            Err(err) => {
                warn!("goodreads feed unavailable: {err}");
                return Ok(self.empty_block());
            }
        };
        let mut reviews = parse_reviews(&body);
        sort_by_read_date(&mut reviews);
        reviews.truncate(RECENT_LIMIT);
        Ok(json!({
            "recent_reviews": reviews,
            "profile_url": self.profile_url(),
        }))
    }
}

fn parse_reviews(xml: &str) -> Vec<BookReview> {
    let mut reviews = Vec::new();
    for item in feed::items(xml) {
        match parse_review(item) {
            Some(review) => reviews.push(review),
            None => warn!("skipping unparsable goodreads item"),
        }
    }
    reviews
}

fn parse_review(item: &str) -> Option<BookReview> {
    let raw_title = feed::tag_text(item, "title")?;
    // Titles occasionally carry an " by Author" suffix.
    let title = raw_title
        .split(" by ")
        .next()
        .unwrap_or(&raw_title)
        .trim()
        .to_string();
    let description = feed::tag_text(item, "description").unwrap_or_default();
    Some(BookReview {
        title,
        author: feed::tag_text(item, "author_name").unwrap_or_default(),
        rating: user_rating(&description),
        read_at: field_after(&description, "read at:"),
        image_url: feed::tag_text(item, "book_image_url")
            .map(|url| strip_image_size_suffix(&url))
            .unwrap_or_default(),
        link: feed::tag_text(item, "link").unwrap_or_default(),
        review: review_text(&description),
    })
}

/// Member rating from the description, ignoring "average rating:" entries.
fn user_rating(description: &str) -> f64 {
    let mut from = 0;
    while let Some(pos) = description[from..].find("rating:") {
        let pos = from + pos;
        let preceded_by_average = description[..pos].ends_with("average ");
        if !preceded_by_average {
            let rest = description[pos + "rating:".len()..].trim_start();
            let digits: String = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Ok(value) = digits.parse() {
                return value;
            }
        }
        from = pos + "rating:".len();
    }
    0.0
}

/// Text following `label` up to the next newline or tag.
fn field_after(description: &str, label: &str) -> Option<String> {
    let start = description.find(label)? + label.len();
    let rest = &description[start..];
    let end = rest
        .find(|c: char| c == '\n' || c == '<')
        .unwrap_or(rest.len());
    let value = rest[..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn review_text(description: &str) -> String {
    match description.find("review:") {
        Some(pos) => feed::strip_tags(description[pos + "review:".len()..].trim()),
        None => String::new(),
    }
}

/// Drop cover-size patterns like `._SY75_` or `_SX50_` from image URLs.
fn strip_image_size_suffix(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut i = 0;
    while i < url.len() {
        if let Some(end) = size_pattern_end(url, i) {
            i = end;
            continue;
        }
        match url[i..].chars().next() {
            Some(ch) => {
                out.push(ch);
                i += ch.len_utf8();
            }
            None => break,
        }
    }
    out
}

/// Length of a `[.]_S[XY]<digits>_` pattern starting at `i`, if present.
fn size_pattern_end(url: &str, i: usize) -> Option<usize> {
    let rest = &url[i..];
    let body = rest.strip_prefix('.').unwrap_or(rest);
    let dot = rest.len() - body.len();
    let tail = body.strip_prefix("_S")?;
    let tail = tail
        .strip_prefix('X')
        .or_else(|| tail.strip_prefix('Y'))?;
    let digits = tail.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let tail = &tail[digits..];
    tail.strip_prefix('_')?;
    Some(i + dot + 2 + 1 + digits + 1)
}

/// Newest read first; entries without a read date go to the bottom.
fn sort_by_read_date(reviews: &mut [BookReview]) {
    reviews.sort_by(|a, b| match (&a.read_at, &b.read_at) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
