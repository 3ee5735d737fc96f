//! Span builders for the three entity-bearing shapes the backend serves.

use crate::api::types::{MetricTweet, Post, UrlSpan, User};
use crate::richtext::{Segment, Span, stitch};

/// Replacement node produced for a recognised entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityNode {
    Hashtag(String),
    Mention(String),
    Url { display: String, target: String },
}

impl EntityNode {
    /// Plain-text rendering, as it would read in the original post.
    pub fn label(&self) -> String {
        match self {
            EntityNode::Hashtag(tag) => format!("#{tag}"),
            EntityNode::Mention(name) => format!("@{name}"),
            EntityNode::Url { display, .. } => display.clone(),
        }
    }
}

pub type RichText = Vec<Segment<EntityNode>>;

const SUPPRESSED_MEDIA: &[&str] = &["photo", "video", "animated_gif"];

/// Stitch a post body with its hashtag, url, mention and media entities.
///
/// Media markers are removed from the body; callers render them from
/// [`Post::media`] instead.
pub fn post_text(post: &Post) -> RichText {
    let mut spans = Vec::new();

    if let Some(entities) = &post.entities {
        for tag in &entities.hashtags {
            if let Some((start, end)) = index_pair(tag.indices.as_deref(), "hashtag", &post.id) {
                spans.push(Span::new(start, end, EntityNode::Hashtag(tag.text.clone())));
            }
        }
        for url in &entities.urls {
            if let Some((start, end)) = index_pair(url.indices.as_deref(), "url", &post.id) {
                spans.push(Span::new(
                    start,
                    end,
                    url_node(&url.url, url.display_url.as_deref(), url.expanded_url.as_deref()),
                ));
            }
        }
        for mention in &entities.user_mentions {
            if let Some((start, end)) = index_pair(mention.indices.as_deref(), "mention", &post.id)
            {
                spans.push(Span::new(
                    start,
                    end,
                    EntityNode::Mention(mention.screen_name.clone()),
                ));
            }
        }
    }

    for media in post.media() {
        let kind = media.type_.as_deref().unwrap_or_default();
        if !SUPPRESSED_MEDIA.contains(&kind) {
            tracing::warn!(post_id = %post.id, kind, "skipping unrecognized media entity");
            continue;
        }
        if let Some((start, end)) = index_pair(media.indices.as_deref(), "media", &post.id) {
            spans.push(Span::removed(start, end));
        }
    }

    stitch(post.body(), spans)
}

/// Stitch an engagement-feed tweet. Only hashtags, urls and mentions apply.
pub fn metric_text(tweet: &MetricTweet) -> RichText {
    let mut spans = Vec::new();
    let entities = &tweet.entities;

    for tag in &entities.hashtags {
        if let Some((start, end)) = bounds(tag.start, tag.end, "hashtag", &tweet.id) {
            spans.push(Span::new(start, end, EntityNode::Hashtag(tag.tag.clone())));
        }
    }
    for mention in &entities.mentions {
        if let Some((start, end)) = bounds(mention.start, mention.end, "mention", &tweet.id) {
            spans.push(Span::new(
                start,
                end,
                EntityNode::Mention(mention.username.clone()),
            ));
        }
    }
    push_url_spans(&mut spans, &entities.urls, &tweet.id);

    stitch(&tweet.text, spans)
}

/// Stitch a user's profile url field, expanding its t.co link.
pub fn user_url(user: &User) -> Option<RichText> {
    let raw = user.url.as_deref().filter(|u| !u.is_empty())?;
    let urls = user
        .entities
        .url
        .as_ref()
        .map(|list| list.urls.as_slice())
        .unwrap_or_default();
    let mut spans = Vec::new();
    push_url_spans(&mut spans, urls, &user.id);
    Some(stitch(raw, spans))
}

/// Stitch a user's biography. Only url entities are expanded.
pub fn user_bio(user: &User) -> Option<RichText> {
    let raw = user.description.as_deref().filter(|d| !d.is_empty())?;
    let urls = user
        .entities
        .description
        .as_ref()
        .map(|list| list.urls.as_slice())
        .unwrap_or_default();
    let mut spans = Vec::new();
    push_url_spans(&mut spans, urls, &user.id);
    Some(stitch(raw, spans))
}

/// Render stitched text as a plain string.
pub fn plain(text: &RichText) -> String {
    super::flatten(text, |node| node.label().into())
}

fn push_url_spans(spans: &mut Vec<Span<EntityNode>>, urls: &[UrlSpan], owner: &str) {
    for url in urls {
        if let Some((start, end)) = bounds(url.start, url.end, "url", owner) {
            spans.push(Span::new(
                start,
                end,
                url_node(&url.url, url.display_url.as_deref(), url.expanded_url.as_deref()),
            ));
        }
    }
}

fn url_node(url: &str, display: Option<&str>, expanded: Option<&str>) -> EntityNode {
    EntityNode::Url {
        display: display.unwrap_or(url).to_string(),
        target: expanded.unwrap_or(url).to_string(),
    }
}

fn index_pair(indices: Option<&[i64]>, kind: &str, owner: &str) -> Option<(usize, usize)> {
    match indices {
        Some([start, end, ..]) => bounds(Some(*start), Some(*end), kind, owner),
        _ => {
            tracing::warn!(owner, kind, "entity without indices, skipping");
            None
        }
    }
}

fn bounds(start: Option<i64>, end: Option<i64>, kind: &str, owner: &str) -> Option<(usize, usize)> {
    let (Some(start), Some(end)) = (start, end) else {
        tracing::warn!(owner, kind, "entity missing start/end, skipping");
        return None;
    };
    match (usize::try_from(start), usize::try_from(end)) {
        (Ok(s), Ok(e)) if s <= e => Some((s, e)),
        _ => {
            tracing::warn!(owner, kind, start, end, "entity has invalid offsets, skipping");
            None
        }
    }
}
