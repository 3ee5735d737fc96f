use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthStr;

use crate::api::types::Post;
use crate::richtext::Segment;
use crate::richtext::spans::{self, EntityNode, RichText};

/// Retweets and quotes nest at most this deep before collapsing.
const MAX_EMBED_DEPTH: usize = 4;

const QUOTE_GUTTER: &str = "\u{2502} ";

/// Renders a post as a card. Retweets and quotes are rendered recursively.
///
/// Layout:
///   @screen_name Name · 2h   [Reply @x]
///   Post text with #tags, @mentions and links (wrapped) ...
///   [photo] https://...
///   │ quoted post, indented
///   ↻ 3  ♥ 12
pub struct PostCard<'a> {
    pub post: &'a Post,
    pub selected: bool,
}

impl<'a> PostCard<'a> {
    pub fn new(post: &'a Post) -> Self {
        Self {
            post,
            selected: false,
        }
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

impl Widget for PostCard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let lines = post_lines(self.post, area.width as usize, self.selected, 0);
        for (line, y) in lines.iter().zip(area.y..area.y + area.height) {
            buf.set_line(area.x, y, line, area.width);
        }
    }
}

/// Height in lines needed for a post card.
pub fn post_card_height(post: &Post, width: u16) -> u16 {
    let lines = post_lines(post, width as usize, false, 0).len();
    u16::try_from(lines).unwrap_or(u16::MAX)
}

fn post_lines(post: &Post, width: usize, selected: bool, depth: usize) -> Vec<Line<'static>> {
    if depth >= MAX_EMBED_DEPTH {
        return vec![Line::from(Span::styled(
            format!("\u{2026} @{}", post.screen_name()),
            Style::default().fg(Color::DarkGray),
        ))];
    }

    // A retweet is a banner over the reposted original.
    if post.is_retweet()
        && let Some(original) = post.retweeted_status.as_deref()
    {
        let mut lines = vec![Line::from(Span::styled(
            format!("\u{21BB} @{} retweeted", post.screen_name()),
            Style::default().fg(Color::Green),
        ))];
        lines.extend(post_lines(original, width, selected, depth + 1));
        return lines;
    }

    let mut lines = vec![header_line(post, selected)];
    lines.extend(wrap_rich(&spans::post_text(post), width));

    for media in post.media() {
        let kind = media.type_.as_deref().unwrap_or("media");
        let link = media
            .expanded_url
            .as_deref()
            .or(media.media_url_https.as_deref())
            .unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(format!("[{kind}] "), Style::default().fg(Color::Yellow)),
            Span::styled(link.to_string(), Style::default().fg(Color::DarkGray)),
        ]));
    }

    if post.is_quote()
        && let Some(quoted) = post.quoted_status.as_deref()
    {
        let inner_width = width.saturating_sub(QUOTE_GUTTER.width());
        for mut line in post_lines(quoted, inner_width, false, depth + 1) {
            line.spans.insert(
                0,
                Span::styled(QUOTE_GUTTER, Style::default().fg(Color::DarkGray)),
            );
            lines.push(line);
        }
    }

    lines.push(Line::from(vec![
        Span::styled(
            format!("\u{21BB} {}", format_count(post.retweet_count)),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(
            format!("\u{2665} {}", format_count(post.favorite_count)),
            Style::default().fg(Color::Red),
        ),
    ]));
    lines
}

fn header_line(post: &Post, selected: bool) -> Line<'static> {
    let highlight_style = if selected {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let mut header = vec![Span::styled(
        format!("@{}", post.screen_name()),
        highlight_style.add_modifier(Modifier::BOLD),
    )];

    if let Some(name) = post.user.as_ref().map(|u| &u.name).filter(|n| !n.is_empty()) {
        header.push(Span::raw(" "));
        header.push(Span::styled(
            name.clone(),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if let Some(created_at) = post.created_at {
        header.push(Span::styled(
            format!(" \u{00B7} {}", format_time_ago(created_at)),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if post.is_reply() {
        let label = match post.in_reply_to_screen_name.as_deref() {
            Some(to) => format!(" [Reply @{to}]"),
            None => " [Reply]".to_string(),
        };
        header.push(Span::styled(label, Style::default().fg(Color::Blue)));
    }
    if post.is_quote() {
        header.push(Span::styled(" [Quote]", Style::default().fg(Color::Yellow)));
    }

    Line::from(header)
}

// ---------------------------------------------------------------------------
// Rich text wrapping
// ---------------------------------------------------------------------------

enum Token {
    Word {
        text: String,
        style: Style,
        space_before: bool,
    },
    Break,
}

fn node_style(node: &EntityNode) -> Style {
    match node {
        EntityNode::Hashtag(_) => Style::default().fg(Color::Cyan),
        EntityNode::Mention(_) => Style::default().fg(Color::Magenta),
        EntityNode::Url { .. } => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::UNDERLINED),
    }
}

/// Split stitched text into words, remembering where whitespace separated
/// them so that `(#tag)` stays glued together.
fn tokenize(text: &RichText) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pending_space = false;

    for segment in text {
        match segment {
            Segment::Text(s) => {
                let mut word = String::new();
                let mut word_space = pending_space;
                for c in s.chars() {
                    if c == '\n' || c.is_whitespace() {
                        if !word.is_empty() {
                            tokens.push(Token::Word {
                                text: std::mem::take(&mut word),
                                style: Style::default(),
                                space_before: word_space,
                            });
                        }
                        if c == '\n' {
                            tokens.push(Token::Break);
                            pending_space = false;
                        } else {
                            pending_space = true;
                        }
                        word_space = pending_space;
                    } else {
                        if word.is_empty() {
                            word_space = pending_space;
                        }
                        word.push(c);
                        pending_space = false;
                    }
                }
                if !word.is_empty() {
                    tokens.push(Token::Word {
                        text: word,
                        style: Style::default(),
                        space_before: word_space,
                    });
                }
            }
            Segment::Node(node) => {
                tokens.push(Token::Word {
                    text: node.label(),
                    style: node_style(node),
                    space_before: pending_space,
                });
                pending_space = false;
            }
        }
    }
    tokens
}

/// Greedy word wrap by display width. Words wider than `width` overflow.
pub fn wrap_rich(text: &RichText, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![];
    }
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;

    for token in tokenize(text) {
        match token {
            Token::Break => {
                lines.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }
            Token::Word {
                text,
                style,
                space_before,
            } => {
                let w = text.width();
                let mut gap = usize::from(space_before && used > 0);
                if used > 0 && used + gap + w > width {
                    lines.push(Line::from(std::mem::take(&mut current)));
                    used = 0;
                    gap = 0;
                }
                if gap == 1 {
                    current.push(Span::raw(" "));
                }
                used += gap + w;
                current.push(Span::styled(text, style));
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

pub fn format_time_ago(dt: chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let diff = now.signed_duration_since(dt);

    if diff.num_seconds() < 60 {
        format!("{}s", diff.num_seconds().max(0))
    } else if diff.num_minutes() < 60 {
        format!("{}m", diff.num_minutes())
    } else if diff.num_hours() < 24 {
        format!("{}h", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d", diff.num_days())
    } else {
        dt.format("%b %d").to_string()
    }
}

pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn post(json: serde_json::Value) -> Post {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn wrap_keeps_glued_entities() {
        let text = vec![
            Segment::Text("see (".into()),
            Segment::Node(EntityNode::Hashtag("rust".into())),
            Segment::Text(") now".into()),
        ];
        let lines = wrap_rich(&text, 80);
        assert_eq!(lines.len(), 1);
        assert_eq!(text_of(&lines[0]), "see (#rust) now");
    }

    #[test]
    fn wrap_breaks_on_width_and_newlines() {
        let text = vec![Segment::Text("aaa bbb ccc\nddd".into())];
        let lines: Vec<String> = wrap_rich(&text, 7).iter().map(text_of).collect();
        assert_eq!(lines, vec!["aaa bbb", "ccc", "ddd"]);
    }

    #[test]
    fn wrap_measures_display_width() {
        // Each CJK character is two columns wide.
        let text = vec![Segment::Text("日本 語".into())];
        let lines: Vec<String> = wrap_rich(&text, 5).iter().map(text_of).collect();
        assert_eq!(lines, vec!["日本", "語"]);
    }

    #[test]
    fn card_shows_quote_indented() {
        let p = post(serde_json::json!({
            "id_str": "2",
            "full_text": "look",
            "is_quote_status": true,
            "user": { "screen_name": "a" },
            "quoted_status": {
                "id_str": "1",
                "full_text": "original",
                "user": { "screen_name": "b" }
            }
        }));
        let lines: Vec<String> = post_lines(&p, 40, false, 0).iter().map(text_of).collect();
        assert_eq!(lines[0], "@a [Quote]");
        assert_eq!(lines[1], "look");
        assert_eq!(lines[2], "\u{2502} @b");
        assert_eq!(lines[3], "\u{2502} original");
        assert_eq!(lines.last().unwrap(), "\u{21BB} 0  \u{2665} 0");
    }

    #[test]
    fn card_depth_is_bounded() {
        let mut json = serde_json::json!({ "id_str": "0", "full_text": "root" });
        for i in 1..10 {
            json = serde_json::json!({
                "id_str": i.to_string(),
                "full_text": "rt",
                "user": { "screen_name": format!("u{i}") },
                "retweeted_status": json,
            });
        }
        let lines: Vec<String> = post_lines(&post(json), 40, false, 0)
            .iter()
            .map(text_of)
            .collect();
        assert_eq!(lines.len(), MAX_EMBED_DEPTH + 1);
        assert!(lines.last().unwrap().starts_with('\u{2026}'));
    }

    #[test]
    fn format_count_abbreviates() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_500), "1.5K");
        assert_eq!(format_count(2_000_000), "2.0M");
    }
}
