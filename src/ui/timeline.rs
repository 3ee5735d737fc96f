use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Widget};

use crate::api::types::Post;
use crate::ui::tweet::{PostCard, post_card_height};

/// A scrollable list of posts with selection highlight.
pub struct TimelineView<'a> {
    pub title: &'a str,
    pub posts: &'a [Post],
    pub selected_index: usize,
    pub loading: bool,
}

impl<'a> TimelineView<'a> {
    pub fn new(title: &'a str, posts: &'a [Post], selected_index: usize) -> Self {
        Self {
            title,
            posts,
            selected_index,
            loading: false,
        }
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }
}

impl Widget for TimelineView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.loading && !self.posts.is_empty() {
            format!(" {} [loading...] ", self.title)
        } else {
            format!(" {} ", self.title)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(Color::DarkGray));

        let inner = block.inner(area);
        block.render(area, buf);

        if self.posts.is_empty() {
            let msg = if self.loading {
                "Loading..."
            } else {
                "No posts to display"
            };
            buf.set_string(
                inner.x + 1,
                inner.y,
                msg,
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let content_width = inner.width.saturating_sub(1); // 1 char left margin

        // Card heights, each including its separator line.
        let heights: Vec<u16> = self
            .posts
            .iter()
            .map(|p| post_card_height(p, content_width) + 1)
            .collect();

        let scroll_start = compute_scroll_start(&heights, self.selected_index, inner.height);

        let mut y = inner.y;
        let mut idx = scroll_start;
        while idx < self.posts.len() && y < inner.y + inner.height {
            let remaining = inner.y + inner.height - y;
            let render_h = heights[idx].min(remaining);

            let card_area = Rect::new(inner.x + 1, y, content_width, render_h.saturating_sub(1));
            PostCard::new(&self.posts[idx])
                .selected(idx == self.selected_index)
                .render(card_area, buf);

            y += render_h;

            if y < inner.y + inner.height && idx + 1 < self.posts.len() {
                let sep = "\u{2500}".repeat(content_width as usize);
                buf.set_string(
                    inner.x + 1,
                    y.saturating_sub(1),
                    &sep,
                    Style::default().fg(Color::DarkGray),
                );
            }

            idx += 1;
        }
    }
}

/// Find the smallest scroll start index so that the selected item fits
/// within the available height.
fn compute_scroll_start(heights: &[u16], selected: usize, available: u16) -> usize {
    if heights.is_empty() {
        return 0;
    }

    let selected = selected.min(heights.len() - 1);
    if available == 0 {
        return selected;
    }

    // Build a viewport that always includes the selected post and packs as
    // many previous items as can fit above it.
    let mut start = selected;
    let mut used = heights[selected];

    while start > 0 {
        let next = used.saturating_add(heights[start - 1]);
        if next > available {
            break;
        }
        start -= 1;
        used = next;
    }

    start
}

#[cfg(test)]
mod tests {
    use super::compute_scroll_start;

    #[test]
    fn handles_empty_timeline() {
        assert_eq!(compute_scroll_start(&[], 0, 10), 0);
    }

    #[test]
    fn advances_when_selected_is_below_exactly_full_window() {
        // First two items exactly fill the viewport; selecting index 2 should
        // move the viewport start to 1 instead of looping.
        let heights = [5, 5, 5];
        assert_eq!(compute_scroll_start(&heights, 2, 10), 1);
    }

    #[test]
    fn keeps_selected_item_visible_when_it_is_taller_than_viewport() {
        let heights = [3, 12, 4];
        assert_eq!(compute_scroll_start(&heights, 1, 8), 1);
    }

    #[test]
    fn clamps_selected_index_to_last_item() {
        let heights = [2, 2, 2];
        assert_eq!(compute_scroll_start(&heights, 99, 4), 1);
    }
}
