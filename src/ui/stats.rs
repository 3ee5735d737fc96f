use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

use crate::app::StatsState;
use crate::richtext::spans;
use crate::ui::tweet::{format_count, wrap_rich};

/// Account summary, engagement on recent tweets, and followers.
pub struct StatsPane<'a> {
    pub stats: &'a StatsState,
}

impl<'a> StatsPane<'a> {
    pub fn new(stats: &'a StatsState) -> Self {
        Self { stats }
    }
}

impl Widget for StatsPane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.stats.pending > 0 {
            " Stats [loading...] "
        } else {
            " Stats "
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

        let [summary_area, trends_area, followers_area] = Layout::vertical([
            Constraint::Length(4),
            Constraint::Percentage(50),
            Constraint::Min(1),
        ])
        .areas(inner);

        self.render_summary(summary_area, buf);
        self.render_trends(trends_area, buf);
        self.render_followers(followers_area, buf);
    }
}

impl StatsPane<'_> {
    fn render_summary(&self, area: Rect, buf: &mut Buffer) {
        let Some(summary) = &self.stats.summary else {
            return;
        };
        let m = &summary.public_metrics;
        let lines = vec![
            metric_line(m.followers_count, "Followers"),
            metric_line(m.following_count, "Following"),
            metric_line(m.tweet_count, "Posts"),
            metric_line(m.listed_count, "Listed"),
        ];
        Paragraph::new(lines).render(area, buf);
    }

    fn render_trends(&self, area: Rect, buf: &mut Buffer) {
        let section = Block::default()
            .borders(Borders::TOP)
            .title(" Engagement ")
            .title_style(Style::default().fg(Color::DarkGray))
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = section.inner(area);
        section.render(area, buf);

        let mut lines = Vec::new();
        for tweet in &self.stats.trends {
            let metrics = tweet.public_metrics.clone().unwrap_or_default();
            lines.push(Line::from(vec![
                Span::styled(
                    format!("\u{2665} {}", format_count(metrics.like_count)),
                    Style::default().fg(Color::Red),
                ),
                Span::raw(" "),
                Span::styled(
                    format!("\u{21BB} {}", format_count(metrics.retweet_count)),
                    Style::default().fg(Color::Green),
                ),
                Span::raw(" "),
                Span::styled(
                    format!("\u{1F4AC} {}", format_count(metrics.reply_count)),
                    Style::default().fg(Color::Blue),
                ),
            ]));
            // First wrapped line of the text is enough for a summary row.
            if let Some(first) = wrap_rich(&spans::metric_text(tweet), inner.width as usize)
                .into_iter()
                .next()
            {
                lines.push(first);
            }
        }
        Paragraph::new(lines).render(inner, buf);
    }

    fn render_followers(&self, area: Rect, buf: &mut Buffer) {
        let section = Block::default()
            .borders(Borders::TOP)
            .title(format!(" Followers ({}) ", self.stats.followers.len()))
            .title_style(Style::default().fg(Color::DarkGray))
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = section.inner(area);
        section.render(area, buf);

        let width = inner.width as usize;
        let mut lines = Vec::new();
        for user in &self.stats.followers {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("@{}", user.username),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(user.name.clone(), Style::default().fg(Color::DarkGray)),
            ]));
            if let Some(first) = spans::user_bio(user)
                .and_then(|bio| wrap_rich(&bio, width).into_iter().next())
            {
                lines.push(first);
            }
            if let Some(link) = spans::user_url(user)
                .and_then(|url| wrap_rich(&url, width).into_iter().next())
            {
                lines.push(link);
            }
        }
        Paragraph::new(lines).render(inner, buf);
    }
}

fn metric_line(count: u64, label: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format_count(count),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {label}"), Style::default().fg(Color::DarkGray)),
    ])
}
