use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

use crate::channel::ActiveSelection;
use crate::store::channels::ChannelCollection;

/// Saved channels in display order. Digits 1-9 select the first nine.
pub struct ChannelSidebar<'a> {
    pub channels: &'a ChannelCollection,
    pub selection: &'a ActiveSelection,
}

impl<'a> ChannelSidebar<'a> {
    pub fn new(channels: &'a ChannelCollection, selection: &'a ActiveSelection) -> Self {
        Self {
            channels,
            selection,
        }
    }
}

impl Widget for ChannelSidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Channels ")
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(Color::DarkGray));

        let inner = block.inner(area);
        block.render(area, buf);

        let adhoc = self.selection.is_adhoc();
        let mut lines: Vec<Line<'_>> = self
            .channels
            .iter()
            .enumerate()
            .map(|(i, (key, channel))| {
                let number = if i < 9 {
                    format!("{} ", i + 1)
                } else {
                    "  ".to_string()
                };
                // The fallback channel stays marked, dimmed, behind a typed query.
                let style = match (self.selection.channel == Some(key), adhoc) {
                    (true, false) => Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED),
                    (true, true) => Style::default().fg(Color::Cyan),
                    (false, _) => Style::default(),
                };
                Line::from(vec![
                    Span::styled(number, Style::default().fg(Color::DarkGray)),
                    Span::styled(channel.name.as_str(), style),
                ])
            })
            .collect();

        if self.channels.is_empty() {
            lines.push(Line::from(Span::styled(
                "(none)",
                Style::default().fg(Color::DarkGray),
            )));
        }

        if adhoc {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled("/ ", Style::default().fg(Color::Yellow)),
                Span::styled(
                    self.selection.query.as_str(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
        }

        Paragraph::new(lines).render(inner, buf);
    }
}
