pub mod command_bar;
pub mod error_popup;
pub mod help;
pub mod input;
pub mod sidebar;
pub mod stats;
pub mod status_bar;
pub mod timeline;
pub mod tweet;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::app::{App, AppMode};

use command_bar::CommandBar;
use error_popup::ErrorPopup;
use help::HelpView;
use sidebar::ChannelSidebar;
use stats::StatsPane;
use status_bar::StatusBar;
use timeline::TimelineView;

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Layout: main content + status bar + optional command bar
    let bottom_height = if app.mode != AppMode::Normal { 2 } else { 1 };

    let [main_area, bottom_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(bottom_height)]).areas(area);

    if app.mode != AppMode::Normal {
        let [status_area, cmd_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(bottom_area);
        frame.render_widget(StatusBar::new(app), status_area);
        frame.render_widget(CommandBar::new(app), cmd_area);
    } else {
        frame.render_widget(StatusBar::new(app), bottom_area);
    }

    // Columns: channels | timeline | stats
    let stats_width = if app.show_stats { 36 } else { 0 };
    let [sidebar_area, timeline_area, stats_area] = Layout::horizontal([
        Constraint::Length(22),
        Constraint::Min(20),
        Constraint::Length(stats_width),
    ])
    .areas(main_area);

    frame.render_widget(
        ChannelSidebar::new(&app.channels, &app.selection),
        sidebar_area,
    );

    let title = app.selection_label();
    frame.render_widget(
        TimelineView::new(&title, app.tweets.posts(), app.selected_index)
            .loading(app.feed.is_loading() || !app.channels_loaded),
        timeline_area,
    );

    if app.show_stats {
        frame.render_widget(StatsPane::new(&app.stats), stats_area);
    }

    if app.show_help {
        frame.render_widget(HelpView::new(), main_area);
    }

    // Error detail popup overlay (renders on top of everything)
    if let Some(ref detail) = app.error_detail {
        frame.render_widget(ErrorPopup::new(detail), frame.area());
    }
}
