pub mod auth;
pub mod new_project;
pub mod project_detail;
pub mod project_list;

pub use auth::{LoginField, LoginScreen, RegisterField, RegisterScreen};
pub use new_project::{NewProjectField, NewProjectScreen};
pub use project_detail::{DetailFocus, ProjectDetailView};
pub use project_list::ProjectListView;

use chrono::{DateTime, Utc};
use ratatui::prelude::*;

/// Step through a fixed focus order, wrapping at either end.
pub(crate) fn cycle<T: Copy + PartialEq>(order: &[T], current: T, forward: bool) -> T {
    let idx = order.iter().position(|f| *f == current).unwrap_or(0);
    let len = order.len();
    let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
    order[next]
}

pub(crate) fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// Stack fixed-height rows top to bottom inside `area`, clipped to what fits.
pub(crate) fn rows(area: Rect, heights: &[u16]) -> Vec<Rect> {
    let mut y = area.y;
    heights
        .iter()
        .map(|&h| {
            let bottom = area.y + area.height;
            let height = h.min(bottom.saturating_sub(y));
            let rect = Rect {
                x: area.x,
                y,
                width: area.width,
                height,
            };
            y = y.saturating_add(height);
            rect
        })
        .collect()
}
