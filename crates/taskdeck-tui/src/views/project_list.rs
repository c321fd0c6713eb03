use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use taskdeck_core::project::Project;
use taskdeck_service::ServiceError;

use super::format_date;
use crate::components::Spinner;
use crate::context::AppContext;

/// The signed-in user's projects, newest first.
#[derive(Debug, Default)]
pub struct ProjectListView {
    projects: Vec<Project>,
    list_state: ListState,
    loaded: bool,
}

impl ProjectListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Re-query the whole list. On failure the previous list stays on screen.
    pub fn load(&mut self, ctx: &AppContext) -> Result<(), ServiceError> {
        let session = ctx.require_session()?;
        let projects = ctx.service.list_projects(session)?;
        let selected_id = self.selected().map(|p| p.id.clone());
        self.projects = projects;
        self.loaded = true;

        let idx = selected_id
            .and_then(|id| self.projects.iter().position(|p| p.id == id))
            .or(if self.projects.is_empty() { None } else { Some(0) });
        self.list_state.select(idx);
        tracing::debug!(count = self.projects.len(), "projects loaded");
        Ok(())
    }

    pub fn selected(&self) -> Option<&Project> {
        self.projects.get(self.list_state.selected()?)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let len = self.projects.len();
        if len == 0 {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if current + 1 < len {
                    self.list_state.select(Some(current + 1));
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if current > 0 {
                    self.list_state.select(Some(current - 1));
                }
            }
            // Jump to first/last
            KeyCode::Char('g') => self.list_state.select(Some(0)),
            KeyCode::Char('G') => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, tick: usize) {
        let block = Block::default()
            .title(" My Projects ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta));

        if !self.loaded {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            frame.render_widget(Spinner::new("Loading projects...").tick(tick), inner);
            return;
        }

        if self.projects.is_empty() {
            let text = vec![
                Line::from(""),
                Line::from(Span::styled("No Projects Yet", Style::default().bold())),
                Line::from(""),
                Line::from(Span::styled(
                    "Create your first project to start organizing your tasks",
                    Style::default().fg(Color::Gray),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Press n to create a project",
                    Style::default().fg(Color::Yellow),
                )),
            ];
            let paragraph = Paragraph::new(text)
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
            return;
        }

        let items: Vec<ListItem> = self
            .projects
            .iter()
            .map(|p| {
                let mut lines = vec![Line::from(vec![
                    Span::styled(&p.title, Style::default().bold()),
                    Span::styled(
                        format!("  {}", format_date(&p.created_at)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ])];
                if let Some(description) = &p.description {
                    lines.push(Line::from(Span::styled(
                        format!("  {description}"),
                        Style::default().fg(Color::Gray),
                    )));
                }
                ListItem::new(lines)
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Magenta)
                    .bold(),
            )
            .highlight_symbol("> ");

        let mut state = self.list_state.clone();
        frame.render_stateful_widget(list, area, &mut state);
    }
}
