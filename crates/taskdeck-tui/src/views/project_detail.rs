use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use taskdeck_core::project::Project;
use taskdeck_core::task::{insert_newest, patch_completed, CreateTask, Task, TaskProgress, UpdateTask};
use taskdeck_service::ServiceError;

use super::{format_date, rows};
use crate::components::input::edit_text;
use crate::components::{Button, Spinner, TextInput};
use crate::context::AppContext;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetailFocus {
    #[default]
    Tasks,
    NewTask,
}

/// One project and its tasks.
///
/// Both mutations follow the same rule: local state changes only after the
/// backend confirms, then the task list is re-queried. A failed re-query keeps
/// the patched list and marks the view stale.
#[derive(Debug)]
pub struct ProjectDetailView {
    project_id: String,
    project: Option<Project>,
    tasks: Vec<Task>,
    list_state: ListState,
    pub new_title: String,
    pub focus: DetailFocus,
    stale: bool,
}

impl ProjectDetailView {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project: None,
            tasks: Vec::new(),
            list_state: ListState::default(),
            new_title: String::new(),
            focus: DetailFocus::default(),
            stale: false,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn progress(&self) -> TaskProgress {
        TaskProgress::of(&self.tasks)
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    fn add_button(&self) -> Button<'static> {
        Button::new("Add").disabled(self.new_title.trim().is_empty())
    }

    /// The add button is live only for a non-blank title.
    pub fn can_add(&self) -> bool {
        self.add_button().press()
    }

    /// Fetch the project (scoped to the caller), then its tasks. Also the
    /// manual refresh, so a successful call clears the stale marker.
    pub fn load(&mut self, ctx: &AppContext) -> Result<(), ServiceError> {
        let session = ctx.require_session()?;
        let project = ctx.service.get_project(session, &self.project_id)?;
        let tasks = ctx.service.list_tasks(session, &self.project_id)?;
        self.project = Some(project);
        self.apply_reload(Ok(tasks));
        Ok(())
    }

    /// Returns `Ok(false)` without contacting the backend when the add button is disabled.
    pub fn add_task(&mut self, ctx: &AppContext) -> Result<bool, ServiceError> {
        if !self.can_add() {
            return Ok(false);
        }
        let input = CreateTask::new(&self.project_id, &self.new_title)?;
        let session = ctx.require_session()?;
        let task = ctx.service.create_task(session, &input)?;

        tracing::info!(task_id = %task.id, "task added");
        self.apply_added(task);
        self.reconcile(ctx);
        Ok(true)
    }

    /// Flip the highlighted task's completion. Returns `Ok(false)` when nothing is selected.
    pub fn toggle_selected(&mut self, ctx: &AppContext) -> Result<bool, ServiceError> {
        let Some(task) = self.selected() else {
            return Ok(false);
        };
        let (id, completed) = (task.id.clone(), !task.completed);
        let session = ctx.require_session()?;
        let updated = ctx
            .service
            .update_task(session, &id, &UpdateTask::completed(completed))?;

        self.apply_toggled(&updated);
        self.reconcile(ctx);
        Ok(true)
    }

    fn apply_added(&mut self, task: Task) {
        insert_newest(&mut self.tasks, task);
        self.list_state.select(Some(0));
        self.new_title.clear();
    }

    fn apply_toggled(&mut self, updated: &Task) {
        patch_completed(&mut self.tasks, &updated.id, updated.completed);
    }

    pub fn selected(&self) -> Option<&Task> {
        self.tasks.get(self.list_state.selected()?)
    }

    pub fn select_task_by_id(&mut self, task_id: &str) -> bool {
        match self.tasks.iter().position(|t| t.id == task_id) {
            Some(idx) => {
                self.list_state.select(Some(idx));
                true
            }
            None => false,
        }
    }

    /// Typing and list navigation. Actions that reach the backend are the app's.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.focus == DetailFocus::NewTask {
            edit_text(&mut self.new_title, key);
            return;
        }
        let len = self.tasks.len();
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
            KeyCode::Char('g') => self.list_state.select(Some(0)),
            KeyCode::Char('G') => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    /// Re-query the task list after a confirmed mutation.
    fn reconcile(&mut self, ctx: &AppContext) {
        let reloaded = ctx
            .require_session()
            .and_then(|session| ctx.service.list_tasks(session, &self.project_id));
        self.apply_reload(reloaded);
    }

    /// A failed reload keeps the list as it is and marks it stale.
    fn apply_reload(&mut self, reloaded: Result<Vec<Task>, ServiceError>) {
        match reloaded {
            Ok(tasks) => {
                self.replace_tasks(tasks);
                self.stale = false;
            }
            Err(e) => {
                tracing::warn!(project_id = %self.project_id, "task list reload failed: {e}");
                self.stale = true;
            }
        }
    }

    fn replace_tasks(&mut self, tasks: Vec<Task>) {
        let selected_id = self.selected().map(|t| t.id.clone());
        self.tasks = tasks;
        let restored = selected_id.is_some_and(|id| self.select_task_by_id(&id));
        if !restored {
            self.list_state
                .select(if self.tasks.is_empty() { None } else { Some(0) });
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, tick: usize) {
        let Some(project) = &self.project else {
            frame.render_widget(Spinner::new("Loading project...").tick(tick), area);
            return;
        };

        let description_height = if project.description.is_some() { 2 } else { 0 };
        let r = rows(area, &[2, description_height, 3, 1, area.height]);

        let mut subtitle = vec![Span::styled(
            format!("{} tasks completed", self.progress()),
            Style::default().fg(Color::Gray),
        )];
        if self.stale {
            subtitle.push(Span::styled(
                "  (out of date, press r to refresh)",
                Style::default().fg(Color::Yellow),
            ));
        }
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(&project.title, Style::default().bold())),
                Line::from(subtitle),
            ]),
            r[0],
        );
        if let Some(description) = &project.description {
            frame.render_widget(
                Paragraph::new(description.as_str())
                    .style(Style::default().fg(Color::Gray))
                    .wrap(Wrap { trim: true }),
                r[1],
            );
        }

        let input_row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(10)])
            .split(r[2]);
        let typing = self.focus == DetailFocus::NewTask;
        frame.render_widget(
            TextInput::new("New task", &self.new_title)
                .placeholder("Add a new task...")
                .focused(typing),
            input_row[0],
        );
        let button_area = Rect {
            y: input_row[1].y + 1,
            height: 1,
            ..input_row[1]
        };
        frame.render_widget(self.add_button().focused(typing), button_area);

        self.render_tasks(frame, r[4]);
    }

    fn render_tasks(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Tasks ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if self.focus == DetailFocus::Tasks {
                Color::Magenta
            } else {
                Color::DarkGray
            }));

        if self.tasks.is_empty() {
            let text = vec![
                Line::from(""),
                Line::from(Span::styled("No Tasks Yet", Style::default().bold())),
                Line::from(Span::styled(
                    "Add your first task to get started",
                    Style::default().fg(Color::Gray),
                )),
            ];
            frame.render_widget(
                Paragraph::new(text).block(block).alignment(Alignment::Center),
                area,
            );
            return;
        }

        let items: Vec<ListItem> = self
            .tasks
            .iter()
            .map(|t| {
                let (marker, title_style) = if t.completed {
                    (
                        Span::styled("[x] ", Style::default().fg(Color::Green)),
                        Style::default().fg(Color::DarkGray).crossed_out(),
                    )
                } else {
                    (
                        Span::styled("[ ] ", Style::default().fg(Color::Gray)),
                        Style::default(),
                    )
                };
                ListItem::new(Line::from(vec![
                    marker,
                    Span::styled(&t.title, title_style),
                    Span::styled(
                        format!("  {}", format_date(&t.created_at)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray).bold())
            .highlight_symbol("> ");
        let mut state = self.list_state.clone();
        frame.render_stateful_widget(list, area, &mut state);
    }
}
