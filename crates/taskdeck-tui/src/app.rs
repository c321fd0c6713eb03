use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use taskdeck_core::session::{SessionState, SignUpOutcome};
use taskdeck_service::ServiceError;

use crate::components::{Button, ButtonVariant, Spinner};
use crate::context::AppContext;
use crate::views::{
    DetailFocus, LoginField, LoginScreen, NewProjectField, NewProjectScreen, ProjectDetailView,
    ProjectListView, RegisterField, RegisterScreen,
};

const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

#[derive(Debug)]
pub enum Screen {
    /// Shown while a persisted session is being restored.
    Splash,
    Login(LoginScreen),
    Register(RegisterScreen),
    Projects(ProjectListView),
    NewProject(NewProjectScreen),
    ProjectDetail(ProjectDetailView),
    Profile { confirm_sign_out: bool },
}

impl Screen {
    fn title(&self) -> &'static str {
        match self {
            Screen::Splash => "",
            Screen::Login(_) => "Sign In",
            Screen::Register(_) => "Sign Up",
            Screen::Projects(_) => "Projects",
            Screen::NewProject(_) => "New Project",
            Screen::ProjectDetail(_) => "Project",
            Screen::Profile { .. } => "Profile",
        }
    }
}

/// A blocking message box. Any key dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

enum Nav {
    Stay,
    Push(Screen),
    /// Pop, then re-activate whatever is uncovered.
    Back,
    /// Drop the whole stack.
    Replace(Screen),
}

pub struct App {
    ctx: AppContext,
    nav: Vec<Screen>,
    alerts: VecDeque<Alert>,
    status_message: Option<String>,
    tick: usize,
}

impl App {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            nav: vec![Screen::Splash],
            alerts: VecDeque::new(),
            status_message: None,
            tick: 0,
        }
    }

    pub fn screen(&self) -> &Screen {
        self.nav.last().unwrap_or(&Screen::Splash)
    }

    /// Number of screens on the navigation stack.
    pub fn depth(&self) -> usize {
        self.nav.len()
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alerts.front()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Whether keystrokes are going into a text field (so `q` must not quit).
    pub fn is_input_mode(&self) -> bool {
        match self.screen() {
            Screen::Login(_) | Screen::Register(_) | Screen::NewProject(_) => true,
            Screen::ProjectDetail(view) => view.focus == DetailFocus::NewTask,
            _ => false,
        }
    }

    /// Leave the splash screen: Projects when a session could be restored, Login otherwise.
    pub fn restore_session(&mut self) {
        let signed_in = matches!(self.ctx.restore(), SessionState::SignedIn(_));
        let next = if signed_in {
            Screen::Projects(ProjectListView::new())
        } else {
            Screen::Login(LoginScreen::default())
        };
        self.apply(Nav::Replace(next));
    }

    /// Advance animations.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.status_message = None;

        if self.alerts.pop_front().is_some() {
            return;
        }
        if !self.keep_session_fresh() {
            return;
        }

        let Some(mut screen) = self.nav.pop() else {
            return;
        };
        let nav = match &mut screen {
            Screen::Splash => Nav::Stay,
            Screen::Login(form) => self.handle_login_key(form, key),
            Screen::Register(form) => self.handle_register_key(form, key),
            Screen::Projects(view) => self.handle_projects_key(view, key),
            Screen::NewProject(form) => self.handle_new_project_key(form, key),
            Screen::ProjectDetail(view) => self.handle_detail_key(view, key),
            Screen::Profile { confirm_sign_out } => self.handle_profile_key(confirm_sign_out, key),
        };
        self.nav.push(screen);
        self.apply(nav);
    }

    fn handle_login_key(&mut self, form: &mut LoginScreen, key: KeyEvent) -> Nav {
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.field = form.field.next(),
            KeyCode::BackTab | KeyCode::Up => form.field = form.field.prev(),
            KeyCode::Enter if form.field == LoginField::CreateAccount => {
                return Nav::Push(Screen::Register(RegisterScreen::default()));
            }
            KeyCode::Enter => return self.submit_login(form),
            _ => {
                form.edit(key);
            }
        }
        Nav::Stay
    }

    fn submit_login(&mut self, form: &mut LoginScreen) -> Nav {
        let input = form.form();
        if let Err(e) = input.validate() {
            self.push_alert("Error", e.message());
            return Nav::Stay;
        }

        match self.ctx.sign_in(&input.email, &input.password) {
            Ok(()) => Nav::Replace(Screen::Projects(ProjectListView::new())),
            Err(e) => {
                self.show_error(&e);
                Nav::Stay
            }
        }
    }

    fn handle_register_key(&mut self, form: &mut RegisterScreen, key: KeyEvent) -> Nav {
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.field = form.field.next(),
            KeyCode::BackTab | KeyCode::Up => form.field = form.field.prev(),
            KeyCode::Esc => return self.back_to_login(),
            KeyCode::Enter if form.field == RegisterField::SignIn => return self.back_to_login(),
            KeyCode::Enter => return self.submit_registration(form),
            _ => {
                form.edit(key);
            }
        }
        Nav::Stay
    }

    fn back_to_login(&self) -> Nav {
        if self.nav.is_empty() {
            Nav::Replace(Screen::Login(LoginScreen::default()))
        } else {
            Nav::Back
        }
    }

    fn submit_registration(&mut self, form: &mut RegisterScreen) -> Nav {
        let input = form.form();
        if let Err(e) = input.validate() {
            self.push_alert("Error", e.message());
            return Nav::Stay;
        }

        match self.ctx.sign_up(&input.email, &input.password, &input.name) {
            Ok(SignUpOutcome::SignedIn(_)) => {
                self.push_alert("Success", "Account created successfully!");
                Nav::Replace(Screen::Projects(ProjectListView::new()))
            }
            Ok(SignUpOutcome::ConfirmationRequired) => {
                self.push_alert(
                    "Success",
                    "Account created successfully! You can now sign in.",
                );
                Nav::Replace(Screen::Login(LoginScreen {
                    email: input.email,
                    ..Default::default()
                }))
            }
            Err(e) => {
                self.show_error(&e);
                Nav::Stay
            }
        }
    }

    fn handle_projects_key(&mut self, view: &mut ProjectListView, key: KeyEvent) -> Nav {
        match key.code {
            KeyCode::Enter => {
                if let Some(project) = view.selected() {
                    return Nav::Push(Screen::ProjectDetail(ProjectDetailView::new(
                        project.id.clone(),
                    )));
                }
            }
            KeyCode::Char('n') => return Nav::Push(Screen::NewProject(NewProjectScreen::default())),
            KeyCode::Char('p') => {
                return Nav::Push(Screen::Profile {
                    confirm_sign_out: false,
                })
            }
            KeyCode::Char('r') => match view.load(&self.ctx) {
                Ok(()) => self.status_message = Some("Projects refreshed".into()),
                Err(e) => self.show_error(&e),
            },
            _ => view.handle_key(key),
        }
        Nav::Stay
    }

    fn handle_new_project_key(&mut self, form: &mut NewProjectScreen, key: KeyEvent) -> Nav {
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.field = form.field.next(),
            KeyCode::BackTab | KeyCode::Up => form.field = form.field.prev(),
            KeyCode::Esc => return Nav::Back,
            KeyCode::Enter if form.field == NewProjectField::Cancel => return Nav::Back,
            KeyCode::Enter => return self.submit_new_project(form),
            _ => {
                form.edit(key);
            }
        }
        Nav::Stay
    }

    fn submit_new_project(&mut self, form: &NewProjectScreen) -> Nav {
        let created = self.ctx.require_session().and_then(|session| {
            let input = form.input(session.user_id())?;
            self.ctx.service.create_project(session, &input)
        });

        match created {
            Ok(project) => {
                tracing::info!(project_id = %project.id, "project created");
                self.push_alert("Success", "Project created successfully!");
                Nav::Back
            }
            Err(e) => {
                self.show_error(&e);
                Nav::Stay
            }
        }
    }

    fn handle_detail_key(&mut self, view: &mut ProjectDetailView, key: KeyEvent) -> Nav {
        if view.focus == DetailFocus::NewTask {
            match key.code {
                KeyCode::Enter => match view.add_task(&self.ctx) {
                    Ok(true) => self.status_message = Some("Task added".into()),
                    Ok(false) => {}
                    Err(e) => self.show_error(&e),
                },
                KeyCode::Esc | KeyCode::Tab => view.focus = DetailFocus::Tasks,
                _ => view.handle_key(key),
            }
            return Nav::Stay;
        }

        match key.code {
            KeyCode::Tab | KeyCode::Char('a') | KeyCode::Char('n') => {
                view.focus = DetailFocus::NewTask;
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Err(e) = view.toggle_selected(&self.ctx) {
                    self.show_error(&e);
                }
            }
            KeyCode::Char('r') => match view.load(&self.ctx) {
                Ok(()) => self.status_message = Some("Project refreshed".into()),
                Err(e) => {
                    self.show_error(&e);
                    return Nav::Back;
                }
            },
            KeyCode::Esc | KeyCode::Backspace => return Nav::Back,
            _ => view.handle_key(key),
        }
        Nav::Stay
    }

    fn handle_profile_key(&mut self, confirm_sign_out: &mut bool, key: KeyEvent) -> Nav {
        if *confirm_sign_out {
            *confirm_sign_out = false;
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Enter) {
                self.ctx.sign_out();
                self.status_message = Some("Signed out".into());
                return Nav::Replace(Screen::Login(LoginScreen::default()));
            }
            return Nav::Stay;
        }
        match key.code {
            KeyCode::Char('s') | KeyCode::Enter => *confirm_sign_out = true,
            KeyCode::Esc | KeyCode::Backspace => return Nav::Back,
            _ => {}
        }
        Nav::Stay
    }

    fn apply(&mut self, nav: Nav) {
        match nav {
            Nav::Stay => {}
            Nav::Push(screen) => {
                self.nav.push(screen);
                self.activate();
            }
            Nav::Back => {
                if self.nav.len() > 1 {
                    self.nav.pop();
                    self.activate();
                }
            }
            Nav::Replace(screen) => {
                self.nav.clear();
                self.nav.push(screen);
                self.activate();
            }
        }
    }

    /// Run the load that belongs to the screen now on top. A project that
    /// cannot be loaded is left again immediately.
    fn activate(&mut self) {
        if !self.keep_session_fresh() {
            return;
        }
        let Some(mut screen) = self.nav.pop() else {
            return;
        };
        let result = match &mut screen {
            Screen::Projects(view) => view.load(&self.ctx),
            Screen::ProjectDetail(view) => view.load(&self.ctx),
            _ => Ok(()),
        };
        let is_detail = matches!(screen, Screen::ProjectDetail(_));
        self.nav.push(screen);

        if let Err(e) = result {
            self.show_error(&e);
            if is_detail {
                self.apply(Nav::Back);
            }
        }
    }

    /// Renew a lapsed token before anything talks to the backend. A session
    /// that cannot be renewed sends the user back to Login.
    fn keep_session_fresh(&mut self) -> bool {
        if self.ctx.session.session().is_none() || self.ctx.ensure_fresh_session() {
            return true;
        }
        self.push_alert("Error", SESSION_EXPIRED);
        self.apply(Nav::Replace(Screen::Login(LoginScreen::default())));
        false
    }

    fn push_alert(&mut self, title: &str, message: &str) {
        self.alerts.push_back(Alert {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn show_error(&mut self, e: &ServiceError) {
        tracing::warn!("{e}");
        self.push_alert("Error", e.message());
    }

    // -- Rendering --

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_title_bar(frame, layout[0]);
        let body = layout[1];
        match self.screen() {
            Screen::Splash => frame.render_widget(Spinner::default().tick(self.tick), body),
            Screen::Login(form) => form.render(frame, centered_rect(60, 70, body)),
            Screen::Register(form) => form.render(frame, centered_rect(60, 90, body)),
            Screen::Projects(view) => view.render(frame, body, self.tick),
            Screen::NewProject(form) => form.render(frame, centered_rect(60, 60, body)),
            Screen::ProjectDetail(view) => view.render(frame, body, self.tick),
            Screen::Profile { confirm_sign_out } => {
                self.render_profile(frame, body);
                if *confirm_sign_out {
                    self.render_confirm_sign_out(frame, body);
                }
            }
        }
        self.render_status_bar(frame, layout[2]);

        if let Some(alert) = self.alert() {
            self.render_alert(frame, alert, area);
        }
    }

    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            " taskdeck ",
            Style::default().bold().fg(Color::Cyan),
        )];
        let title = self.screen().title();
        if !title.is_empty() {
            spans.push(Span::raw("| "));
            spans.push(Span::styled(title, Style::default().fg(Color::Yellow)));
        }
        if let Some(user) = self.ctx.session.identity() {
            spans.push(Span::styled(
                format!("  {}", user.email_or_empty()),
                Style::default().fg(Color::DarkGray),
            ));
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        if let Some(ref msg) = self.status_message {
            let line = Line::from(Span::styled(
                format!(" {msg}"),
                Style::default().fg(Color::Green),
            ));
            frame.render_widget(line, area);
            return;
        }

        let hints = if self.alert().is_some() {
            vec![("any key", "dismiss")]
        } else {
            match self.screen() {
                Screen::Splash => vec![],
                Screen::Login(_) => vec![
                    ("Tab", "next field"),
                    ("Enter", "sign in"),
                    ("Ctrl+C", "quit"),
                ],
                Screen::Register(_) => vec![
                    ("Tab", "next field"),
                    ("Enter", "create"),
                    ("Esc", "back"),
                ],
                Screen::Projects(_) => vec![
                    ("q", "quit"),
                    ("j/k", "nav"),
                    ("Enter", "open"),
                    ("n", "new"),
                    ("r", "refresh"),
                    ("p", "profile"),
                ],
                Screen::NewProject(_) => vec![
                    ("Tab", "next field"),
                    ("Enter", "confirm"),
                    ("Esc", "cancel"),
                ],
                Screen::ProjectDetail(view) if view.focus == DetailFocus::NewTask => {
                    vec![("Enter", "add"), ("Esc", "tasks")]
                }
                Screen::ProjectDetail(_) => vec![
                    ("j/k", "nav"),
                    ("Space", "toggle"),
                    ("a", "add task"),
                    ("r", "refresh"),
                    ("Esc", "back"),
                ],
                Screen::Profile {
                    confirm_sign_out: true,
                } => vec![("y", "sign out"), ("any", "cancel")],
                Screen::Profile { .. } => vec![("s", "sign out"), ("Esc", "back")],
            }
        };

        let spans: Vec<Span> = hints
            .into_iter()
            .flat_map(|(key, desc)| {
                vec![
                    Span::styled(
                        format!(" {key}"),
                        Style::default().fg(Color::Yellow).bold(),
                    ),
                    Span::raw(format!(" {desc} ")),
                ]
            })
            .collect();

        frame.render_widget(Line::from(spans), area);
    }

    fn render_profile(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(50, 50, area);
        let block = Block::default()
            .title(" Profile ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let (name, email) = match self.ctx.session.identity() {
            Some(user) => (user.display_name(), user.email_or_empty()),
            None => ("User", ""),
        };
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(name, Style::default().bold())),
            Line::from(Span::styled(email, Style::default().fg(Color::Gray))),
            Line::from(""),
        ];
        let text_height = lines.len() as u16;
        frame.render_widget(
            Paragraph::new(lines).alignment(Alignment::Center),
            inner,
        );

        if inner.height > text_height {
            let button_area = Rect {
                y: inner.y + text_height,
                height: 1,
                ..inner
            };
            frame.render_widget(
                Button::new("Sign Out")
                    .variant(ButtonVariant::Secondary)
                    .focused(true),
                button_area,
            );
        }
    }

    fn render_confirm_sign_out(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(50, 20, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Sign Out ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));

        let text = "Are you sure you want to sign out?\n\n(y)es / (any key) cancel";
        let paragraph = Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: false })
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, popup);
    }

    fn render_alert(&self, frame: &mut Frame, alert: &Alert, area: Rect) {
        let popup = centered_rect(50, 25, area);
        frame.render_widget(Clear, popup);

        let color = if alert.title == "Error" {
            Color::Red
        } else {
            Color::Green
        };
        let block = Block::default()
            .title(format!(" {} ", alert.title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));

        let text = format!("{}\n\n(any key) OK", alert.message);
        let paragraph = Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: false })
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, popup);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
