use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders};
use taskdeck_core::project::CreateProject;
use taskdeck_core::TaskdeckError;

use super::{cycle, rows};
use crate::components::input::edit_text;
use crate::components::{Button, ButtonVariant, TextInput};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NewProjectField {
    #[default]
    Title,
    Description,
    Create,
    Cancel,
}

impl NewProjectField {
    const ORDER: [NewProjectField; 4] = [
        NewProjectField::Title,
        NewProjectField::Description,
        NewProjectField::Create,
        NewProjectField::Cancel,
    ];

    pub fn next(self) -> Self {
        cycle(&Self::ORDER, self, true)
    }

    pub fn prev(self) -> Self {
        cycle(&Self::ORDER, self, false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewProjectScreen {
    pub title: String,
    pub description: String,
    pub field: NewProjectField,
}

impl NewProjectScreen {
    pub fn input(&self, user_id: &str) -> Result<CreateProject, TaskdeckError> {
        CreateProject::new(user_id, &self.title, &self.description)
    }

    pub fn edit(&mut self, key: KeyEvent) -> bool {
        match self.field {
            NewProjectField::Title => edit_text(&mut self.title, key),
            NewProjectField::Description => edit_text(&mut self.description, key),
            _ => false,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" New Project ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let r = rows(inner, &[3, 3, 1, 1, 1, 1]);
        frame.render_widget(
            TextInput::new("Project Title *", &self.title)
                .placeholder("Enter project title")
                .focused(self.field == NewProjectField::Title),
            r[0],
        );
        frame.render_widget(
            TextInput::new("Description", &self.description)
                .placeholder("Enter project description (optional)")
                .focused(self.field == NewProjectField::Description),
            r[1],
        );
        frame.render_widget(
            Button::new("Create Project").focused(self.field == NewProjectField::Create),
            r[3],
        );
        frame.render_widget(
            Button::new("Cancel")
                .variant(ButtonVariant::Secondary)
                .focused(self.field == NewProjectField::Cancel),
            r[5],
        );
    }
}
