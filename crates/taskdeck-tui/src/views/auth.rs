//! Sign-in and registration forms. Submission lives in the app; these types
//! hold what has been typed and where focus is.

use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use taskdeck_core::credentials::{LoginForm, RegistrationForm};

use super::{cycle, rows};
use crate::components::input::edit_text;
use crate::components::{Button, ButtonVariant, TextInput};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginField {
    #[default]
    Email,
    Password,
    SignIn,
    CreateAccount,
}

impl LoginField {
    const ORDER: [LoginField; 4] = [
        LoginField::Email,
        LoginField::Password,
        LoginField::SignIn,
        LoginField::CreateAccount,
    ];

    pub fn next(self) -> Self {
        cycle(&Self::ORDER, self, true)
    }

    pub fn prev(self) -> Self {
        cycle(&Self::ORDER, self, false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginScreen {
    pub email: String,
    pub password: String,
    pub field: LoginField,
}

impl LoginScreen {
    /// Exactly what was typed; the backend judges the email.
    pub fn form(&self) -> LoginForm {
        LoginForm {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    /// Type into the focused text field, if focus is on one.
    pub fn edit(&mut self, key: KeyEvent) -> bool {
        match self.field {
            LoginField::Email => edit_text(&mut self.email, key),
            LoginField::Password => edit_text(&mut self.password, key),
            _ => false,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Welcome Back ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let r = rows(inner, &[2, 3, 3, 1, 1, 1, 1]);
        frame.render_widget(
            Paragraph::new("Sign in to your account").style(Style::default().fg(Color::Gray)),
            r[0],
        );
        frame.render_widget(
            TextInput::new("Email", &self.email)
                .placeholder("Enter your email")
                .focused(self.field == LoginField::Email),
            r[1],
        );
        frame.render_widget(
            TextInput::new("Password", &self.password)
                .placeholder("Enter your password")
                .masked(true)
                .focused(self.field == LoginField::Password),
            r[2],
        );
        frame.render_widget(
            Button::new("Sign In").focused(self.field == LoginField::SignIn),
            r[4],
        );
        frame.render_widget(
            Button::new("Don't have an account? Sign Up")
                .variant(ButtonVariant::Secondary)
                .focused(self.field == LoginField::CreateAccount),
            r[6],
        );
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegisterField {
    #[default]
    Name,
    Email,
    Password,
    ConfirmPassword,
    Submit,
    SignIn,
}

impl RegisterField {
    const ORDER: [RegisterField; 6] = [
        RegisterField::Name,
        RegisterField::Email,
        RegisterField::Password,
        RegisterField::ConfirmPassword,
        RegisterField::Submit,
        RegisterField::SignIn,
    ];

    pub fn next(self) -> Self {
        cycle(&Self::ORDER, self, true)
    }

    pub fn prev(self) -> Self {
        cycle(&Self::ORDER, self, false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterScreen {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub field: RegisterField,
}

impl RegisterScreen {
    pub fn form(&self) -> RegistrationForm {
        RegistrationForm {
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        }
    }

    pub fn edit(&mut self, key: KeyEvent) -> bool {
        match self.field {
            RegisterField::Name => edit_text(&mut self.name, key),
            RegisterField::Email => edit_text(&mut self.email, key),
            RegisterField::Password => edit_text(&mut self.password, key),
            RegisterField::ConfirmPassword => edit_text(&mut self.confirm_password, key),
            _ => false,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Create Account ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let r = rows(inner, &[2, 3, 3, 3, 3, 1, 1, 1, 1]);
        frame.render_widget(
            Paragraph::new("Sign up to get started").style(Style::default().fg(Color::Gray)),
            r[0],
        );
        let fields = [
            ("Full Name", &self.name, "Enter your full name", RegisterField::Name, false),
            ("Email", &self.email, "Enter your email", RegisterField::Email, false),
            ("Password", &self.password, "Create a password", RegisterField::Password, true),
            (
                "Confirm Password",
                &self.confirm_password,
                "Confirm your password",
                RegisterField::ConfirmPassword,
                true,
            ),
        ];
        for (i, (label, value, placeholder, field, masked)) in fields.into_iter().enumerate() {
            frame.render_widget(
                TextInput::new(label, value)
                    .placeholder(placeholder)
                    .masked(masked)
                    .focused(self.field == field),
                r[i + 1],
            );
        }
        frame.render_widget(
            Button::new("Create Account").focused(self.field == RegisterField::Submit),
            r[6],
        );
        frame.render_widget(
            Button::new("Already have an account? Sign In")
                .variant(ButtonVariant::Secondary)
                .focused(self.field == RegisterField::SignIn),
            r[8],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;

    #[test]
    fn login_focus_wraps() {
        assert_eq!(LoginField::CreateAccount.next(), LoginField::Email);
        assert_eq!(LoginField::Email.prev(), LoginField::CreateAccount);
    }

    #[test]
    fn typing_goes_to_focused_field_only() {
        let mut screen = RegisterScreen::default();
        screen.edit(KeyEvent::from(KeyCode::Char('A')));
        screen.field = RegisterField::Submit;
        assert!(!screen.edit(KeyEvent::from(KeyCode::Char('x'))));
        assert_eq!(screen.name, "A");
        assert!(screen.email.is_empty());
    }

    #[test]
    fn login_form_passes_input_through_untouched() {
        let screen = LoginScreen {
            email: "  alice@x.com ".into(),
            password: " pw ".into(),
            ..Default::default()
        };
        let form = screen.form();
        assert_eq!(form.email, "  alice@x.com ");
        assert_eq!(form.password, " pw ");
    }

    #[test]
    fn whitespace_only_name_counts_as_filled_in() {
        let screen = RegisterScreen {
            name: "  ".into(),
            email: "bob@x.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            ..Default::default()
        };
        assert!(screen.form().validate().is_ok());
        assert!(RegisterScreen::default().form().validate().is_err());
    }
}
