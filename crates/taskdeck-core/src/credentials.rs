//! Form checks performed by the login and registration screens before any
//! request is made. The backend may still reject what passes here.

use crate::TaskdeckError;

pub const MIN_PASSWORD_LEN: usize = 6;

const FILL_ALL_FIELDS: &str = "Please fill in all fields";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), TaskdeckError> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(invalid(FILL_ALL_FIELDS));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), TaskdeckError> {
        if self.name.is_empty()
            || self.email.is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(invalid(FILL_ALL_FIELDS));
        }
        if self.password != self.confirm_password {
            return Err(invalid("Passwords do not match"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(invalid("Password must be at least 6 characters"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> TaskdeckError {
    TaskdeckError::InvalidInput(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(password: &str, confirm: &str) -> RegistrationForm {
        RegistrationForm {
            name: "Alice".into(),
            email: "alice@x.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn login_requires_both_fields() {
        let form = LoginForm {
            email: "alice@x.com".into(),
            password: String::new(),
        };
        assert_eq!(form.validate().unwrap_err().message(), FILL_ALL_FIELDS);

        let form = LoginForm {
            email: "alice@x.com".into(),
            password: "secret1".into(),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn registration_requires_every_field() {
        let mut form = registration("secret1", "secret1");
        form.name.clear();
        assert_eq!(form.validate().unwrap_err().message(), FILL_ALL_FIELDS);
    }

    #[test]
    fn registration_password_mismatch() {
        let err = registration("secret1", "secret2").validate().unwrap_err();
        assert_eq!(err.message(), "Passwords do not match");
    }

    #[test]
    fn registration_password_length() {
        let err = registration("abc12", "abc12").validate().unwrap_err();
        assert_eq!(err.message(), "Password must be at least 6 characters");
        assert!(registration("abc123", "abc123").validate().is_ok());
    }
}
