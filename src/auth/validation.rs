use regex::Regex;

use crate::error::AppError;

/// Input checks shared by the auth flows. Built once and injected into `AuthService`.
#[derive(Clone)]
pub struct Validator {
    email: Regex,
}

impl Validator {
    pub fn new() -> anyhow::Result<Self> {
        let email = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")?;
        Ok(Self { email })
    }

    pub fn is_valid_email(&self, email: &str) -> bool {
        self.email.is_match(email)
    }

    pub fn require(&self, field: &'static str, value: &str) -> Result<(), AppError> {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} is required")));
        }
        Ok(())
    }
}
