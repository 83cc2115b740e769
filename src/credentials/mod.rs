use crate::catalog::{AuthError, Credentials};
use dialoguer::{Input, Password};

pub const PASSWORD_ENV: &str = "PRIMBOARD_PASSWORD";

/// Where the run's login comes from.
pub trait CredentialSource: Send + Sync {
    fn credentials(&self) -> Result<Credentials, AuthError>;
}

/// Asks on the terminal; the password is read without echo.
pub struct TerminalPrompt {
    username: Option<String>,
}

impl TerminalPrompt {
    pub fn new(username: Option<String>) -> Self {
        Self { username }
    }
}

impl CredentialSource for TerminalPrompt {
    fn credentials(&self) -> Result<Credentials, AuthError> {
        let username = match &self.username {
            Some(username) => username.clone(),
            None => Input::<String>::new()
                .with_prompt("Username")
                .interact_text()
                .map_err(|e| AuthError::Prompt(e.to_string()))?
                .trim()
                .to_string(),
        };

        let password = Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|_| AuthError::Prompt("an error occurred while reading the password".into()))?;

        Ok(Credentials { username, password })
    }
}

/// Credentials known up front, e.g. `--username` plus `PRIMBOARD_PASSWORD`.
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(Credentials {
            username: username.into(),
            password: password.into(),
        })
    }
}

impl CredentialSource for StaticCredentials {
    fn credentials(&self) -> Result<Credentials, AuthError> {
        Ok(self.0.clone())
    }
}

/// Non-interactive when both a username and the password variable are set,
/// otherwise prompts.
pub fn from_environment(username: Option<String>) -> Box<dyn CredentialSource> {
    match (username, std::env::var(PASSWORD_ENV)) {
        (Some(username), Ok(password)) if !password.is_empty() => {
            Box::new(StaticCredentials::new(username, password))
        }
        (username, _) => Box::new(TerminalPrompt::new(username)),
    }
}
