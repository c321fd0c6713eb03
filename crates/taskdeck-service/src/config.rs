use crate::ServiceError;

/// Where the backend lives and which public key to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    base_url: String,
    anon_key: String,
}

impl BackendConfig {
    /// Accepts the project root URL (`https://xyz.example.co`), with or without a trailing slash.
    pub fn new(url: &str, anon_key: &str) -> Result<Self, ServiceError> {
        let trimmed = url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ServiceError::InvalidInput(
                "backend URL must not be empty".into(),
            ));
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ServiceError::InvalidInput(
                "backend URL must include http:// or https://".into(),
            ));
        }
        Ok(Self {
            base_url: trimmed.to_string(),
            anon_key: anon_key.trim().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn anon_key(&self) -> Option<&str> {
        (!self.anon_key.is_empty()).then_some(self.anon_key.as_str())
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{path}", self.base_url)
    }

    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }
}
