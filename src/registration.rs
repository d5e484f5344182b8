use async_trait::async_trait;

use crate::store::Secret;

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("registration request failed: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("registration rejected: {0}")]
    Rejected(String),
}

/// Serial and secret exactly as issued by the registration authority.
/// The serial may be in any accepted input form.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub serial: String,
    pub secret: Secret,
}

/// Issues new authenticators for a region.
#[async_trait]
pub trait RegistrationService: Send + Sync {
    async fn request_new_credential(&self, region: &str) -> Result<IssuedCredential, RegistrationError>;
}
