use crate::credentials::{CredentialResult, CredentialStore, validate_key, validate_owner};
use dashmap::DashMap;

/// In-process store; keys are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    keys: DashMap<String, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, owner: &str) -> CredentialResult<Option<String>> {
        let owner = validate_owner(owner)?;
        Ok(self.keys.get(owner).map(|entry| entry.value().clone()))
    }

    async fn set(&self, owner: &str, api_key: &str) -> CredentialResult<()> {
        let owner = validate_owner(owner)?;
        let api_key = validate_key(api_key)?;
        self.keys.insert(owner.to_string(), api_key.to_string());
        Ok(())
    }

    async fn clear(&self, owner: &str) -> CredentialResult<bool> {
        let owner = validate_owner(owner)?;
        Ok(self.keys.remove(owner).is_some())
    }
}
