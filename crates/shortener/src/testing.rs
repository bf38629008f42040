//! In-memory [`Store`] used by service, gateway, and end-to-end tests.

use std::collections::HashMap;
use std::sync::Mutex;

use shortener_sql::{Error, Store, User};

#[derive(Default)]
pub struct MemoryStore {
    mappings: Mutex<HashMap<String, String>>,
    users: Mutex<Vec<User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn insert_mapping(&self, short_code: &str, long_url: &str) -> Result<(), Error> {
        let mut mappings = self.mappings.lock().unwrap();
        if mappings.contains_key(short_code) {
            return Err(Error::Conflict {
                entity: "short code",
            });
        }
        mappings.insert(short_code.to_string(), long_url.to_string());
        Ok(())
    }

    async fn lookup_long(&self, short_code: &str) -> Result<String, Error> {
        let mappings = self.mappings.lock().unwrap();
        mappings.get(short_code).cloned().ok_or(Error::NotFound)
    }

    async fn insert_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<User, Error> {
        if email.is_empty() {
            return Err(Error::InvalidArgument("email is required".to_string()));
        }
        if last_name.is_empty() {
            return Err(Error::InvalidArgument("last name is required".to_string()));
        }

        let mut users = self.users.lock().unwrap();
        if users.iter().any(|user| user.email == email) {
            return Err(Error::Conflict { entity: "email" });
        }
        let now = chrono::Utc::now();
        let user = User {
            id: users.len() as i64 + 1,
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            api_key: uuid::Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn lookup_user_by_email(&self, email: &str) -> Result<User, Error> {
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|user| user.email == email)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn api_key_valid(&self, api_key: &str) -> Result<bool, Error> {
        let key: uuid::Uuid = api_key
            .parse()
            .map_err(|_| Error::InvalidArgument("malformed api key".to_string()))?;
        let users = self.users.lock().unwrap();
        Ok(users.iter().any(|user| user.api_key == key))
    }
}
