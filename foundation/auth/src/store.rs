use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Error;

const STORE_FILE: &str = ".hubic-tokens.json";

/// Persists refresh tokens keyed by user. The OAuth flow itself never
/// persists anything; the provider hands freshly granted tokens to the store.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self, user: &str) -> Result<Option<String>, Error>;
    async fn save(&self, user: &str, refresh_token: &str) -> Result<(), Error>;
}

#[derive(Serialize, Deserialize, Default)]
struct StoredUser {
    refresh_token: String,
}

/// JSON file store at `~/.hubic-tokens.json`, written with owner-only
/// permissions.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new() -> Result<Self, Error> {
        let home = home::home_dir().ok_or(Error::NoHomeDirectoryFound)?;
        Ok(Self {
            path: home.join(STORE_FILE),
        })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> Result<HashMap<String, StoredUser>, Error> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self, user: &str) -> Result<Option<String>, Error> {
        let users = self.read_all().await?;
        Ok(users
            .get(user)
            .map(|u| u.refresh_token.clone())
            .filter(|t| !t.is_empty()))
    }

    async fn save(&self, user: &str, refresh_token: &str) -> Result<(), Error> {
        let mut users = self.read_all().await?;
        users.insert(
            user.to_string(),
            StoredUser {
                refresh_token: refresh_token.to_string(),
            },
        );
        fs::write(&self.path, serde_json::to_vec_pretty(&users)?).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{FileTokenStore, TokenStore};

    #[tokio::test]
    async fn round_trip_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::with_path(dir.path().join("tokens.json"));

        assert!(store.load("a@example.com").await.unwrap().is_none());

        store.save("a@example.com", "rt-a").await.unwrap();
        store.save("b@example.com", "rt-b").await.unwrap();

        assert_eq!(store.load("a@example.com").await.unwrap().as_deref(), Some("rt-a"));
        assert_eq!(store.load("b@example.com").await.unwrap().as_deref(), Some("rt-b"));

        // overwrite keeps other users intact
        store.save("a@example.com", "rt-a2").await.unwrap();
        assert_eq!(store.load("a@example.com").await.unwrap().as_deref(), Some("rt-a2"));
        assert_eq!(store.load("b@example.com").await.unwrap().as_deref(), Some("rt-b"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let store = FileTokenStore::with_path(&path);
        store.save("a@example.com", "rt").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn trait_object_usable() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::with_path(dir.path().join("t.json")));
        store.save("u", "rt").await.unwrap();
        assert_eq!(store.load("u").await.unwrap().as_deref(), Some("rt"));
    }
}
