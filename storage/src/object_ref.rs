use crate::http::{escape_path, Error, Escape};

/// Marker distinguishing a container name from a plain path in the pair
/// form of [`Reference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTag(pub String);

impl ContainerTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// The shapes a caller may hand in to name an object.
///
/// `ByPath` targets the client's default container. `Pair` is the ordered
/// `(path, container)` form; the [`ContainerTag`] newtype is what tells the
/// second element apart from a path, not string inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    ByPath(String),
    Structured {
        container: Option<String>,
        name: String,
    },
    Pair(String, ContainerTag),
}

impl Reference {
    /// Resolves this reference against the default container.
    ///
    /// One leading `/` is stripped from the path. Fails with
    /// [`Error::InvalidReference`] when no container or no path resolves.
    /// Normalizing an already normalized reference is a no-op.
    pub fn normalize(&self, default_container: &str) -> Result<ObjectRef, Error> {
        let (container, path) = match self {
            Reference::ByPath(path) => (default_container, path.as_str()),
            Reference::Structured { container, name } => (
                container.as_deref().unwrap_or(default_container),
                name.as_str(),
            ),
            Reference::Pair(path, ContainerTag(container)) => (container.as_str(), path.as_str()),
        };

        let path = path.strip_prefix('/').unwrap_or(path);
        if container.is_empty() {
            return Err(Error::InvalidReference("no container resolves".to_string()));
        }
        if path.is_empty() {
            return Err(Error::InvalidReference("empty object path".to_string()));
        }

        Ok(ObjectRef {
            container: container.to_string(),
            path: path.to_string(),
        })
    }
}

impl From<&str> for Reference {
    fn from(path: &str) -> Self {
        Reference::ByPath(path.to_string())
    }
}

impl From<String> for Reference {
    fn from(path: String) -> Self {
        Reference::ByPath(path)
    }
}

impl From<(String, ContainerTag)> for Reference {
    fn from((path, tag): (String, ContainerTag)) -> Self {
        Reference::Pair(path, tag)
    }
}

/// A fully resolved object location. `path` never starts with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub container: String,
    pub path: String,
}

impl ObjectRef {
    /// Absolute request URI under the storage endpoint.
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            endpoint.trim_end_matches('/'),
            self.container.escape(),
            escape_path(&self.path)
        )
    }

    pub fn reference(&self) -> Reference {
        Reference::Structured {
            container: Some(self.container.clone()),
            name: self.path.clone(),
        }
    }
}
