#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The authorization server rejected the request (HTTP 400/401/500) and
    /// reported a provider error code and description.
    #[error("authorization failed: {error} {description}")]
    AuthResponse { error: String, description: String },

    /// The authorization server answered with a status the OAuth2 flow does
    /// not define. Treated as a protocol violation, never retried.
    #[error("unexpected status {0} from authorization server")]
    UnexpectedStatusCode(u16),

    /// The hosted login page yielded no recognized input field, the page
    /// layout is incompatible with this client.
    #[error("unable to autofill the login form: no recognized input fields")]
    UnrecognizedLoginForm,

    #[error("refresh token is required for user token source")]
    RefreshTokenIsRequired,

    #[error("password is required for the authorization code flow")]
    PasswordRequired,

    #[error("redirect location is missing from the authorization response")]
    MissingRedirectLocation,

    #[error("authorization code is missing from the redirect query")]
    MissingAuthorizationCode,

    #[error("token is invalid or expired")]
    InvalidToken,

    #[error("lock is poisoned")]
    LockPoisoned,

    #[error("user home directory not found")]
    NoHomeDirectoryFound,

    #[error(transparent)]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    UrlError(#[from] url::ParseError),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::LockPoisoned
    }
}
