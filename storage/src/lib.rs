//! # hubic-storage
//!
//! hubiC object storage client library.
//!
//! hubiC exposes an OpenStack-Swift-compatible object store. The storage
//! endpoint URL and the `X-Auth-Token` scoped to it are not static: they are
//! fetched from the account API (`/1.0/account/credentials`) with an OAuth2
//! access token and expire periodically. This crate resolves and caches that
//! credential, normalizes object references, and runs the Swift data plane
//! (HEAD/GET/PUT/DELETE/COPY, container and object listing) with streaming
//! I/O and a bounded retry policy.
//!
//! ```
//! use hubic_storage::client::{Client, ClientConfig};
//! use hubic_storage::http::objects::upload::UploadSource;
//! use hubic_storage::object_ref::Reference;
//!
//! async fn run() {
//!     let auth = hubic_auth::Config::new("app_id", "app_secret", "http://localhost/");
//!     let config = ClientConfig::default()
//!         .with_auth(auth, "user@example.com", Some("secret"), false)
//!         .await
//!         .unwrap();
//!     let client = Client::new(config).unwrap();
//!
//!     let target = Reference::from("photos/cat.jpg");
//!     client
//!         .upload_object(&target, UploadSource::Bytes("meow".into()), "image/jpeg", None)
//!         .await
//!         .unwrap();
//!     let meta = client.head_object(&target, None).await.unwrap();
//!     assert!(meta.is_some());
//! }
//! ```

pub mod client;
pub mod credential;
pub mod http;
pub mod object_ref;
pub mod ops;
