//! CEP lookups.
//!
//! [`PostalLookupClient`] normalizes user input and asks a
//! [`PostalDirectory`] for the matching address. The production directory is
//! [`ViaCepDirectory`].

mod viacep;

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use viacep::{DEFAULT_VIACEP_URL, ViaCepDirectory, parse_response};

/// An 8-digit CEP with all formatting removed.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    pub const DIGITS: usize = 8;

    /// Strips every non-digit; anything other than exactly eight digits is
    /// not a lookup candidate.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = raw
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>();
        (digits.len() == Self::DIGITS).then_some(Self(digits))
    }

    pub fn digits(&self) -> &str {
        &self.0
    }

    /// `00000-000`, the shape the postal-code field expects.
    pub fn formatted(&self) -> String {
        format!("{}-{}", &self.0[..5], &self.0[5..])
    }
}

impl Display for PostalCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PostalAddress {
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("postal directory request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("postal directory answered HTTP {0}")]
    Status(u16),
    #[error("postal directory response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type BoxedLookupFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<PostalAddress>, LookupError>> + Send + 'a>>;

/// A service that resolves a CEP into an address. `Ok(None)` means the code
/// is unknown.
pub trait PostalDirectory: Send + Sync + 'static {
    fn find<'a>(&'a self, code: &'a PostalCode) -> BoxedLookupFuture<'a>;
}

impl<D: PostalDirectory + ?Sized> PostalDirectory for Arc<D> {
    fn find<'a>(&'a self, code: &'a PostalCode) -> BoxedLookupFuture<'a> {
        (**self).find(code)
    }
}

#[derive(Clone)]
pub struct PostalLookupClient {
    directory: Arc<dyn PostalDirectory>,
}

impl PostalLookupClient {
    pub fn new(directory: impl PostalDirectory) -> Self {
        Self {
            directory: Arc::new(directory),
        }
    }

    /// One best-effort lookup: no retries, no caching.
    pub async fn lookup(&self, raw: &str) -> Result<Option<PostalAddress>, LookupError> {
        let Some(code) = PostalCode::parse(raw) else {
            tracing::debug!(input = raw, "postal code incomplete, skipping lookup");
            return Ok(None);
        };
        let found = self.directory.find(&code).await?;
        if found.is_none() {
            tracing::debug!(%code, "postal code not found");
        }
        Ok(found)
    }
}
