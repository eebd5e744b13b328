use std::time::Duration;

/// Core error type for the cloner.
///
/// Adapter crates map their platform errors into this type so the governor can
/// tell rate-limit signals and transient protocol failures apart from the rest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// The platform asked us to pause before issuing more requests.
    #[error("rate limited: retry after {}s", .wait.as_secs())]
    RateLimited { wait: Duration },

    /// Transient protocol-level failure (malformed message sequence number,
    /// dropped connection). Safe to retry the same request.
    #[error("transient protocol error: {0}")]
    Transient(String),

    #[error("external error: {0}")]
    External(String),
}

#[cfg(test)]
impl Error {
    pub fn rate_limit_wait(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { wait } => Some(*wait),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
