//! Error types for the GitHub API client.

#[derive(Debug, thiserror::Error)]
pub enum GithubApiError {
    /// The upstream signalled a rate limit; the client already slept past
    /// the advertised reset before returning this.
    #[error("rate limited by GitHub; backed off {waited_secs}s before aborting this call")]
    RateLimited { waited_secs: u64 },
    #[error("GitHub API returned status {status}")]
    Upstream { status: u16 },
    #[error("request to GitHub failed")]
    Transport(#[from] reqwest::Error),
    #[error("failed to parse GitHub search response")]
    Parse(#[source] anyhow::Error),
}
