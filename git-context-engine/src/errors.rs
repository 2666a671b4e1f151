//! Errors raised while turning a merge request hook into a pull request record.

use std::fmt;

use thiserror::Error;

pub type GitContextEngineResult<T> = Result<T, GitContextEngineError>;

/// Everything `build_pull_request` can fail with.
///
/// Every variant aborts the delivery that raised it; nothing in this crate
/// retries or recovers a partial result.
#[derive(Debug, Error)]
pub enum GitContextEngineError {
    /// The reconstructed unified diff could not be parsed.
    #[error("malformed diff: {0}")]
    MalformedDiff(#[from] DiffParseError),

    /// One of the aggregated GitLab resources failed to load.
    #[error("failed to fetch {resource}: {cause}")]
    RemoteFetch {
        resource: RemoteResource,
        #[source]
        cause: ProviderError,
    },

    /// `created_at` / `merged_at` missing, unparsable or inverted.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(#[from] TimestampError),

    /// A resource decoded fine but lacks a field the current state needs.
    #[error("{resource} response has no `{field}`")]
    IncompleteResource {
        resource: RemoteResource,
        field: &'static str,
    },

    /// Webhook state outside opened/closed/merged (e.g. `locked`).
    #[error("unsupported merge request state: {0}")]
    UnsupportedState(String),

    /// Single provider call outside the aggregation (e.g. approve).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// GitLab client could not be built.
    #[error(transparent)]
    Config(#[from] GitContextEngineConfigError),
}

impl GitContextEngineError {
    pub(crate) fn fetch(resource: RemoteResource, cause: impl Into<ProviderError>) -> Self {
        GitContextEngineError::RemoteFetch {
            resource,
            cause: cause.into(),
        }
    }
}

/// The five independent GitLab resources behind one merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteResource {
    User,
    Project,
    MergeRequest,
    Changes,
    Approvals,
}

impl RemoteResource {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteResource::User => "user",
            RemoteResource::Project => "project",
            RemoteResource::MergeRequest => "merge_request",
            RemoteResource::Changes => "merge_request_changes",
            RemoteResource::Approvals => "merge_request_approvals",
        }
    }
}

impl fmt::Display for RemoteResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single GitLab HTTP call, classified by status where there is one.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("rate limited")]
    RateLimited,
    /// 5xx
    #[error("server error: status {0}")]
    Server(u16),
    /// Any other non-2xx.
    #[error("http status error: status {0}")]
    HttpStatus(u16),
    /// Deadline exceeded, whether the client's or the per-resource one.
    #[error("timeout")]
    Timeout,
    /// DNS, connect, reset.
    #[error("network error: {0}")]
    Network(String),
    /// Body did not decode into the expected resource.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Why a reconstructed diff was rejected; `line` is 1-based.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffParseError {
    #[error("invalid hunk header: {0}")]
    InvalidHunkHeader(String),

    /// A hunk appeared before the `---`/`+++` pair of its file.
    #[error("line {line}: hunk without file header")]
    HunkWithoutFileHeader { line: usize },

    /// `+++` line without a preceding `---` line.
    #[error("line {line}: target header without source header")]
    TargetWithoutSource { line: usize },

    /// Extended header line (mode, rename, index) outside any file.
    #[error("line {line}: header `{text}` outside a file block")]
    OrphanHeader { line: usize, text: String },

    /// Hunk body shorter than its header announced.
    #[error("line {line}: hunk ended early in {path}, expected {old_left} more old and {new_left} more new lines")]
    HunkTooShort {
        line: usize,
        path: String,
        old_left: u32,
        new_left: u32,
    },

    /// Unrecognized line after the hunks of a file.
    #[error("line {line}: unexpected `{text}`")]
    UnexpectedLine { line: usize, text: String },

    /// Input ended inside a hunk.
    #[error("unexpected end of input in {path}")]
    UnexpectedEof { path: String },
}

/// Timestamp problems found while computing time-to-merge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("`{field}` is missing")]
    Missing { field: &'static str },

    #[error("`{field}` is not a timestamp: {value:?}")]
    Unparsable { field: &'static str, value: String },

    #[error("merged_at {merged_at} precedes created_at {created_at}")]
    Inverted {
        created_at: String,
        merged_at: String,
    },
}

/// Client construction problems.
#[derive(Debug, Error)]
pub enum GitContextEngineConfigError {
    #[error("missing provider token")]
    MissingToken,

    #[error("invalid base api url: {0}")]
    InvalidBaseUrl(String),

    /// HTTP client could not be constructed.
    #[error("http client setup failed: {0}")]
    HttpClient(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ProviderError::Timeout;
        }

        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => ProviderError::Unauthorized,
                403 => ProviderError::Forbidden,
                404 => ProviderError::NotFound,
                429 => ProviderError::RateLimited,
                500..=599 => ProviderError::Server(code),
                _ => ProviderError::HttpStatus(code),
            };
        }

        if e.is_decode() {
            return ProviderError::InvalidResponse(e.to_string());
        }

        ProviderError::Network(e.to_string())
    }
}

impl From<reqwest::Error> for GitContextEngineError {
    fn from(e: reqwest::Error) -> Self {
        GitContextEngineError::Provider(ProviderError::from(e))
    }
}
