//! The errors encountered while listing repositories.

use reqwest::StatusCode;

/// A request to a provider's API didn't succeed.
///
/// Any of these aborts the listing, no partial repository list is returned.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum FailedRequest {
    /// We couldn't talk to the server or understand what it sent back.
    #[fail(display = "Unable to fetch {} ({})", url, msg)]
    Transport { url: String, msg: String },
    /// The credentials were rejected.
    #[fail(display = "Not authorized to access {} ({})", url, status)]
    Unauthorized { status: StatusCode, url: String },
    /// The workspace or organisation doesn't exist (or isn't visible to us).
    #[fail(display = "{} was not found", url)]
    NotFound { url: String },
    /// Any other non-successful status code.
    #[fail(display = "Request to {} failed with {}", url, status)]
    BadStatus { status: StatusCode, url: String },
}

/// The workspace name can't be used to address a single workspace.
#[derive(Debug, Clone, PartialEq, Fail)]
#[fail(display = "{:?} isn't a valid workspace name", workspace)]
pub struct InvalidWorkspace {
    pub workspace: String,
}

impl FailedRequest {
    pub fn from_status(status: StatusCode, url: &str) -> FailedRequest {
        let url = url.to_string();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                FailedRequest::Unauthorized { status, url }
            }
            StatusCode::NOT_FOUND => FailedRequest::NotFound { url },
            _ => FailedRequest::BadStatus { status, url },
        }
    }

    pub fn transport<E: ::std::fmt::Display>(url: &str, err: E) -> FailedRequest {
        FailedRequest::Transport {
            url: url.to_string(),
            msg: err.to_string(),
        }
    }
}
