//! The places repositories can be archived from.

use failure::Error;
use std::fmt::{self, Display, Formatter};

mod bitbucket;
mod github;

pub use self::bitbucket::Bitbucket;
pub use self::github::GitHub;

/// Every provider we know how to talk to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Bitbucket,
    GitHub,
}

impl ProviderKind {
    /// All providers, in the order they get archived.
    pub fn all() -> &'static [ProviderKind] {
        &[ProviderKind::Bitbucket, ProviderKind::GitHub]
    }

    /// The tag used when naming things after this provider (e.g. the
    /// `{workspace}_{tag}` archive directory).
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Bitbucket => "bitbucket",
            ProviderKind::GitHub => "github",
        }
    }

    pub fn default_api_root(self) -> &'static str {
        match self {
            ProviderKind::Bitbucket => "https://api.bitbucket.org",
            ProviderKind::GitHub => "https://api.github.com",
        }
    }

    pub fn default_ssh_host(self) -> &'static str {
        match self {
            ProviderKind::Bitbucket => "bitbucket.com",
            ProviderKind::GitHub => "github.com",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something which can tell us which repositories live in a workspace and
/// how to clone them.
pub trait Provider {
    fn kind(&self) -> ProviderKind;

    /// The workspace (or organisation) being archived.
    fn workspace(&self) -> &str;

    /// Every repository in the workspace, in the order the API returned them.
    ///
    /// Fails on the first unsuccessful request, there are no partial results.
    fn repositories(&self) -> Result<Vec<String>, Error>;

    /// The SSH URL used to clone a repository.
    fn clone_url(&self, repo: &str) -> String;
}

pub(crate) fn ssh_clone_url(host: &str, workspace: &str, repo: &str) -> String {
    format!("git@{}:{}/{}.git", host, workspace, repo)
}
