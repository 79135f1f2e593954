use failure::{Error, ResultExt};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::{self, Value};

use super::{ssh_clone_url, Provider, ProviderKind};
use crate::config::{ProviderSettings, WorkspaceIdentity};
use crate::utils::{Auth, Page, Paginated};

const PER_PAGE: usize = 100;

/// Lists the repositories belonging to a GitHub organisation.
///
/// GitHub's `orgs/{org}/repos` endpoint is walked with an explicit page
/// counter, stopping at the first empty page.
#[derive(Debug, Clone)]
pub struct GitHub {
    id: WorkspaceIdentity,
    api_root: String,
    ssh_host: String,
    client: Client,
}

impl GitHub {
    pub fn new(id: WorkspaceIdentity, settings: &ProviderSettings) -> GitHub {
        GitHub {
            id,
            api_root: settings.api_root.trim_end_matches('/').to_string(),
            ssh_host: settings.ssh_host.clone(),
            client: Client::new(),
        }
    }
}

impl Provider for GitHub {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    fn workspace(&self) -> &str {
        &self.id.workspace
    }

    fn repositories(&self) -> Result<Vec<String>, Error> {
        debug!("Fetching repositories owned by {}", self.id.workspace);

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        let api_root = self.api_root.clone();
        let org = self.id.workspace.clone();
        let mut page = 1;
        let first = page_url(&api_root, &org, page);

        let pages = Paginated::new(
            self.client.clone(),
            Auth::Token(self.id.credential.clone()),
            headers,
            &first,
            move |_url: &str, body: Value| -> Result<Page<String>, Error> {
                let repos: Vec<RawRepo> =
                    serde_json::from_value(body).context("Unable to deserialize response")?;

                let next = if repos.is_empty() {
                    None
                } else {
                    page += 1;
                    Some(page_url(&api_root, &org, page))
                };

                Ok(Page {
                    items: repos.into_iter().map(|r| r.name).collect(),
                    next,
                })
            },
        );

        let names = pages.collect::<Result<Vec<String>, Error>>()?;

        if names.is_empty() {
            warn!(
                "No repositories are visible in the \"{}\" GitHub organisation",
                self.id.workspace
            );
        }
        debug!("{} repos owned by {}", names.len(), self.id.workspace);

        Ok(names)
    }

    fn clone_url(&self, repo: &str) -> String {
        ssh_clone_url(&self.ssh_host, &self.id.workspace, repo)
    }
}

fn page_url(api_root: &str, org: &str, page: usize) -> String {
    format!(
        "{}/orgs/{}/repos?per_page={}&page={}",
        api_root, org, PER_PAGE, page
    )
}

#[derive(Debug, Clone, Deserialize)]
struct RawRepo {
    name: String,
}
