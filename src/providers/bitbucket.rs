use failure::{Error, ResultExt};
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use serde_json::{self, Value};

use super::{ssh_clone_url, Provider, ProviderKind};
use crate::config::{ProviderSettings, WorkspaceIdentity};
use crate::utils::{Auth, Page, Paginated};

/// The largest page size Bitbucket Cloud allows.
const PAGE_LENGTH: usize = 100;

/// Lists the repositories in a Bitbucket Cloud workspace.
#[derive(Debug, Clone)]
pub struct Bitbucket {
    id: WorkspaceIdentity,
    api_root: String,
    ssh_host: String,
    client: Client,
}

impl Bitbucket {
    pub fn new(id: WorkspaceIdentity, settings: &ProviderSettings) -> Bitbucket {
        Bitbucket {
            id,
            api_root: settings.api_root.trim_end_matches('/').to_string(),
            ssh_host: settings.ssh_host.clone(),
            client: Client::new(),
        }
    }

    fn first_page(&self) -> String {
        format!(
            "{}/2.0/repositories/{}?pagelen={}&fields=next,values.slug",
            self.api_root, self.id.workspace, PAGE_LENGTH
        )
    }
}

impl Provider for Bitbucket {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Bitbucket
    }

    fn workspace(&self) -> &str {
        &self.id.workspace
    }

    fn repositories(&self) -> Result<Vec<String>, Error> {
        debug!("Fetching repositories in the {} workspace", self.id.workspace);

        let auth = Auth::Basic {
            username: self.id.username.clone(),
            password: self.id.credential.clone(),
        };
        let pages = Paginated::new(
            self.client.clone(),
            auth,
            HeaderMap::new(),
            &self.first_page(),
            parse_page,
        );

        let slugs = pages.collect::<Result<Vec<String>, Error>>()?;

        if slugs.is_empty() {
            warn!(
                "No repositories are visible in the \"{}\" Bitbucket workspace",
                self.id.workspace
            );
        }
        debug!("{} repos in {}", slugs.len(), self.id.workspace);

        Ok(slugs)
    }

    fn clone_url(&self, repo: &str) -> String {
        ssh_clone_url(&self.ssh_host, &self.id.workspace, repo)
    }
}

fn parse_page(_url: &str, body: Value) -> Result<Page<String>, Error> {
    let page: RawPage = serde_json::from_value(body).context("Unable to deserialize response")?;

    Ok(Page {
        items: page.values.into_iter().map(|r| r.slug).collect(),
        next: page.next,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawPage {
    values: Vec<RawRepo>,
    next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRepo {
    slug: String,
}
