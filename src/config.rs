use sec::Secret;
use std::path::PathBuf;

use crate::errors::InvalidWorkspace;
use crate::providers::ProviderKind;

#[derive(Debug, Clone)]
pub struct Config {
    pub general: General,
    pub bitbucket: ProviderSettings,
    pub github: ProviderSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct General {
    /// The directory each `{workspace}_{provider}` archive is created in.
    pub root: PathBuf,
    /// The Bitbucket workspace and GitHub organisation name.
    pub workspace: String,
}

/// Everything needed to talk to a single provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub username: String,
    pub credential: Secret<String>,
    /// Base URL for the REST API, without a trailing slash.
    pub api_root: String,
    /// The host used in `git@{host}:...` clone URLs.
    pub ssh_host: String,
}

impl ProviderSettings {
    /// Settings pointing at the provider's public API.
    pub fn new<S: Into<String>>(
        kind: ProviderKind,
        username: S,
        credential: Secret<String>,
    ) -> ProviderSettings {
        ProviderSettings {
            username: username.into(),
            credential,
            api_root: kind.default_api_root().to_string(),
            ssh_host: kind.default_ssh_host().to_string(),
        }
    }
}

/// Who we are and which workspace we're archiving on a particular provider.
#[derive(Debug, Clone)]
pub struct WorkspaceIdentity {
    pub provider: ProviderKind,
    pub workspace: String,
    pub username: String,
    pub credential: Secret<String>,
}

/// Make sure a workspace name can only ever address that one workspace.
///
/// An empty name would turn Bitbucket's workspace listing into the global
/// listing of public repositories, and a `/` would address some other
/// endpoint entirely.
pub fn validate_workspace(workspace: &str) -> Result<(), InvalidWorkspace> {
    let trimmed = workspace.trim();

    if trimmed.is_empty() || trimmed != workspace || workspace.contains('/') {
        Err(InvalidWorkspace {
            workspace: workspace.to_string(),
        })
    } else {
        Ok(())
    }
}

impl Config {
    /// Check the config before anything touches the network.
    pub fn validate(&self) -> Result<(), InvalidWorkspace> {
        validate_workspace(&self.general.workspace)
    }

    pub fn settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Bitbucket => &self.bitbucket,
            ProviderKind::GitHub => &self.github,
        }
    }

    /// One identity per supported provider, in the order they get archived.
    pub fn identities(&self) -> Vec<WorkspaceIdentity> {
        ProviderKind::all()
            .iter()
            .map(|&kind| {
                let settings = self.settings(kind);

                WorkspaceIdentity {
                    provider: kind,
                    workspace: self.general.workspace.clone(),
                    username: settings.username.clone(),
                    credential: settings.credential.clone(),
                }
            })
            .collect()
    }
}
