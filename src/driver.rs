use failure::{Error, ResultExt};
use std::io::{self, Write};

use crate::archive::{clone_all, ClonePlan, CloneReport};
use crate::config::Config;
use crate::git::{Git, Vcs};
use crate::providers::{Bitbucket, GitHub, Provider, ProviderKind};

/// Archives every provider in the config, one after the other.
#[derive(Debug, Clone)]
pub struct Driver {
    config: Config,
}

impl Driver {
    pub fn with_config(config: Config) -> Driver {
        Driver { config }
    }

    pub fn run(&self) -> Result<(), Error> {
        self.config.validate()?;

        let providers = get_providers(&self.config);
        let stdout = io::stdout();

        self.run_with(&providers, &Git::new(), &mut stdout.lock(), &mut io::stderr())
    }

    /// If a listing fails after earlier providers already had clone failures,
    /// those failures are written to `summary` before the listing error is
    /// returned.
    fn run_with<V, W, S>(
        &self,
        providers: &[Box<dyn Provider>],
        vcs: &V,
        progress: &mut W,
        summary: &mut S,
    ) -> Result<(), Error>
    where
        V: Vcs + ?Sized,
        W: Write,
        S: Write,
    {
        let mut errors = Vec::new();

        for provider in providers {
            let report = match self.archive(provider.as_ref(), vcs, progress) {
                Ok(report) => report,
                Err(e) => {
                    if !errors.is_empty() {
                        CloneFailure { errors }.display(summary)?;
                    }
                    return Err(e);
                }
            };

            errors.extend(
                report
                    .failed
                    .into_iter()
                    .map(|(repo, err)| (provider.kind(), repo, err)),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CloneFailure { errors }.into())
        }
    }

    fn archive<V, W>(
        &self,
        provider: &dyn Provider,
        vcs: &V,
        progress: &mut W,
    ) -> Result<CloneReport, Error>
    where
        V: Vcs + ?Sized,
        W: Write,
    {
        info!("Fetching repositories from {}", provider.kind());
        let repos = provider
            .repositories()
            .with_context(|_| format!("Unable to fetch repositories from {}", provider.kind()))?;

        info!("Found {} repos from {}", repos.len(), provider.kind());
        writeln!(
            progress,
            "Found {} repositories on {}",
            repos.len(),
            provider.kind()
        )?;

        let plan = ClonePlan::new(
            &self.config.general.root,
            provider.workspace(),
            provider.kind(),
        );
        let report = clone_all(&plan, &repos, |repo| provider.clone_url(repo), vcs, progress)?;

        if report.is_success() {
            writeln!(
                progress,
                "All {} repositories have been cloned successfully.",
                report.total()
            )?;
        } else {
            writeln!(
                progress,
                "Cloned {} of {} repositories.",
                report.cloned.len(),
                report.total()
            )?;
        }

        Ok(report)
    }
}

/// Some repositories couldn't be archived.
#[derive(Debug, Fail)]
#[fail(display = "One or more errors encountered while cloning repos")]
pub struct CloneFailure {
    errors: Vec<(ProviderKind, String, Error)>,
}

impl CloneFailure {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn display<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writeln!(
            writer,
            "There were {} errors cloning repositories",
            self.errors.len()
        )?;

        for &(kind, ref repo, ref err) in &self.errors {
            writeln!(writer, "Error: {} ({}) failed with {}", repo, kind, err)?;
            for cause in err.iter_chain().skip(1) {
                writeln!(writer, "\tCaused By: {}", cause)?;
            }
        }

        Ok(())
    }
}

fn get_providers(cfg: &Config) -> Vec<Box<dyn Provider>> {
    cfg.identities()
        .into_iter()
        .map(|id| -> Box<dyn Provider> {
            let settings = cfg.settings(id.provider);

            match id.provider {
                ProviderKind::Bitbucket => Box::new(Bitbucket::new(id, settings)),
                ProviderKind::GitHub => Box::new(GitHub::new(id, settings)),
            }
        })
        .collect()
}
