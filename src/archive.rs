//! Cloning every repository in a workspace into a mirror and a working copy.

use failure::{Error, ResultExt};
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::git::Vcs;
use crate::providers::ProviderKind;

/// Where a workspace's repositories get archived.
///
/// Everything lives under `{root}/{workspace}_{provider}/`, with bare mirrors
/// in `mirror/` and checked out clones in `working_copy/`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClonePlan {
    pub mirror_dir: PathBuf,
    pub working_dir: PathBuf,
}

impl ClonePlan {
    pub fn new<P: AsRef<Path>>(root: P, workspace: &str, provider: ProviderKind) -> ClonePlan {
        let base = root
            .as_ref()
            .join(format!("{}_{}", workspace, provider.name()));

        ClonePlan {
            mirror_dir: base.join("mirror"),
            working_dir: base.join("working_copy"),
        }
    }

    pub fn mirror_path(&self, repo: &str) -> PathBuf {
        self.mirror_dir.join(format!("{}.git", repo))
    }

    pub fn working_copy_path(&self, repo: &str) -> PathBuf {
        self.working_dir.join(repo)
    }

    /// Make sure both the mirror and working copy directories exist.
    pub fn create_dirs(&self) -> Result<(), Error> {
        for dir in &[&self.mirror_dir, &self.working_dir] {
            if !dir.exists() {
                debug!("Creating {}", dir.display());
                fs::create_dir_all(dir).with_context(|_| {
                    format!("Couldn't create the target directory ({})", dir.display())
                })?;
            }
        }

        Ok(())
    }
}

/// What happened to each repository during `clone_all()`.
#[derive(Debug, Default)]
pub struct CloneReport {
    pub cloned: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl CloneReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.cloned.len() + self.failed.len()
    }
}

/// More than one step failed while archiving a single repository.
#[derive(Debug, Fail)]
pub struct StepsFailed {
    pub errors: Vec<Error>,
}

impl Display for StepsFailed {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} steps failed", self.errors.len())?;

        for err in &self.errors {
            write!(f, "; {}", err)?;
            for cause in err.iter_chain().skip(1) {
                write!(f, ": {}", cause)?;
            }
        }

        Ok(())
    }
}

/// Mirror and clone every repository, strictly in the order given.
///
/// Both target directories are created even when `repos` is empty. A
/// repository which fails to mirror, clone, or pull is recorded in the
/// returned `CloneReport` and the loop carries on with the next one. Progress
/// lines are written to `progress`.
///
/// The only errors returned are ones where we can't continue at all (e.g.
/// the target directories couldn't be created).
pub fn clone_all<F, V, W>(
    plan: &ClonePlan,
    repos: &[String],
    clone_url: F,
    vcs: &V,
    progress: &mut W,
) -> Result<CloneReport, Error>
where
    F: Fn(&str) -> String,
    V: Vcs + ?Sized,
    W: Write,
{
    plan.create_dirs()?;

    let total = repos.len();
    let mut report = CloneReport::default();
    writeln!(progress, "Cloning {} repositories...", total)?;

    for (i, repo) in repos.iter().enumerate() {
        let url = clone_url(repo.as_str());

        writeln!(progress, "Mirroring repository {}/{}: {}", i + 1, total, repo)?;
        let mirrored = vcs
            .mirror_clone(&url, &plan.mirror_path(repo))
            .context("`git clone --mirror` failed");

        writeln!(progress, "Cloning repository {}/{}: {}", i + 1, total, repo)?;
        let working_copy = plan.working_copy_path(repo);
        let cloned = vcs
            .full_clone(&url, &working_copy)
            .context("`git clone` failed")
            .and_then(|_| {
                vcs.fetch_all_branches(&working_copy)
                    .context("`git pull --all` failed")
            });

        let mut errors: Vec<Error> = vec![mirrored, cloned]
            .into_iter()
            .filter_map(|r| r.err())
            .map(Error::from)
            .collect();

        let err = match errors.len() {
            0 => {
                report.cloned.push(repo.clone());
                continue;
            }
            1 => errors.remove(0),
            _ => StepsFailed { errors }.into(),
        };

        warn!("Archiving {} failed, {}", repo, err);
        report.failed.push((repo.clone(), err));
    }

    info!(
        "Archived {} of {} repositories into {}",
        report.cloned.len(),
        total,
        plan.mirror_dir.parent().unwrap_or(plan.mirror_dir.as_path()).display()
    );

    Ok(report)
}
