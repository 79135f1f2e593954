use failure::{Error, Fail, ResultExt};
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::process::{Command, Output};

/// The version control operations needed to archive a repository.
///
/// Every operation is given explicit paths, nothing relies on the process's
/// current directory.
pub trait Vcs {
    /// Create a bare mirror of `url` (all refs, no working tree) at `dest`.
    fn mirror_clone(&self, url: &str, dest: &Path) -> Result<(), Error>;

    /// Clone `url` into a checked-out working copy at `dest`.
    fn full_clone(&self, url: &str, dest: &Path) -> Result<(), Error>;

    /// Fetch and pull every remote branch into an existing clone.
    fn fetch_all_branches(&self, repo_dir: &Path) -> Result<(), Error>;
}

/// A `Vcs` which shells out to the `git` executable.
#[derive(Debug, Clone, PartialEq)]
pub struct Git {
    program: String,
}

impl Git {
    pub fn new() -> Git {
        Git::with_program("git")
    }

    /// Use a specific `git` binary.
    pub fn with_program<S: Into<String>>(program: S) -> Git {
        Git {
            program: program.into(),
        }
    }

    fn run(&self, cmd: &mut Command, what: &'static str) -> Result<(), Error> {
        trace!("Running {:?}", cmd);

        let output = cmd.output().context("Unable to invoke git")?;
        trace!("Exit Status: {}", output.status);

        if output.status.success() {
            Ok(())
        } else {
            Err(GitFailed::from_output(&output).context(what).into())
        }
    }
}

impl Default for Git {
    fn default() -> Git {
        Git::new()
    }
}

impl Vcs for Git {
    fn mirror_clone(&self, url: &str, dest: &Path) -> Result<(), Error> {
        debug!("Mirroring {} into {}", url, dest.display());

        self.run(
            Command::new(&self.program)
                .arg("clone")
                .arg("--mirror")
                .arg("--quiet")
                .arg(url)
                .arg(dest),
            "Unable to mirror the repository",
        )
    }

    fn full_clone(&self, url: &str, dest: &Path) -> Result<(), Error> {
        debug!("Cloning {} into {}", url, dest.display());

        self.run(
            Command::new(&self.program)
                .arg("clone")
                .arg("--quiet")
                .arg(url)
                .arg(dest),
            "Unable to clone the repository",
        )
    }

    fn fetch_all_branches(&self, repo_dir: &Path) -> Result<(), Error> {
        debug!("Pulling all branches in {}", repo_dir.display());

        self.run(
            Command::new(&self.program)
                .arg("pull")
                .arg("--all")
                .arg("--quiet")
                .current_dir(repo_dir),
            "Unable to pull all branches",
        )
    }
}

/// `git` exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Fail)]
pub struct GitFailed {
    pub code: Option<i32>,
    pub stderr: String,
}

impl GitFailed {
    fn from_output(output: &Output) -> GitFailed {
        GitFailed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

impl Display for GitFailed {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "git exited with return code {}", code)?,
            None => write!(f, "git was killed by a signal")?,
        }

        if !self.stderr.is_empty() {
            write!(f, ": {}", self.stderr)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;

    macro_rules! require_program {
        ($name:expr) => {{
            let exists = ::std::process::Command::new($name)
                .arg("--help")
                .stdout(::std::process::Stdio::null())
                .stderr(::std::process::Stdio::null())
                .status()
                .is_ok();
            if !exists {
                eprintln!("Couldn't find \"{}\"", $name);
                return;
            }
        }};
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(&["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    /// A throwaway upstream repository with a commit on two branches.
    fn upstream(parent: &Path) -> ::std::path::PathBuf {
        let dir = parent.join("upstream");
        ::std::fs::create_dir(&dir).unwrap();

        git(&dir, &["init", "--quiet"]);
        ::std::fs::write(dir.join("README.md"), "# Upstream\n").unwrap();
        git(&dir, &["add", "README.md"]);
        git(&dir, &["commit", "--quiet", "-m", "Initial commit"]);
        git(&dir, &["branch", "feature"]);

        dir
    }

    #[test]
    fn mirror_a_repo() {
        require_program!("git");

        let temp = tempfile::tempdir().unwrap();
        let url = upstream(temp.path());
        let dest = temp.path().join("mirror").join("upstream.git");

        Git::new()
            .mirror_clone(url.to_str().unwrap(), &dest)
            .unwrap();

        assert!(dest.join("HEAD").exists());
        assert!(!dest.join(".git").exists(), "mirrors are bare");
    }

    #[test]
    fn clone_then_pull_all_branches() {
        require_program!("git");

        let temp = tempfile::tempdir().unwrap();
        let url = upstream(temp.path());
        let dest = temp.path().join("working_copy").join("upstream");
        let git = Git::new();

        git.full_clone(url.to_str().unwrap(), &dest).unwrap();
        assert!(dest.join(".git").exists());
        assert!(dest.join("README.md").exists());

        git.fetch_all_branches(&dest).unwrap();
    }

    #[test]
    fn cloning_something_which_isnt_a_repo_fails() {
        require_program!("git");

        let temp = tempfile::tempdir().unwrap();
        let bogus = temp.path().join("not-a-repo");

        let err = Git::new()
            .full_clone(bogus.to_str().unwrap(), &temp.path().join("dest"))
            .unwrap_err();

        assert_eq!(err.to_string(), "Unable to clone the repository");
        let failed = err
            .iter_chain()
            .filter_map(|cause| cause.downcast_ref::<GitFailed>())
            .next()
            .unwrap();
        assert_ne!(failed.code, Some(0));
    }

    #[test]
    fn missing_git_binary() {
        let temp = tempfile::tempdir().unwrap();
        let git = Git::with_program("definitely-not-a-real-git-binary");

        let got = git.mirror_clone("git@example.com:nope/nope.git", temp.path());

        assert!(got.is_err());
    }
}
