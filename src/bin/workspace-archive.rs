#[macro_use]
extern crate log;

use chrono::Local;
use env_logger::Builder;
use failure::{Error, ResultExt};
use log::LevelFilter;
use sec::Secret;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use structopt::StructOpt;
use workspace_archive::config::{validate_workspace, General, ProviderSettings};
use workspace_archive::{CloneFailure, Config, Driver, ProviderKind};

fn main() {
    let args = Args::from_args();

    if let Err(e) = run(&args) {
        if let Some(clone_failure) = e.downcast_ref::<CloneFailure>() {
            // individual clone failures don't change the exit code
            let mut stderr = io::stderr();
            clone_failure.display(&mut stderr).ok();
        } else {
            eprintln!("Error: {}", e);

            for cause in e.iter_chain().skip(1) {
                eprintln!("\tCaused By: {}", cause);
            }

            process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    initialize_logging(args)?;
    let cfg = args.config()?;

    if log_enabled!(log::Level::Debug) {
        for line in format!("{:#?}", cfg).lines() {
            debug!("{}", line);
        }
    }

    let driver = Driver::with_config(cfg);

    driver.run()?;

    Ok(())
}

#[derive(Debug, Clone, PartialEq, StructOpt)]
#[structopt(about = "Mirror and clone every repository in a Bitbucket workspace and GitHub organisation.")]
struct Args {
    #[structopt(long = "username", help = "Bitbucket username")]
    username: String,
    #[structopt(long = "app-password", help = "Bitbucket app password for the user")]
    app_password: String,
    #[structopt(long = "token", help = "GitHub personal access token")]
    token: String,
    #[structopt(
        long = "workspace",
        help = "The Bitbucket workspace and GitHub organisation name"
    )]
    workspace: String,
    #[structopt(
        long = "root",
        default_value = ".",
        help = "The directory archives are created in"
    )]
    root: String,
    #[structopt(
        long = "bitbucket-ssh-host",
        help = "Override the host used in Bitbucket clone URLs (defaults to \"bitbucket.com\"; Bitbucket Cloud serves SSH from \"bitbucket.org\", so most users want to set this)"
    )]
    bitbucket_ssh_host: Option<String>,
    #[structopt(
        long = "github-ssh-host",
        help = "Override the host used in GitHub clone URLs"
    )]
    github_ssh_host: Option<String>,
    #[structopt(
        short = "v",
        long = "verbose",
        parse(from_occurrences),
        help = "Verbose output (repeat for more verbosity)"
    )]
    verbosity: u64,
}

impl Args {
    pub fn config(&self) -> Result<Config, Error> {
        validate_workspace(&self.workspace)?;
        let root = shellexpand::full(&self.root).context("Unable to expand the root directory")?;

        let mut bitbucket = ProviderSettings::new(
            ProviderKind::Bitbucket,
            self.username.clone(),
            Secret::new(self.app_password.clone()),
        );
        if let Some(ref host) = self.bitbucket_ssh_host {
            bitbucket.ssh_host = host.clone();
        }

        let mut github = ProviderSettings::new(
            ProviderKind::GitHub,
            self.username.clone(),
            Secret::new(self.token.clone()),
        );
        if let Some(ref host) = self.github_ssh_host {
            github.ssh_host = host.clone();
        }

        Ok(Config {
            general: General {
                root: PathBuf::from(&*root),
                workspace: self.workspace.clone(),
            },
            bitbucket,
            github,
        })
    }
}

fn initialize_logging(args: &Args) -> Result<(), Error> {
    let mut builder = Builder::new();

    let level = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    builder.filter(Some("workspace_archive"), level);

    if let Ok(filter) = env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    }

    builder.format(|out, record| {
        writeln!(
            out,
            "{} [{:5}] ({}): {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            source_location(record.target(), record.line()),
            record.args()
        )
    });

    builder.try_init()?;

    Ok(())
}

/// Where a log line came from, e.g. `workspace_archive::git#42`.
fn source_location(target: &str, line: Option<u32>) -> String {
    match line {
        Some(line) => format!("{}#{}", target, line),
        None => target.to_string(),
    }
}
