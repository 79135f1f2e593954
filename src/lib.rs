//! Archive every repository in a Bitbucket workspace and a GitHub
//! organisation, keeping both a bare mirror and a working copy of each.

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod archive;
pub mod config;
pub mod errors;
pub mod git;
pub mod providers;

mod driver;
mod utils;

pub use crate::archive::{clone_all, ClonePlan, CloneReport};
pub use crate::config::{Config, WorkspaceIdentity};
pub use crate::driver::{CloneFailure, Driver};
pub use crate::git::{Git, Vcs};
pub use crate::providers::{Provider, ProviderKind};
