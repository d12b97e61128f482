mod conf;
mod graph;
mod reference;

pub use conf::{Conf, DEPLOYER_SYMLINKS_CONF};
pub use graph::{DependencyContext, DependencyGraph, DependencyRecord, DeployFolders, RootProject};
pub use reference::PackageRef;
