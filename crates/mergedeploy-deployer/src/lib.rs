mod deploy;
mod digest;
mod fs_ops;
mod layout;
mod types;

pub use deploy::{deploy, deploy_merged, deploy_merged_with_progress};
pub use digest::tree_digest;
pub use fs_ops::IGNORED_ENTRY_NAMES;
pub use layout::{MergedDeployLayout, LICENSES_DIR, MERGED_DEPLOY_DIR};
pub use types::{
    DependencyOutcome, DeployEntry, DeployFailure, DeployOptions, DeployReport,
    SYMLINK_PRIVILEGE_GUIDANCE,
};
