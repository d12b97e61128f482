use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mergedeploy_core::Conf;

pub(crate) const HOME_ENV: &str = "MERGEDEPLOY_HOME";
const GLOBAL_CONF_FILE: &str = "global.conf";

/// Conf file first (explicit, else `$MERGEDEPLOY_HOME/global.conf`), then `-c` overrides.
pub(crate) fn load_conf(conf_file: Option<&Path>, overrides: &[String]) -> Result<Conf> {
    let home = std::env::var_os(HOME_ENV).map(PathBuf::from);
    load_conf_with_home(conf_file, overrides, home.as_deref())
}

pub(crate) fn load_conf_with_home(
    conf_file: Option<&Path>,
    overrides: &[String],
    home: Option<&Path>,
) -> Result<Conf> {
    let mut conf = match conf_file {
        Some(path) => Conf::load_file(path)?,
        None => match home.map(|home| home.join(GLOBAL_CONF_FILE)) {
            Some(path) if path.is_file() => Conf::load_file(&path)?,
            _ => Conf::new(),
        },
    };

    for assignment in overrides {
        conf.apply_assignment(assignment)
            .with_context(|| format!("invalid conf override '{assignment}'"))?;
    }
    Ok(conf)
}
