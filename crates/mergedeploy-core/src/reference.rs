use std::fmt;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A resolved package reference in `name/version[@user/channel][#revision]` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
    pub user: Option<String>,
    pub channel: Option<String>,
    pub revision: Option<String>,
}

impl PackageRef {
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("package reference must not be empty"));
        }

        let (body, revision) = match trimmed.split_once('#') {
            Some((body, revision)) => (body, Some(revision)),
            None => (trimmed, None),
        };
        let (name_version, user_channel) = match body.split_once('@') {
            Some((name_version, user_channel)) => (name_version, Some(user_channel)),
            None => (body, None),
        };
        let Some((name, version)) = name_version.split_once('/') else {
            return Err(anyhow!(
                "package reference '{trimmed}' must use the name/version form"
            ));
        };

        validate_token("name", name).with_context(|| format!("invalid reference '{trimmed}'"))?;
        validate_token("version", version)
            .with_context(|| format!("invalid reference '{trimmed}'"))?;

        let (user, channel) = match user_channel {
            Some(user_channel) => {
                let Some((user, channel)) = user_channel.split_once('/') else {
                    return Err(anyhow!(
                        "package reference '{trimmed}' must use @user/channel"
                    ));
                };
                validate_token("user", user)
                    .with_context(|| format!("invalid reference '{trimmed}'"))?;
                validate_token("channel", channel)
                    .with_context(|| format!("invalid reference '{trimmed}'"))?;
                (Some(user.to_string()), Some(channel.to_string()))
            }
            None => (None, None),
        };

        if let Some(revision) = revision {
            validate_token("revision", revision)
                .with_context(|| format!("invalid reference '{trimmed}'"))?;
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            user,
            channel,
            revision: revision.map(str::to_string),
        })
    }
}

fn validate_token(field: &str, value: &str) -> anyhow::Result<()> {
    if value.is_empty() {
        return Err(anyhow!("{field} must not be empty"));
    }
    if let Some(invalid) = value
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-' | '+')))
    {
        return Err(anyhow!("{field} '{value}' contains invalid character '{invalid}'"));
    }
    Ok(())
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let (Some(user), Some(channel)) = (&self.user, &self.channel) {
            write!(f, "@{user}/{channel}")?;
        }
        if let Some(revision) = &self.revision {
            write!(f, "#{revision}")?;
        }
        Ok(())
    }
}

impl Serialize for PackageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|err| serde::de::Error::custom(format!("{err:#}")))
    }
}
