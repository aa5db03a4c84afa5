//! Environment identity resolution.
//!
//! A deployment target is identified by a base environment (or the ephemeral
//! `pr` environment), an optional ephemeral id and an optional blue/green slot.
//! Everything in this module is pure: names, namespaces, cluster tiers and
//! protection policies are derived on demand and never stored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors raised while constructing environment values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    #[error("unknown environment '{0}' (expected one of dev, test, staging, prod, pr)")]
    UnknownEnvironment(String),

    #[error("unknown deployment slot '{0}' (expected blue or green)")]
    UnknownSlot(String),

    #[error("ephemeral id must not be empty")]
    EmptyEphemeralId,

    #[error("environment 'pr' requires an ephemeral id")]
    MissingEphemeralId,

    #[error("ephemeral id is only allowed for environment 'pr', not '{0}'")]
    UnexpectedEphemeralId(Environment),

    #[error("deployment slot is only allowed for environment 'prod', not '{0}'")]
    SlotRequiresProd(Environment),

    #[error("'{0}' is not a valid effective environment name")]
    UnknownEnvironmentName(String),
}

/// Long-lived environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseEnvironment {
    Dev,
    Test,
    Staging,
    Prod,
}

impl BaseEnvironment {
    pub const ALL: [BaseEnvironment; 4] = [
        BaseEnvironment::Dev,
        BaseEnvironment::Test,
        BaseEnvironment::Staging,
        BaseEnvironment::Prod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseEnvironment::Dev => "dev",
            BaseEnvironment::Test => "test",
            BaseEnvironment::Staging => "staging",
            BaseEnvironment::Prod => "prod",
        }
    }
}

/// Environment tag: one of the base environments, or the ephemeral `pr`
/// environment used for pull-request previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Environment {
    Base(BaseEnvironment),
    Ephemeral,
}

impl Environment {
    pub const DEV: Environment = Environment::Base(BaseEnvironment::Dev);
    pub const TEST: Environment = Environment::Base(BaseEnvironment::Test);
    pub const STAGING: Environment = Environment::Base(BaseEnvironment::Staging);
    pub const PROD: Environment = Environment::Base(BaseEnvironment::Prod);
    pub const PR: Environment = Environment::Ephemeral;

    /// Tag as written in configuration and environment variables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Base(base) => base.as_str(),
            Environment::Ephemeral => "pr",
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Environment::Ephemeral)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Environment::Base(BaseEnvironment::Prod))
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pr" => Ok(Environment::Ephemeral),
            other => BaseEnvironment::ALL
                .into_iter()
                .find(|base| base.as_str() == other)
                .map(Environment::Base)
                .ok_or_else(|| EnvironmentError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = EnvironmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Environment> for String {
    fn from(value: Environment) -> Self {
        value.as_str().to_string()
    }
}

/// Blue/green production slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentSlot {
    Blue,
    Green,
}

impl DeploymentSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentSlot::Blue => "blue",
            DeploymentSlot::Green => "green",
        }
    }
}

impl fmt::Display for DeploymentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentSlot {
    type Err = EnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blue" => Ok(DeploymentSlot::Blue),
            "green" => Ok(DeploymentSlot::Green),
            other => Err(EnvironmentError::UnknownSlot(other.to_string())),
        }
    }
}

/// Externally supplied identifier of an ephemeral environment (e.g. a PR number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EphemeralId(String);

impl EphemeralId {
    pub fn new(id: impl Into<String>) -> Result<Self, EnvironmentError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EnvironmentError::EmptyEphemeralId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EphemeralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EphemeralId {
    type Error = EnvironmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EphemeralId> for String {
    fn from(value: EphemeralId) -> Self {
        value.0
    }
}

/// Shared infrastructure pool a workload is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterTier {
    Nonprod,
    Prod,
}

impl ClusterTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterTier::Nonprod => "nonprod",
            ClusterTier::Prod => "prod",
        }
    }
}

impl fmt::Display for ClusterTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data-protection settings gated on production class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionPolicy {
    pub purge_protection: bool,
    pub soft_delete_retention_days: u32,
    pub backup_retention_days: u32,
}

/// A fully resolved deployment target identity.
///
/// Construction enforces the environment invariants: an ephemeral id exists
/// exactly for `pr`, and a slot only for `prod`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEnvironment {
    environment: Environment,
    #[serde(skip_serializing_if = "Option::is_none")]
    ephemeral_id: Option<EphemeralId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slot: Option<DeploymentSlot>,
}

impl ResolvedEnvironment {
    pub fn new(
        environment: Environment,
        ephemeral_id: Option<EphemeralId>,
        slot: Option<DeploymentSlot>,
    ) -> Result<Self, EnvironmentError> {
        match (&environment, &ephemeral_id) {
            (Environment::Ephemeral, None) => return Err(EnvironmentError::MissingEphemeralId),
            (Environment::Base(_), Some(_)) => {
                return Err(EnvironmentError::UnexpectedEphemeralId(environment));
            }
            _ => {}
        }
        if slot.is_some() && !environment.is_prod() {
            return Err(EnvironmentError::SlotRequiresProd(environment));
        }
        Ok(Self {
            environment,
            ephemeral_id,
            slot,
        })
    }

    pub fn base(base: BaseEnvironment) -> Self {
        Self {
            environment: Environment::Base(base),
            ephemeral_id: None,
            slot: None,
        }
    }

    pub fn ephemeral(id: EphemeralId) -> Self {
        Self {
            environment: Environment::Ephemeral,
            ephemeral_id: Some(id),
            slot: None,
        }
    }

    pub fn prod_slot(slot: DeploymentSlot) -> Self {
        Self {
            environment: Environment::PROD,
            ephemeral_id: None,
            slot: Some(slot),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn ephemeral_id(&self) -> Option<&EphemeralId> {
        self.ephemeral_id.as_ref()
    }

    pub fn slot(&self) -> Option<DeploymentSlot> {
        self.slot
    }

    pub fn effective_name(&self) -> String {
        effective_environment_name(self.environment, self.ephemeral_id.as_ref(), self.slot)
    }

    pub fn namespace(&self) -> String {
        environment_namespace(self.environment, self.ephemeral_id.as_ref(), self.slot)
    }

    pub fn is_production_class(&self) -> bool {
        is_production_class(self)
    }

    pub fn cluster_tier(&self) -> ClusterTier {
        cluster_tier(self)
    }

    pub fn protection_policy(&self) -> ProtectionPolicy {
        protection_policy(self)
    }
}

impl fmt::Display for ResolvedEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.effective_name())
    }
}

impl FromStr for ResolvedEnvironment {
    type Err = EnvironmentError;

    /// Parse an effective environment name (`staging`, `prod-blue`, `pr-123`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || EnvironmentError::UnknownEnvironmentName(s.to_string());

        if let Some(id) = s.strip_prefix("pr-") {
            let id = EphemeralId::new(id).map_err(|_| unknown())?;
            return Ok(Self::ephemeral(id));
        }
        if let Some(slot) = s.strip_prefix("prod-") {
            let slot = slot.parse::<DeploymentSlot>().map_err(|_| unknown())?;
            return Ok(Self::prod_slot(slot));
        }
        match s.parse::<Environment>() {
            Ok(Environment::Base(base)) => Ok(Self::base(base)),
            _ => Err(unknown()),
        }
    }
}

/// Resolve the identity string used for naming resources.
///
/// `pr` with an id becomes `pr-{id}`; a slot suffix is always applied last.
pub fn effective_environment_name(
    environment: Environment,
    ephemeral_id: Option<&EphemeralId>,
    slot: Option<DeploymentSlot>,
) -> String {
    let mut name = match (environment, ephemeral_id) {
        (Environment::Ephemeral, Some(id)) => format!("pr-{id}"),
        _ => environment.as_str().to_string(),
    };
    if let Some(slot) = slot {
        name.push('-');
        name.push_str(slot.as_str());
    }
    name
}

/// Namespace lookup for a deployment target. Same value as
/// [`effective_environment_name`].
pub fn environment_namespace(
    environment: Environment,
    ephemeral_id: Option<&EphemeralId>,
    slot: Option<DeploymentSlot>,
) -> String {
    effective_environment_name(environment, ephemeral_id, slot)
}

/// True for `prod` and its slot variants.
pub fn is_production_class(target: &ResolvedEnvironment) -> bool {
    match target.environment {
        Environment::Base(BaseEnvironment::Prod) => true,
        Environment::Base(BaseEnvironment::Dev | BaseEnvironment::Test | BaseEnvironment::Staging)
        | Environment::Ephemeral => false,
    }
}

/// Production-class check for collaborators that only hold an effective name.
/// Matches on the name alone, so `prod-*` variants Strata cannot parse still
/// count as production.
pub fn is_production_class_name(name: &str) -> bool {
    name == "prod" || name.starts_with("prod-")
}

pub fn cluster_tier(target: &ResolvedEnvironment) -> ClusterTier {
    if is_production_class(target) {
        ClusterTier::Prod
    } else {
        ClusterTier::Nonprod
    }
}

pub fn protection_policy(target: &ResolvedEnvironment) -> ProtectionPolicy {
    if is_production_class(target) {
        ProtectionPolicy {
            purge_protection: true,
            soft_delete_retention_days: 90,
            backup_retention_days: 35,
        }
    } else {
        ProtectionPolicy {
            purge_protection: false,
            soft_delete_retention_days: 7,
            backup_retention_days: 7,
        }
    }
}
