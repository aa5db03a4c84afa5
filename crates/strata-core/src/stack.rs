//! Stack references, configuration maps and stack outputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::environment::ResolvedEnvironment;
use crate::keys;

/// A stage in the fixed deployment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Platform,
    Services,
    Application,
}

impl Layer {
    /// Apply order.
    pub const ORDER: [Layer; 3] = [Layer::Platform, Layer::Services, Layer::Application];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Platform => "platform",
            Layer::Services => "services",
            Layer::Application => "application",
        }
    }

    /// Role segment used in stack identifiers.
    pub fn role(&self) -> &'static str {
        match self {
            Layer::Platform => "platform",
            Layer::Services => "services",
            Layer::Application => "app",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one stack in the external engine.
///
/// Names are `{role}-{effectiveEnvironmentName}-{location}` for shared layers
/// and `app-{tenantId}-{effectiveEnvironmentName}-{location}` for tenant stacks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StackRef {
    layer: Layer,
    name: String,
}

impl StackRef {
    pub fn shared(layer: Layer, target: &ResolvedEnvironment, location: &str) -> Self {
        Self {
            layer,
            name: format!("{}-{}-{}", layer.role(), target.effective_name(), location),
        }
    }

    pub fn tenant(tenant_id: &str, target: &ResolvedEnvironment, location: &str) -> Self {
        Self {
            layer: Layer::Application,
            name: format!(
                "{}-{}-{}-{}",
                Layer::Application.role(),
                tenant_id,
                target.effective_name(),
                location
            ),
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for StackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A single stack setting.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValue {
    pub value: String,
    #[serde(default)]
    pub secret: bool,
}

impl ConfigValue {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: false,
        }
    }

    pub fn secret(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: true,
        }
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.secret {
            f.write_str("ConfigValue(<redacted>)")
        } else {
            write!(f, "ConfigValue({:?})", self.value)
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.secret {
            f.write_str("[secret]")
        } else {
            f.write_str(&self.value)
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::plain(value)
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::plain(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::plain(value.to_string())
    }
}

impl From<u32> for ConfigValue {
    fn from(value: u32) -> Self {
        Self::plain(value.to_string())
    }
}

/// Ordered key → value settings written into a stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap(BTreeMap<String, ConfigValue>);

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn insert_secret(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), ConfigValue::secret(value));
    }

    /// Write an upstream output under the reserved `upstream:` prefix.
    pub fn insert_upstream(&mut self, output_key: &str, value: &serde_json::Value) {
        self.0
            .insert(keys::upstream(output_key), ConfigValue::plain(render_output(value)));
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    /// Plain value of a key (secrets included).
    pub fn value(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extend(&mut self, other: ConfigMap) {
        self.0.extend(other.0);
    }
}

impl<'a> IntoIterator for &'a ConfigMap {
    type Item = (&'a String, &'a ConfigValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outputs reported by the engine after a successful apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackOutputs(BTreeMap<String, serde_json::Value>);

impl StackOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, serde_json::Value>> for StackOutputs {
    fn from(map: BTreeMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, serde_json::Value)> for StackOutputs {
    fn from_iter<I: IntoIterator<Item = (K, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Render an output value as a configuration string. Strings are written
/// verbatim, everything else as compact JSON.
pub fn render_output(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Per-operation resource counts reported by a preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSummary(BTreeMap<String, u64>);

impl ChangeSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, operation: impl Into<String>, count: u64) {
        *self.0.entry(operation.into()).or_insert(0) += count;
    }

    pub fn count(&self, operation: &str) -> u64 {
        self.0.get(operation).copied().unwrap_or(0)
    }

    /// Number of resources the apply would touch (everything except `same`).
    pub fn total_changes(&self) -> u64 {
        self.0
            .iter()
            .filter(|(op, _)| op.as_str() != "same")
            .map(|(_, n)| n)
            .sum()
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no changes");
        }
        let parts: Vec<String> = self.0.iter().map(|(op, n)| format!("{op}={n}")).collect();
        f.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{BaseEnvironment, DeploymentSlot, EphemeralId};
    use serde_json::json;

    #[test]
    fn test_shared_stack_names() {
        let prod_blue = ResolvedEnvironment::prod_slot(DeploymentSlot::Blue);
        assert_eq!(
            StackRef::shared(Layer::Platform, &prod_blue, "eastus").name(),
            "platform-prod-blue-eastus"
        );

        let staging = ResolvedEnvironment::base(BaseEnvironment::Staging);
        assert_eq!(
            StackRef::shared(Layer::Services, &staging, "westeurope").name(),
            "services-staging-westeurope"
        );
    }

    #[test]
    fn test_tenant_stack_name() {
        let pr = ResolvedEnvironment::ephemeral(EphemeralId::new("123").unwrap());
        let stack = StackRef::tenant("acme", &pr, "eastus");
        assert_eq!(stack.name(), "app-acme-pr-123-eastus");
        assert_eq!(stack.layer(), Layer::Application);
    }

    #[test]
    fn test_upstream_values_are_prefixed_and_rendered() {
        let mut config = ConfigMap::new();
        config.insert_upstream("clusterName", &json!("aks-dev"));
        config.insert_upstream("nodeCount", &json!(3));
        config.insert_upstream("zones", &json!(["1", "2"]));

        assert_eq!(config.value("upstream:clusterName"), Some("aks-dev"));
        assert_eq!(config.value("upstream:nodeCount"), Some("3"));
        assert_eq!(config.value("upstream:zones"), Some("[\"1\",\"2\"]"));
    }

    #[test]
    fn test_secret_values_are_redacted_in_debug_and_display() {
        let value = ConfigValue::secret("hunter2");
        assert!(!format!("{value:?}").contains("hunter2"));
        assert_eq!(value.to_string(), "[secret]");
    }

    #[test]
    fn test_change_summary_totals_skip_same() {
        let mut summary = ChangeSummary::new();
        summary.record("create", 2);
        summary.record("same", 10);
        summary.record("update", 1);
        assert_eq!(summary.total_changes(), 3);
        assert!(summary.has_changes());
        assert_eq!(summary.to_string(), "create=2, same=10, update=1");
        assert_eq!(ChangeSummary::new().to_string(), "no changes");
    }

    #[test]
    fn test_stack_outputs_lookup() {
        let outputs: StackOutputs = [
            ("resourceGroupName", json!("rg-dev")),
            ("nodeCount", json!(3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(outputs.get_str("resourceGroupName"), Some("rg-dev"));
        assert_eq!(outputs.get_str("nodeCount"), None);
        assert_eq!(outputs.len(), 2);
    }
}
