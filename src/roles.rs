use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What an absent role resolves to when looking up relevance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleDefaultPolicy {
    /// Roles without an entry never count toward capacity.
    #[default]
    NotRelevant,
    /// Roles without an entry count only when they are `Developer` or `Tester`.
    LegacyDeveloperTester,
}

impl RoleDefaultPolicy {
    pub const LEGACY_RELEVANT_ROLES: [&'static str; 2] = ["Developer", "Tester"];

    pub fn default_for(&self, role: &str) -> bool {
        match self {
            RoleDefaultPolicy::NotRelevant => false,
            RoleDefaultPolicy::LegacyDeveloperTester => {
                Self::LEGACY_RELEVANT_ROLES.contains(&role)
            }
        }
    }
}

/// Which roles' available time counts toward team capacity for one team and PI.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleRelevanceMap {
    entries: BTreeMap<String, bool>,
    #[serde(default)]
    default_policy: RoleDefaultPolicy,
}

impl RoleRelevanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_policy(mut self, policy: RoleDefaultPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(role, relevant)| (role.into(), relevant))
                .collect(),
            default_policy: RoleDefaultPolicy::default(),
        }
    }

    pub fn set(&mut self, role: impl Into<String>, relevant: bool) {
        self.entries.insert(role.into(), relevant);
    }

    pub fn remove(&mut self, role: &str) -> Option<bool> {
        self.entries.remove(role)
    }

    pub fn get(&self, role: &str) -> Option<bool> {
        self.entries.get(role).copied()
    }

    pub fn is_relevant(&self, role: &str) -> bool {
        self.get(role)
            .unwrap_or_else(|| self.default_policy.default_for(role))
    }

    pub fn default_policy(&self) -> RoleDefaultPolicy {
        self.default_policy
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(role, relevant)| (role.as_str(), *relevant))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
