//! Ad-platform destinations configured per company.

pub mod meta;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use meta::{MetaDestination, MetaDestinationForm};

/// Destination variants, tagged by platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DestinationConfig {
    Meta(MetaDestination),
}

impl DestinationConfig {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            DestinationConfig::Meta(meta) => meta.validate(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            DestinationConfig::Meta(_) => "meta",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DestinationConfig::Meta(_) => MetaDestination::DISPLAY_NAME,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DestinationConfig::Meta(meta) => &meta.name,
        }
    }
}

/// Field-level validation failures, in rule order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new(messages: Vec<String>) -> Self {
        Self(messages)
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDestination {
    pub id: Uuid,
    pub company_id: String,
    pub created_by: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub config: DestinationConfig,
}

/// Destinations keyed by owning company.
#[derive(Default)]
pub struct DestinationRepository {
    by_company: DashMap<String, Vec<StoredDestination>>,
}

impl DestinationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store. Invalid configs are never persisted.
    pub fn create(
        &self,
        company_id: &str,
        created_by: &str,
        config: DestinationConfig,
    ) -> Result<StoredDestination, ValidationErrors> {
        config.validate()?;
        let stored = StoredDestination {
            id: Uuid::new_v4(),
            company_id: company_id.to_string(),
            created_by: created_by.to_string(),
            is_active: true,
            created_at: Utc::now(),
            config,
        };
        self.by_company
            .entry(company_id.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    /// Oldest first.
    pub fn list(&self, company_id: &str) -> Vec<StoredDestination> {
        self.by_company
            .get(company_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(account_id: &str) -> DestinationConfig {
        DestinationConfig::Meta(MetaDestination {
            name: "Launch".into(),
            account_id: account_id.into(),
            campaign_name: "Launch".into(),
            cpm_value: 5.0,
            budget_daily: 10.0,
            budget_total: 100.0,
            regions: vec!["UK".into()],
            start_date: "2026-01-10".into(),
            end_date: String::new(),
            audience_type: String::new(),
            optimize_for: String::new(),
        })
    }

    #[test]
    fn test_tagged_serialization() {
        let json = serde_json::to_value(meta("act_1")).unwrap();
        assert_eq!(json["type"], "meta");
        assert_eq!(json["account_id"], "act_1");
    }

    #[test]
    fn test_create_and_list_per_company() {
        let repo = DestinationRepository::new();
        let stored = repo.create("acme", "u-1", meta("act_1")).unwrap();
        assert!(stored.is_active);
        repo.create("acme", "u-1", meta("act_2")).unwrap();
        repo.create("globex", "u-9", meta("act_3")).unwrap();

        let acme = repo.list("acme");
        assert_eq!(acme.len(), 2);
        assert_eq!(acme[0].id, stored.id);
        assert_eq!(repo.list("globex").len(), 1);
        assert!(repo.list("initech").is_empty());
    }

    #[test]
    fn test_invalid_config_not_stored() {
        let repo = DestinationRepository::new();
        let err = repo.create("acme", "u-1", meta("bad")).unwrap_err();
        assert_eq!(err.messages(), ["Account ID must start with 'act_'"]);
        assert!(repo.list("acme").is_empty());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(meta("act_1").display_name(), "Meta (Facebook/Instagram)");
        assert_eq!(meta("act_1").type_name(), "meta");
    }
}
