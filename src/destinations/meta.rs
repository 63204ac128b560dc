//! Meta (Facebook/Instagram) ad destination.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{DestinationConfig, ValidationErrors};

pub const VALID_REGIONS: [&str; 5] = ["US", "CA", "UK", "FR", "DE"];

/// Upper bound on CPM, in dollars.
pub const MAX_CPM: f64 = 1000.0;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaDestination {
    pub name: String,
    pub account_id: String,
    pub campaign_name: String,
    pub cpm_value: f64,
    pub budget_daily: f64,
    pub budget_total: f64,
    pub regions: Vec<String>,
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub audience_type: String,
    #[serde(default)]
    pub optimize_for: String,
}

impl MetaDestination {
    pub const DISPLAY_NAME: &'static str = "Meta (Facebook/Instagram)";

    /// Every rule is checked; all failures are reported together.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if self.account_id.is_empty() {
            errors.push("Account ID is required".to_string());
        }
        if !self.account_id.starts_with("act_") {
            errors.push("Account ID must start with 'act_'".to_string());
        }
        if self.campaign_name.trim().is_empty() {
            errors.push("Campaign name is required".to_string());
        }

        if self.cpm_value <= 0.0 {
            errors.push("CPM value must be positive".to_string());
        }
        if self.cpm_value > MAX_CPM {
            errors.push(format!("CPM value seems too high (max: ${MAX_CPM})"));
        }

        if self.budget_daily <= 0.0 {
            errors.push("Daily budget must be positive".to_string());
        }
        if self.budget_total < self.budget_daily {
            errors.push("Total budget must be >= daily budget".to_string());
        }

        let start = parse_date(&self.start_date);
        if self.start_date.is_empty() {
            errors.push("Start date is required".to_string());
        } else if start.is_none() {
            errors.push("Start date must be YYYY-MM-DD".to_string());
        }
        if !self.end_date.is_empty() {
            match (start, parse_date(&self.end_date)) {
                (_, None) => errors.push("End date must be YYYY-MM-DD".to_string()),
                (Some(start), Some(end)) if end < start => {
                    errors.push("End date must be after start date".to_string())
                }
                _ => {}
            }
        }

        let regions: Vec<&str> = self
            .regions
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect();
        if regions.is_empty() {
            errors.push("At least one region must be selected".to_string());
        }
        for region in regions {
            if !VALID_REGIONS.contains(&region) {
                errors.push(format!("Invalid region: {region}"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::new(errors))
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Numbers that fail to parse, or are not finite, count as zero.
fn parse_amount(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Raw form submission. Regions arrive as repeated `regions` fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetaDestinationForm {
    pub name: String,
    pub account_id: String,
    pub campaign_name: String,
    pub cpm_value: String,
    pub budget_daily: String,
    pub budget_total: String,
    pub regions: Vec<String>,
    pub start_date: String,
    pub end_date: String,
    pub audience_type: String,
    pub optimize_for: String,
}

impl MetaDestinationForm {
    pub fn to_config(&self) -> DestinationConfig {
        DestinationConfig::Meta(MetaDestination {
            name: self.name.trim().to_string(),
            account_id: self.account_id.trim().to_string(),
            campaign_name: self.campaign_name.trim().to_string(),
            cpm_value: parse_amount(&self.cpm_value),
            budget_daily: parse_amount(&self.budget_daily),
            budget_total: parse_amount(&self.budget_total),
            regions: self.regions.iter().map(|r| r.trim().to_string()).collect(),
            start_date: self.start_date.trim().to_string(),
            end_date: self.end_date.trim().to_string(),
            audience_type: self.audience_type.trim().to_string(),
            optimize_for: self.optimize_for.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> MetaDestination {
        MetaDestination {
            name: "Spring launch".into(),
            account_id: "act_12345".into(),
            campaign_name: "Spring".into(),
            cpm_value: 12.5,
            budget_daily: 100.0,
            budget_total: 3000.0,
            regions: vec!["US".into(), "CA".into()],
            start_date: "2026-03-01".into(),
            end_date: "2026-03-31".into(),
            audience_type: "lookalike".into(),
            optimize_for: "conversions".into(),
        }
    }

    fn messages(dest: &MetaDestination) -> Vec<String> {
        dest.validate().unwrap_err().messages().to_vec()
    }

    #[test]
    fn test_valid_destination() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_account_prefix() {
        let dest = MetaDestination {
            account_id: "12345".into(),
            ..valid()
        };
        assert_eq!(messages(&dest), vec!["Account ID must start with 'act_'"]);
    }

    #[test]
    fn test_empty_account_reports_both_rules() {
        let dest = MetaDestination {
            account_id: String::new(),
            ..valid()
        };
        assert_eq!(messages(&dest).len(), 2);
    }

    #[test]
    fn test_cpm_bounds() {
        let zero = MetaDestination {
            cpm_value: 0.0,
            ..valid()
        };
        assert_eq!(messages(&zero), vec!["CPM value must be positive"]);

        let high = MetaDestination {
            cpm_value: 1000.01,
            ..valid()
        };
        assert!(messages(&high)[0].starts_with("CPM value seems too high"));

        let max = MetaDestination {
            cpm_value: 1000.0,
            ..valid()
        };
        assert!(max.validate().is_ok());
    }

    #[test]
    fn test_budget_rules() {
        let dest = MetaDestination {
            budget_daily: 500.0,
            budget_total: 100.0,
            ..valid()
        };
        assert_eq!(messages(&dest), vec!["Total budget must be >= daily budget"]);
    }

    #[test]
    fn test_date_rules() {
        let missing = MetaDestination {
            start_date: String::new(),
            end_date: String::new(),
            ..valid()
        };
        assert_eq!(messages(&missing), vec!["Start date is required"]);

        let reversed = MetaDestination {
            start_date: "2026-04-01".into(),
            end_date: "2026-03-01".into(),
            ..valid()
        };
        assert_eq!(messages(&reversed), vec!["End date must be after start date"]);

        let open_ended = MetaDestination {
            end_date: String::new(),
            ..valid()
        };
        assert!(open_ended.validate().is_ok());
    }

    #[test]
    fn test_region_rules() {
        let none = MetaDestination {
            regions: vec![],
            ..valid()
        };
        assert_eq!(messages(&none), vec!["At least one region must be selected"]);

        let bad = MetaDestination {
            regions: vec!["US".into(), "JP".into()],
            ..valid()
        };
        assert_eq!(messages(&bad), vec!["Invalid region: JP"]);
    }

    #[test]
    fn test_form_parsing_defaults_bad_numbers_to_zero() {
        let form = MetaDestinationForm {
            cpm_value: "abc".into(),
            budget_daily: "NaN".into(),
            budget_total: " 50 ".into(),
            ..MetaDestinationForm::default()
        };
        let DestinationConfig::Meta(dest) = form.to_config();
        assert_eq!(dest.cpm_value, 0.0);
        assert_eq!(dest.budget_daily, 0.0);
        assert_eq!(dest.budget_total, 50.0);
    }
}
