//! Rebate and application records as stored by the application database.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a rebate application.
///
/// The serialized form matches the lowercase values stored in the
/// `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    HouseholdInitiated,
    Verified,
    Declined,
    Approved,
    NotApproved,
    Redeemed,
    Expired,
    Cancelled,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::HouseholdInitiated => "household_initiated",
            ApplicationStatus::Verified => "verified",
            ApplicationStatus::Declined => "declined",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::NotApproved => "not_approved",
            ApplicationStatus::Redeemed => "redeemed",
            ApplicationStatus::Expired => "expired",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status column holds an unknown value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(ApplicationStatus::Submitted),
            "household_initiated" => Ok(ApplicationStatus::HouseholdInitiated),
            "verified" => Ok(ApplicationStatus::Verified),
            "declined" => Ok(ApplicationStatus::Declined),
            "approved" => Ok(ApplicationStatus::Approved),
            "not_approved" => Ok(ApplicationStatus::NotApproved),
            "redeemed" => Ok(ApplicationStatus::Redeemed),
            "expired" => Ok(ApplicationStatus::Expired),
            "cancelled" => Ok(ApplicationStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One applicant submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateApplication {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: ApplicationStatus,
    pub modified: DateTime<Utc>,
}

impl RebateApplication {
    /// Applicant name as used in email salutations.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// One approved rebate grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rebate {
    pub id: i64,
    pub application_id: Option<String>,
    pub drivers_licence: String,
    pub last_name: String,
    pub expiry_date: NaiveDate,
    pub rebate_max_amount: i32,
    /// Registry id, assigned once the rebate has been pushed to the registry.
    pub ncda_id: Option<i64>,
    pub redeemed: bool,
    pub modified: DateTime<Utc>,
}

/// A rebate joined with its owning application, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct RebateWithApplication {
    pub rebate: Rebate,
    pub application: Option<RebateApplication>,
}

impl RebateWithApplication {
    /// The application, if it is currently approved.
    pub fn approved_application(&self) -> Option<&RebateApplication> {
        self.application
            .as_ref()
            .filter(|app| app.status == ApplicationStatus::Approved)
    }
}

/// Amount bracket that selects the figures quoted in the approval email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebateTier {
    FourThousand,
    TwoThousand,
    OneThousand,
}

impl RebateTier {
    pub fn for_max_amount(rebate_max_amount: i32) -> Self {
        match rebate_max_amount {
            4000 => RebateTier::FourThousand,
            2000 => RebateTier::TwoThousand,
            _ => RebateTier::OneThousand,
        }
    }

    pub fn amounts(&self) -> RebateAmounts {
        match self {
            RebateTier::FourThousand => RebateAmounts {
                zev_max: 4000,
                zev_mid: 2000,
                zev_min: 1000,
                phev_max: 2000,
                phev_mid: 1000,
                phev_min: 500,
            },
            RebateTier::TwoThousand => RebateAmounts {
                zev_max: 2000,
                zev_mid: 1000,
                zev_min: 500,
                phev_max: 1000,
                phev_mid: 500,
                phev_min: 250,
            },
            RebateTier::OneThousand => RebateAmounts {
                zev_max: 1000,
                zev_mid: 500,
                zev_min: 250,
                phev_max: 500,
                phev_mid: 250,
                phev_min: 125,
            },
        }
    }
}

/// Dollar figures for each vehicle class and lease term in a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebateAmounts {
    pub zev_max: u32,
    pub zev_mid: u32,
    pub zev_min: u32,
    pub phev_max: u32,
    pub phev_mid: u32,
    pub phev_min: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_for_max_amount() {
        assert_eq!(RebateTier::for_max_amount(4000), RebateTier::FourThousand);
        assert_eq!(RebateTier::for_max_amount(2000), RebateTier::TwoThousand);
        assert_eq!(RebateTier::for_max_amount(1000), RebateTier::OneThousand);
        assert_eq!(RebateTier::for_max_amount(3000), RebateTier::OneThousand);
        assert_eq!(RebateTier::for_max_amount(0), RebateTier::OneThousand);
    }

    #[test]
    fn test_tier_amounts() {
        let four = RebateTier::FourThousand.amounts();
        assert_eq!(four.zev_max, 4000);
        assert_eq!(four.phev_min, 500);

        let one = RebateTier::OneThousand.amounts();
        assert_eq!(one.zev_mid, 500);
        assert_eq!(one.phev_min, 125);
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            ApplicationStatus::Submitted,
            ApplicationStatus::HouseholdInitiated,
            ApplicationStatus::NotApproved,
            ApplicationStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
        assert!("bogus".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_full_name() {
        let app = RebateApplication {
            id: "abc".to_string(),
            first_name: "Jane ".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            status: ApplicationStatus::Approved,
            modified: Utc::now(),
        };
        assert_eq!(app.full_name(), "Jane Doe");
    }
}
