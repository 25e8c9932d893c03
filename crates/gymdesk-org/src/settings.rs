//! Settings for organizations
//!
//! Settings are a closed set of feature flags plus a couple of display
//! defaults. Unknown keys are rejected when a payload is decoded, so every
//! setting an organization can carry is listed here.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{OrgError, OrgResult};

/// Organization-level settings.
///
/// # Examples
///
/// ```
/// use gymdesk_org::settings::{FeatureFlag, OrganizationSettings};
///
/// let settings = OrganizationSettings::default();
/// assert!(settings.features.is_enabled(FeatureFlag::ClassScheduling));
/// assert!(!settings.features.is_enabled(FeatureFlag::OnlinePayments));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OrganizationSettings {
    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,

    /// IANA time zone used for schedules and reports
    #[serde(default = "default_timezone")]
    #[validate(length(min = 1, max = 64))]
    pub timezone: String,

    /// ISO 4217 currency code used for billing
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            features: FeatureFlags::default(),
            timezone: default_timezone(),
            currency: default_currency(),
        }
    }
}

impl OrganizationSettings {
    /// Decode and validate a settings payload.
    pub fn from_json(value: serde_json::Value) -> OrgResult<Self> {
        let settings: Self = serde_json::from_value(value)?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Every feature flag an organization can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFlag {
    ClassScheduling,
    OnlineBooking,
    MemberPortal,
    OnlinePayments,
    MultiLocation,
    Reporting,
}

impl FeatureFlag {
    pub fn all() -> [FeatureFlag; 6] {
        [
            FeatureFlag::ClassScheduling,
            FeatureFlag::OnlineBooking,
            FeatureFlag::MemberPortal,
            FeatureFlag::OnlinePayments,
            FeatureFlag::MultiLocation,
            FeatureFlag::Reporting,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureFlag::ClassScheduling => "class_scheduling",
            FeatureFlag::OnlineBooking => "online_booking",
            FeatureFlag::MemberPortal => "member_portal",
            FeatureFlag::OnlinePayments => "online_payments",
            FeatureFlag::MultiLocation => "multi_location",
            FeatureFlag::Reporting => "reporting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|flag| flag.as_str() == s)
    }
}

/// Feature flags for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureFlags {
    /// Class and appointment scheduling
    #[serde(default = "default_true")]
    pub class_scheduling: bool,

    /// Clients can book classes themselves
    #[serde(default)]
    pub online_booking: bool,

    /// Self-service portal for members
    #[serde(default)]
    pub member_portal: bool,

    /// Card payments through the billing module
    #[serde(default)]
    pub online_payments: bool,

    /// More than one location per organization
    #[serde(default)]
    pub multi_location: bool,

    /// Attendance and revenue reports
    #[serde(default = "default_true")]
    pub reporting: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            class_scheduling: true,
            online_booking: false,
            member_portal: false,
            online_payments: false,
            multi_location: false,
            reporting: true,
        }
    }
}

impl FeatureFlags {
    pub fn is_enabled(&self, flag: FeatureFlag) -> bool {
        match flag {
            FeatureFlag::ClassScheduling => self.class_scheduling,
            FeatureFlag::OnlineBooking => self.online_booking,
            FeatureFlag::MemberPortal => self.member_portal,
            FeatureFlag::OnlinePayments => self.online_payments,
            FeatureFlag::MultiLocation => self.multi_location,
            FeatureFlag::Reporting => self.reporting,
        }
    }

    pub fn set(&mut self, flag: FeatureFlag, enabled: bool) {
        let slot = match flag {
            FeatureFlag::ClassScheduling => &mut self.class_scheduling,
            FeatureFlag::OnlineBooking => &mut self.online_booking,
            FeatureFlag::MemberPortal => &mut self.member_portal,
            FeatureFlag::OnlinePayments => &mut self.online_payments,
            FeatureFlag::MultiLocation => &mut self.multi_location,
            FeatureFlag::Reporting => &mut self.reporting,
        };
        *slot = enabled;
    }

    /// Enabled flags in declaration order.
    pub fn enabled(&self) -> Vec<FeatureFlag> {
        FeatureFlag::all()
            .into_iter()
            .filter(|flag| self.is_enabled(*flag))
            .collect()
    }
}
