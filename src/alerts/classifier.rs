//! Alert severity classification.
//!
//! Pure mapping from the free-form severity labels the capture pipeline
//! writes to the four display tiers. Total: any label it has never seen
//! lands on the low tier, so a malformed row can never break rendering.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Critical,
    High,
    Medium,
    Low,
}

impl SeverityTier {
    /// Maps a severity label to its tier. Unknown, empty, or oddly-cased
    /// labels fall through to `Low`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => SeverityTier::Critical,
            "high" => SeverityTier::High,
            "medium" => SeverityTier::Medium,
            _ => SeverityTier::Low,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            SeverityTier::Critical => "critical",
            SeverityTier::High => "high",
            SeverityTier::Medium => "medium",
            SeverityTier::Low => "low",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            SeverityTier::Critical => "alert-circle",
            SeverityTier::High | SeverityTier::Medium => "alert-triangle",
            SeverityTier::Low => "info",
        }
    }

    /// Badge text, e.g. "CRITICAL".
    pub fn badge(self) -> &'static str {
        match self {
            SeverityTier::Critical => "CRITICAL",
            SeverityTier::High => "HIGH",
            SeverityTier::Medium => "MEDIUM",
            SeverityTier::Low => "LOW",
        }
    }
}

/// Display metadata for one alert row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertAppearance {
    pub tier: SeverityTier,
    pub icon: &'static str,
    pub css_class: &'static str,
    pub badge: &'static str,
}

pub fn classify(severity: &str) -> AlertAppearance {
    let tier = SeverityTier::from_label(severity);
    AlertAppearance {
        tier,
        icon: tier.icon(),
        css_class: tier.css_class(),
        badge: tier.badge(),
    }
}

/// Human form of an alert type label: underscores become spaces.
pub fn display_type(alert_type: &str) -> String {
    alert_type.replace('_', " ")
}
