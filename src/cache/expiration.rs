//! Expiration Policy Module
//!
//! Maps duration tags to TTLs and clamps TTLs to the next UTC midnight.

use std::fmt;

use chrono::{DateTime, Utc};

// == Cache Duration ==
/// Semantic cache lifetimes used by data endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheDuration {
    ThirtyMinutes,
    OneDay,
    OneWeek,
    OneMonth,
    ThreeMonths,
}

impl CacheDuration {
    /// Parses a tag such as `"30_minutes"`. Unknown tags map to one day.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "30_minutes" => CacheDuration::ThirtyMinutes,
            "1_day" => CacheDuration::OneDay,
            "1_week" => CacheDuration::OneWeek,
            "1_month" => CacheDuration::OneMonth,
            "3_months" => CacheDuration::ThreeMonths,
            _ => CacheDuration::OneDay,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            CacheDuration::ThirtyMinutes => "30_minutes",
            CacheDuration::OneDay => "1_day",
            CacheDuration::OneWeek => "1_week",
            CacheDuration::OneMonth => "1_month",
            CacheDuration::ThreeMonths => "3_months",
        }
    }

    /// Base TTL in seconds.
    pub fn as_secs(&self) -> u64 {
        match self {
            CacheDuration::ThirtyMinutes => 30 * 60,
            CacheDuration::OneDay => 24 * 60 * 60,
            CacheDuration::OneWeek => 7 * 24 * 60 * 60,
            CacheDuration::OneMonth => 30 * 24 * 60 * 60,
            CacheDuration::ThreeMonths => 90 * 24 * 60 * 60,
        }
    }
}

impl Default for CacheDuration {
    fn default() -> Self {
        CacheDuration::OneDay
    }
}

impl fmt::Display for CacheDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// == Expiration Policy ==
/// Base TTL plus the optional midnight clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    pub base_ttl_seconds: u64,
    pub invalidate_at_midnight: bool,
}

impl ExpirationPolicy {
    pub fn new(duration: CacheDuration, invalidate_at_midnight: bool) -> Self {
        Self {
            base_ttl_seconds: duration.as_secs(),
            invalidate_at_midnight,
        }
    }

    /// Resolves the TTL against the current UTC time.
    pub fn resolve(&self) -> u64 {
        self.resolve_at(Utc::now())
    }

    /// Resolves the TTL against a given instant.
    pub fn resolve_at(&self, now: DateTime<Utc>) -> u64 {
        resolve_ttl_at(self.base_ttl_seconds, self.invalidate_at_midnight, now)
    }
}

/// TTL for an entry stored now.
pub fn resolve_ttl(base_ttl_seconds: u64, invalidate_at_midnight: bool) -> u64 {
    resolve_ttl_at(base_ttl_seconds, invalidate_at_midnight, Utc::now())
}

/// TTL for an entry stored at `now`; never negative.
pub fn resolve_ttl_at(base_ttl_seconds: u64, invalidate_at_midnight: bool, now: DateTime<Utc>) -> u64 {
    if !invalidate_at_midnight {
        return base_ttl_seconds;
    }

    match seconds_until_midnight(now) {
        Some(remaining) => base_ttl_seconds.min(remaining.max(0) as u64),
        None => base_ttl_seconds,
    }
}

/// Whole seconds from `now` to the next 00:00:00 UTC, truncated.
///
/// Returns None only when the next day is not representable.
pub fn seconds_until_midnight(now: DateTime<Utc>) -> Option<i64> {
    let midnight = now.date_naive().succ_opt()?.and_hms_opt(0, 0, 0)?.and_utc();
    Some((midnight - now).num_seconds())
}

// == Attribute Policies ==
/// Cache lifetime per data attribute. Anything not listed caches for a day.
const ATTRIBUTE_DURATIONS: &[(&str, CacheDuration)] = &[
    // Ticker attributes
    ("actions", CacheDuration::OneDay),
    ("analyst_price_targets", CacheDuration::OneDay),
    ("balance_sheet", CacheDuration::OneDay),
    ("basic_info", CacheDuration::ThreeMonths),
    ("calendar", CacheDuration::OneWeek),
    ("capital_gains", CacheDuration::OneDay),
    ("cash_flow", CacheDuration::OneDay),
    ("dividends", CacheDuration::OneDay),
    ("earnings", CacheDuration::OneDay),
    ("earnings_dates", CacheDuration::OneWeek),
    ("fast_info", CacheDuration::ThreeMonths),
    ("financials", CacheDuration::OneDay),
    ("info", CacheDuration::ThreeMonths),
    ("isin", CacheDuration::ThreeMonths),
    ("major_holders", CacheDuration::OneWeek),
    ("news", CacheDuration::OneDay),
    // Market
    ("market_status", CacheDuration::ThirtyMinutes),
    ("market_summary", CacheDuration::ThirtyMinutes),
    // Search
    ("search_all", CacheDuration::ThirtyMinutes),
    ("search_quotes", CacheDuration::ThirtyMinutes),
    // Sector and industry
    ("sector_industries", CacheDuration::ThreeMonths),
    ("sector_overview", CacheDuration::OneWeek),
    ("industry_overview", CacheDuration::OneWeek),
    ("industry_top_companies", CacheDuration::OneWeek),
];

/// Attributes whose entries always expire at UTC midnight.
const MIDNIGHT_ATTRIBUTES: &[&str] = &[
    "actions",
    "analyst_price_targets",
    "balance_sheet",
    "cash_flow",
    "dividends",
    "earnings",
    "financials",
    "news",
];

/// Looks up the expiration policy for a data attribute.
///
/// `invalidate_at_midnight` is forced on for attributes that change daily.
pub fn policy_for_attribute(attribute: &str, invalidate_at_midnight: bool) -> ExpirationPolicy {
    let duration = ATTRIBUTE_DURATIONS
        .iter()
        .find(|(name, _)| *name == attribute)
        .map(|(_, d)| *d)
        .unwrap_or_default();

    let midnight = invalidate_at_midnight || MIDNIGHT_ATTRIBUTES.contains(&attribute);
    ExpirationPolicy::new(duration, midnight)
}
