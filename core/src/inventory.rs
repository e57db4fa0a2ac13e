//! Ticket tier validation, defaults and replacement.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{EventPassError, Result};
use crate::types::{EventDetails, Money, TicketTier};

/// Tier names accepted when no configuration overrides them.
pub const DEFAULT_TIER_NAMES: [&str; 2] = ["Regular", "VIP"];

/// Capacity of the tier an event gets when created without tiers.
pub const DEFAULT_TIER_CAPACITY: u32 = 100;

/// Caller-supplied description of a tier, before validation.
///
/// Signed integers so that negative input is reported as a validation error
/// rather than a deserialization failure. `price` is in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Tier name
    #[serde(alias = "tier")]
    pub name: String,
    /// Price in cents
    #[serde(default)]
    pub price: i64,
    /// Capacity of the tier
    #[serde(alias = "available_quantity")]
    pub remaining: i64,
}

impl TierSpec {
    /// Create a spec
    #[must_use]
    pub fn new(name: impl Into<String>, price: i64, remaining: i64) -> Self {
        Self {
            name: name.into(),
            price,
            remaining,
        }
    }
}

/// Owns the rules for an event's ticket tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketInventory {
    allowed: Vec<String>,
    default_capacity: u32,
}

impl Default for TicketInventory {
    fn default() -> Self {
        Self {
            allowed: DEFAULT_TIER_NAMES.iter().map(ToString::to_string).collect(),
            default_capacity: DEFAULT_TIER_CAPACITY,
        }
    }
}

impl TicketInventory {
    /// Build an inventory with a custom allowed set. The first allowed name is
    /// the default tier.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `allowed` is empty or has blank names.
    pub fn new(allowed: Vec<String>, default_capacity: u32) -> Result<Self> {
        if allowed.is_empty() {
            return Err(EventPassError::validation(
                "ticket_tiers",
                "at least one tier name must be allowed",
            ));
        }
        if allowed.iter().any(|name| name.trim().is_empty()) {
            return Err(EventPassError::validation(
                "ticket_tiers",
                "tier names must not be blank",
            ));
        }
        Ok(Self {
            allowed,
            default_capacity,
        })
    }

    /// Allowed tier names, in configured order.
    #[must_use]
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Whether `name` is an allowed tier name
    #[must_use]
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.iter().any(|allowed| allowed == name)
    }

    /// The tier list an event gets when created without tiers: one free tier
    /// named after the first allowed name.
    #[must_use]
    pub fn create_default(&self) -> Vec<TicketTier> {
        let name = self
            .allowed
            .first()
            .map_or_else(|| DEFAULT_TIER_NAMES[0].to_string(), Clone::clone);
        vec![TicketTier {
            name,
            price: Money::from_cents(0),
            remaining: self.default_capacity,
        }]
    }

    /// Validate a list of tier specs, preserving order.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first offending tier: unknown
    /// name, duplicate name, negative price, or negative or oversized
    /// quantity.
    pub fn validate(&self, specs: &[TierSpec]) -> Result<Vec<TicketTier>> {
        let mut seen = HashSet::with_capacity(specs.len());
        specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let field = |attr: &str| format!("tiers[{index}].{attr}");

                if !self.is_allowed(&spec.name) {
                    return Err(EventPassError::validation(
                        field("name"),
                        format!(
                            "'{}' is not one of {}",
                            spec.name,
                            self.allowed.join(", ")
                        ),
                    ));
                }
                if !seen.insert(spec.name.as_str()) {
                    return Err(EventPassError::validation(
                        field("name"),
                        format!("duplicate tier '{}'", spec.name),
                    ));
                }
                let price = u64::try_from(spec.price).map_err(|_| {
                    EventPassError::validation(field("price"), "must not be negative")
                })?;
                let remaining = u32::try_from(spec.remaining).map_err(|_| {
                    EventPassError::validation(
                        field("remaining"),
                        format!("must be between 0 and {}", u32::MAX),
                    )
                })?;

                Ok(TicketTier {
                    name: spec.name.clone(),
                    price: Money::from_cents(price),
                    remaining,
                })
            })
            .collect()
    }

    /// Tiers for a new event: validated specs, or the default tier when none
    /// were given.
    ///
    /// # Errors
    ///
    /// See [`TicketInventory::validate`].
    pub fn resolve(&self, specs: Option<&[TierSpec]>) -> Result<Vec<TicketTier>> {
        match specs {
            Some(specs) if !specs.is_empty() => self.validate(specs),
            _ => Ok(self.create_default()),
        }
    }

    /// Replace every tier of `details` with the validated `specs`.
    ///
    /// This is a full overwrite: tiers missing from `specs` are removed and
    /// `remaining` is taken as given, regardless of tickets already sold.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `specs` is empty or any spec is invalid.
    /// `details` is untouched on error.
    pub fn replace_all(
        &self,
        mut details: EventDetails,
        specs: &[TierSpec],
    ) -> Result<EventDetails> {
        if specs.is_empty() {
            return Err(EventPassError::validation(
                "tiers",
                "an event needs at least one tier",
            ));
        }
        details.tiers = self.validate(specs)?;
        Ok(details)
    }
}
