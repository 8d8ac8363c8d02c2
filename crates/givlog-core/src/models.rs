//! Data models for givlog
//!
//! Defines the core data structures: Organization, Donation, and the
//! DonationBook document that holds all of them. The sync engine treats the
//! document as an opaque blob; these types exist for the application layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An organization that receives donations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Optional category (e.g. "education", "relief")
    pub category: Option<String>,
    /// Optional website URL
    pub website: Option<String>,
    /// When this organization was added
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Create a new organization with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: None,
            website: None,
            created_at: Utc::now(),
        }
    }

    /// Set the category
    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category;
    }

    /// Set the website
    pub fn set_website(&mut self, website: Option<String>) {
        self.website = website;
    }
}

/// A single donation to an organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Donation {
    /// Unique identifier
    pub id: Uuid,
    /// The organization this donation went to
    pub organization_id: Uuid,
    /// Amount in minor currency units (cents)
    pub amount_cents: i64,
    /// ISO 4217 currency code
    pub currency: String,
    /// The date the donation was made
    pub date: NaiveDate,
    /// Optional free-form note
    pub note: Option<String>,
}

impl Donation {
    /// Create a new donation for an organization
    pub fn new(organization_id: Uuid, amount_cents: i64, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            amount_cents,
            currency: "USD".to_string(),
            date,
            note: None,
        }
    }

    /// Set the currency code
    pub fn set_currency(&mut self, currency: impl Into<String>) {
        self.currency = currency.into();
    }

    /// Set the note
    pub fn set_note(&mut self, note: Option<String>) {
        self.note = note;
    }
}

/// The whole donation dataset, synced as a single document
///
/// This is the document type the sync engine replaces wholesale on every
/// push and pull. It is never merged field-by-field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DonationBook {
    /// All organizations
    #[serde(default)]
    pub organizations: Vec<Organization>,
    /// All donations
    #[serde(default)]
    pub donations: Vec<Donation>,
}

impl DonationBook {
    /// Look up an organization by id
    pub fn organization(&self, id: Uuid) -> Option<&Organization> {
        self.organizations.iter().find(|o| o.id == id)
    }

    /// Find an organization by (case-insensitive) name
    pub fn organization_by_name(&self, name: &str) -> Option<&Organization> {
        self.organizations
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }

    /// All donations made to one organization
    pub fn donations_for(&self, organization_id: Uuid) -> Vec<&Donation> {
        self.donations
            .iter()
            .filter(|d| d.organization_id == organization_id)
            .collect()
    }

    /// Sum of all donation amounts, in cents
    ///
    /// Ignores currency; reporting across mixed currencies is up to the
    /// caller.
    pub fn total_cents(&self) -> i64 {
        self.donations.iter().map(|d| d.amount_cents).sum()
    }

    /// Donations made within a date range (inclusive)
    pub fn donations_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<&Donation> {
        self.donations
            .iter()
            .filter(|d| d.date >= from && d.date <= to)
            .collect()
    }
}
