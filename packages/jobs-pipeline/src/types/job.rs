//! Job types - listings and fetched posting detail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A lightweight reference to a job posting, pre-detail-fetch.
///
/// Listings are produced by the spider from the listing pages and are
/// immutable once created; the `job_id` is the stable identifier assigned
/// by the listing source and is the key every later stage joins on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    /// Stable identifier from the listing source
    pub job_id: String,

    /// Advertised title
    pub title: String,

    /// Hiring agency or organisation
    pub agency: String,

    /// Advertised location
    pub location: String,

    /// Canonical posting URL
    pub url: String,

    /// When the posting went up
    pub posted_at: Option<DateTime<Utc>>,

    /// Application closing date
    pub closes_at: Option<DateTime<Utc>>,
}

impl JobListing {
    /// Create a new listing.
    pub fn new(
        job_id: impl Into<String>,
        title: impl Into<String>,
        agency: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            title: title.into(),
            agency: agency.into(),
            location: String::new(),
            url: String::new(),
            posted_at: None,
            closes_at: None,
        }
    }

    /// Set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the posting URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the posting date.
    pub fn with_posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = Some(posted_at);
        self
    }

    /// Set the closing date.
    pub fn with_closes_at(mut self, closes_at: DateTime<Utc>) -> Self {
        self.closes_at = Some(closes_at);
        self
    }
}

/// Full posting text for one listing.
///
/// Created by the spider's detail fetch; read-only input to the processor.
/// The content hash covers all text fields so re-runs can detect an
/// unchanged posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    /// The listing this detail was fetched for
    pub listing: JobListing,

    /// Role description
    pub description: String,

    /// Key responsibilities
    pub responsibilities: Vec<String>,

    /// Essential requirements
    pub requirements: Vec<String>,

    /// Additional notes from the posting
    pub notes: Option<String>,

    /// "About us" blurb for the agency
    pub about_us: Option<String>,

    /// Contact details for enquiries
    pub contact: Option<String>,

    /// SHA-256 hash of the concatenated text fields
    pub content_hash: String,

    /// When the detail page was fetched
    pub fetched_at: DateTime<Utc>,
}

impl JobDetails {
    /// Create job details for a listing.
    pub fn new(listing: JobListing, description: impl Into<String>) -> Self {
        let mut details = Self {
            listing,
            description: description.into(),
            responsibilities: Vec::new(),
            requirements: Vec::new(),
            notes: None,
            about_us: None,
            contact: None,
            content_hash: String::new(),
            fetched_at: Utc::now(),
        };
        details.rehash();
        details
    }

    /// Calculate SHA-256 hash of posting text.
    pub fn hash_content(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Set the responsibilities list.
    pub fn with_responsibilities(mut self, responsibilities: Vec<String>) -> Self {
        self.responsibilities = responsibilities;
        self.rehash();
        self
    }

    /// Set the requirements list.
    pub fn with_requirements(mut self, requirements: Vec<String>) -> Self {
        self.requirements = requirements;
        self.rehash();
        self
    }

    /// Set the notes field.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self.rehash();
        self
    }

    /// Set the "about us" field.
    pub fn with_about_us(mut self, about_us: impl Into<String>) -> Self {
        self.about_us = Some(about_us.into());
        self.rehash();
        self
    }

    /// Set the contact field.
    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self.rehash();
        self
    }

    /// The stable source identifier for this posting.
    pub fn job_id(&self) -> &str {
        &self.listing.job_id
    }

    /// All text fields joined, in field order.
    pub fn full_text(&self) -> String {
        let mut parts = vec![self.description.clone()];
        parts.extend(self.responsibilities.iter().cloned());
        parts.extend(self.requirements.iter().cloned());
        parts.extend(self.notes.iter().cloned());
        parts.extend(self.about_us.iter().cloned());
        parts.extend(self.contact.iter().cloned());
        parts.join("\n")
    }

    /// Check whether posting text differs from this detail's hash.
    pub fn content_changed(&self, other_text: &str) -> bool {
        Self::hash_content(other_text) != self.content_hash
    }

    fn rehash(&mut self) {
        self.content_hash = Self::hash_content(&self.full_text());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        let listing = JobListing::new("J-1", "Policy Officer", "Department of Education");
        let details = JobDetails::new(listing, "Drive policy outcomes.");
        assert_eq!(details.content_hash.len(), 64); // SHA-256 hex
    }

    #[test]
    fn test_hash_tracks_text_fields() {
        let listing = JobListing::new("J-1", "Policy Officer", "Department of Education");
        let plain = JobDetails::new(listing.clone(), "Drive policy outcomes.");
        let with_reqs = JobDetails::new(listing, "Drive policy outcomes.")
            .with_requirements(vec!["Relevant degree".to_string()]);

        assert_ne!(plain.content_hash, with_reqs.content_hash);
        assert!(plain.content_changed(&with_reqs.full_text()));
        assert!(!plain.content_changed(&plain.full_text()));
    }

    #[test]
    fn test_listing_builders() {
        let listing = JobListing::new("J-2", "Senior Analyst", "Transport for NSW")
            .with_location("Sydney CBD")
            .with_url("https://iworkfor.nsw.gov.au/job/J-2");

        assert_eq!(listing.location, "Sydney CBD");
        assert!(listing.url.ends_with("J-2"));
        assert!(listing.posted_at.is_none());
    }
}
