use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::{contains_ignore_case, require, CatalogError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ParcelStatus {
    #[default]
    Pending,
    InTransit,
    Delivered,
}

impl ParcelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParcelStatus::Pending => "pending",
            ParcelStatus::InTransit => "in-transit",
            ParcelStatus::Delivered => "delivered",
        }
    }

    /// Note recorded in the tracking history when a parcel enters this status.
    pub fn note(&self) -> &'static str {
        match self {
            ParcelStatus::Pending => "Package received",
            ParcelStatus::InTransit => "In transit",
            ParcelStatus::Delivered => "Delivered",
        }
    }
}

impl FromStr for ParcelStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ParcelStatus::Pending),
            "in-transit" => Ok(ParcelStatus::InTransit),
            "delivered" => Ok(ParcelStatus::Delivered),
            other => Err(CatalogError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParcelLocation {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

/// A package shipped on one of the agency's buses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parcel {
    pub id: Uuid,
    pub tracking_id: String,
    pub sender: String,
    pub recipient: String,
    pub origin: String,
    pub destination: String,
    pub weight_kg: f64,
    pub price: i64,
    pub status: ParcelStatus,
    pub owner_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub locations: Vec<ParcelLocation>,
}

impl Parcel {
    pub fn matches(&self, term: &str) -> bool {
        [
            &self.tracking_id,
            &self.sender,
            &self.recipient,
            &self.origin,
            &self.destination,
        ]
        .iter()
        .any(|field| contains_ignore_case(field, term))
    }

    /// Move the parcel to `status`, appending a checkpoint to its history.
    pub fn advance(&mut self, status: ParcelStatus, location: String, at: DateTime<Utc>) -> Result<(), CatalogError> {
        require(&location, "location")?;
        self.status = status;
        self.locations.push(ParcelLocation {
            location,
            timestamp: at,
            status: status.note().to_string(),
        });
        Ok(())
    }

    pub fn belongs_to(&self, email: &str) -> bool {
        self.owner_email
            .as_deref()
            .is_some_and(|owner| owner.eq_ignore_ascii_case(email))
    }
}

/// Tracking ids look like `PKG-007-2025`: a running number and the year of registration.
pub fn tracking_id(sequence: u64, at: DateTime<Utc>) -> String {
    format!("PKG-{:03}-{}", sequence, at.year())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelDraft {
    pub sender: String,
    pub recipient: String,
    pub origin: String,
    pub destination: String,
    pub weight_kg: f64,
    pub price: i64,
    pub owner_email: Option<String>,
}

impl ParcelDraft {
    pub fn validate(&self) -> Result<(), CatalogError> {
        require(&self.sender, "sender")?;
        require(&self.recipient, "recipient")?;
        require(&self.origin, "origin")?;
        require(&self.destination, "destination")?;
        if !(self.weight_kg > 0.0) {
            return Err(CatalogError::InvalidValue {
                field: "weight_kg",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.price < 0 {
            return Err(CatalogError::InvalidValue {
                field: "price",
                reason: "cannot be negative".to_string(),
            });
        }
        Ok(())
    }

    /// Register the parcel at its origin terminal.
    pub fn into_parcel(self, sequence: u64, at: DateTime<Utc>) -> Result<Parcel, CatalogError> {
        self.validate()?;
        let first_stop = ParcelLocation {
            location: format!("{} Terminal", self.origin),
            timestamp: at,
            status: ParcelStatus::Pending.note().to_string(),
        };

        Ok(Parcel {
            id: Uuid::new_v4(),
            tracking_id: tracking_id(sequence, at),
            sender: self.sender,
            recipient: self.recipient,
            origin: self.origin,
            destination: self.destination,
            weight_kg: self.weight_kg,
            price: self.price,
            status: ParcelStatus::Pending,
            owner_email: self.owner_email.map(|e| e.trim().to_lowercase()),
            created_at: at,
            locations: vec![first_stop],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> ParcelDraft {
        ParcelDraft {
            sender: "Ebai John".to_string(),
            recipient: "Atanga Mary".to_string(),
            origin: "Douala".to_string(),
            destination: "Yaoundé".to_string(),
            weight_kg: 5.2,
            price: 3500,
            owner_email: Some("Ebai@Example.cm".to_string()),
        }
    }

    #[test]
    fn test_tracking_id_format() {
        let at = Utc.with_ymd_and_hms(2025, 5, 15, 8, 45, 0).unwrap();
        assert_eq!(tracking_id(1, at), "PKG-001-2025");
        assert_eq!(tracking_id(1234, at), "PKG-1234-2025");
    }

    #[test]
    fn test_new_parcel_is_received_at_origin() {
        let parcel = draft().into_parcel(3, Utc::now()).unwrap();
        assert_eq!(parcel.status, ParcelStatus::Pending);
        assert_eq!(parcel.locations.len(), 1);
        assert_eq!(parcel.locations[0].location, "Douala Terminal");
        assert_eq!(parcel.locations[0].status, "Package received");
        assert!(parcel.belongs_to("ebai@example.cm"));
    }

    #[test]
    fn test_advance_appends_history() {
        let mut parcel = draft().into_parcel(3, Utc::now()).unwrap();
        parcel
            .advance(ParcelStatus::InTransit, "Edéa Checkpoint".to_string(), Utc::now())
            .unwrap();
        parcel
            .advance(ParcelStatus::Delivered, "Yaoundé Terminal".to_string(), Utc::now())
            .unwrap();

        assert_eq!(parcel.status, ParcelStatus::Delivered);
        let notes: Vec<&str> = parcel.locations.iter().map(|l| l.status.as_str()).collect();
        assert_eq!(notes, vec!["Package received", "In transit", "Delivered"]);
    }

    #[test]
    fn test_search_covers_all_parties() {
        let parcel = draft().into_parcel(3, Utc::now()).unwrap();
        assert!(parcel.matches("pkg-003"));
        assert!(parcel.matches("atanga"));
        assert!(parcel.matches("yaound"));
        assert!(!parcel.matches("Bamenda"));
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ParcelStatus::InTransit).unwrap(),
            "\"in-transit\""
        );
        assert_eq!("in-transit".parse::<ParcelStatus>().unwrap(), ParcelStatus::InTransit);
    }

    #[test]
    fn test_weight_must_be_positive() {
        let mut d = draft();
        d.weight_kg = 0.0;
        assert!(d.validate().is_err());
    }
}
