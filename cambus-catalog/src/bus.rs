use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::{contains_ignore_case, require, CatalogError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    #[default]
    Active,
    Maintenance,
    Inactive,
}

impl BusStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusStatus::Active => "active",
            BusStatus::Maintenance => "maintenance",
            BusStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for BusStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BusStatus::Active),
            "maintenance" => Ok(BusStatus::Maintenance),
            "inactive" => Ok(BusStatus::Inactive),
            other => Err(CatalogError::UnknownStatus(other.to_string())),
        }
    }
}

/// A bus running one trip between two towns.
///
/// Customers only ever read buses; every mutation goes through the admin console.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bus {
    pub id: Uuid,
    pub name: String,
    pub plate_number: Option<String>,
    pub from: String,
    pub to: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: i64,
    pub available_seats: i32,
    pub total_seats: i32,
    pub status: BusStatus,
}

impl Bus {
    pub fn is_bookable(&self) -> bool {
        self.status == BusStatus::Active
    }

    /// Optional origin/destination filters from the bus listing.
    pub fn serves(&self, from: Option<&str>, to: Option<&str>) -> bool {
        from.map_or(true, |f| contains_ignore_case(&self.from, f))
            && to.map_or(true, |t| contains_ignore_case(&self.to, t))
    }

    /// Overwrite the editable fields with an admin edit.
    ///
    /// Seats already sold stay sold: availability shifts by the change in capacity
    /// and is clamped to `0..=total_seats`.
    pub fn apply(&mut self, draft: BusDraft) -> Result<(), CatalogError> {
        draft.validate()?;
        let sold = self.total_seats - self.available_seats;

        self.name = draft.name;
        self.plate_number = draft.plate_number;
        self.from = draft.from;
        self.to = draft.to;
        self.departure_time = draft.departure_time;
        self.arrival_time = draft.arrival_time;
        self.price = draft.price;
        self.total_seats = draft.total_seats;
        self.available_seats = (draft.total_seats - sold).clamp(0, draft.total_seats);
        if let Some(status) = draft.status {
            self.status = status;
        }
        Ok(())
    }
}

/// Admin form for creating or editing a bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusDraft {
    pub name: String,
    pub plate_number: Option<String>,
    pub from: String,
    pub to: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: i64,
    pub total_seats: i32,
    pub status: Option<BusStatus>,
}

impl BusDraft {
    pub fn validate(&self) -> Result<(), CatalogError> {
        require(&self.name, "name")?;
        require(&self.from, "from")?;
        require(&self.to, "to")?;
        require(self.plate_number.as_deref().unwrap_or_default(), "plate_number")?;
        if self.price <= 0 {
            return Err(CatalogError::InvalidValue {
                field: "price",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.total_seats <= 0 {
            return Err(CatalogError::InvalidValue {
                field: "total_seats",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.arrival_time <= self.departure_time {
            return Err(CatalogError::InvalidValue {
                field: "arrival_time",
                reason: "must be after the departure time".to_string(),
            });
        }
        Ok(())
    }

    pub fn into_bus(self) -> Result<Bus, CatalogError> {
        self.validate()?;
        Ok(Bus {
            id: Uuid::new_v4(),
            name: self.name,
            plate_number: self.plate_number,
            from: self.from,
            to: self.to,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            price: self.price,
            available_seats: self.total_seats,
            total_seats: self.total_seats,
            status: self.status.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft(total_seats: i32) -> BusDraft {
        let departure = Utc::now() + Duration::days(1);
        BusDraft {
            name: "Garanti Express".to_string(),
            plate_number: Some("LT-456-YB".to_string()),
            from: "Douala".to_string(),
            to: "Yaoundé".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(4),
            price: 5000,
            total_seats,
            status: None,
        }
    }

    #[test]
    fn test_new_bus_starts_fully_available() {
        let bus = draft(50).into_bus().unwrap();
        assert_eq!(bus.available_seats, 50);
        assert_eq!(bus.status, BusStatus::Active);
        assert!(bus.is_bookable());
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let mut d = draft(50);
        d.name = "  ".to_string();
        assert_eq!(d.into_bus().unwrap_err(), CatalogError::MissingField("name"));
    }

    #[test]
    fn test_plate_number_is_required() {
        let mut d = draft(50);
        d.plate_number = None;
        assert_eq!(d.validate().unwrap_err(), CatalogError::MissingField("plate_number"));
    }

    #[test]
    fn test_capacity_edit_keeps_sold_seats() {
        let mut bus = draft(40).into_bus().unwrap();
        bus.available_seats = 30; // 10 sold

        bus.apply(draft(44)).unwrap();
        assert_eq!(bus.total_seats, 44);
        assert_eq!(bus.available_seats, 34);

        bus.apply(draft(8)).unwrap();
        assert_eq!(bus.available_seats, 0);
    }

    #[test]
    fn test_route_filter_is_case_insensitive() {
        let bus = draft(40).into_bus().unwrap();
        assert!(bus.serves(Some("douala"), None));
        assert!(bus.serves(None, Some("YAOUND")));
        assert!(!bus.serves(Some("Bamenda"), None));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [BusStatus::Active, BusStatus::Maintenance, BusStatus::Inactive] {
            assert_eq!(status.as_str().parse::<BusStatus>().unwrap(), status);
        }
        assert!("scrapped".parse::<BusStatus>().is_err());
    }
}
