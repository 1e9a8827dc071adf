use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::{require, CatalogError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    #[default]
    Scheduled,
    Departed,
    Arrived,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::Departed => "departed",
            ScheduleStatus::Arrived => "arrived",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ScheduleStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ScheduleStatus::Scheduled),
            "departed" => Ok(ScheduleStatus::Departed),
            "arrived" => Ok(ScheduleStatus::Arrived),
            "cancelled" => Ok(ScheduleStatus::Cancelled),
            other => Err(CatalogError::UnknownStatus(other.to_string())),
        }
    }
}

/// A timetable entry shown in the admin console.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub id: Uuid,
    pub bus_name: String,
    pub route: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub driver: String,
    pub status: ScheduleStatus,
    pub price: i64,
    pub available_seats: i32,
    pub total_seats: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDraft {
    pub bus_name: String,
    pub route: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub driver: String,
    pub price: i64,
    pub total_seats: i32,
}

impl ScheduleDraft {
    pub fn validate(&self) -> Result<(), CatalogError> {
        require(&self.bus_name, "bus_name")?;
        require(&self.route, "route")?;
        require(&self.departure_time, "departure_time")?;
        require(&self.arrival_time, "arrival_time")?;
        require(&self.driver, "driver")?;
        if self.total_seats <= 0 {
            return Err(CatalogError::InvalidValue {
                field: "total_seats",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn into_schedule(self) -> Result<Schedule, CatalogError> {
        self.validate()?;
        Ok(Schedule {
            id: Uuid::new_v4(),
            bus_name: self.bus_name,
            route: self.route,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            driver: self.driver,
            status: ScheduleStatus::Scheduled,
            price: self.price,
            available_seats: self.total_seats,
            total_seats: self.total_seats,
        })
    }
}

/// `None` means "all".
pub fn filter_by_status(schedules: Vec<Schedule>, status: Option<ScheduleStatus>) -> Vec<Schedule> {
    match status {
        Some(wanted) => schedules.into_iter().filter(|s| s.status == wanted).collect(),
        None => schedules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(status: ScheduleStatus) -> Schedule {
        let mut s = ScheduleDraft {
            bus_name: "Camair Express".to_string(),
            route: "Douala → Yaoundé".to_string(),
            departure_time: "07:30".to_string(),
            arrival_time: "10:45".to_string(),
            driver: "Tabi James".to_string(),
            price: 5000,
            total_seats: 45,
        }
        .into_schedule()
        .unwrap();
        s.status = status;
        s
    }

    #[test]
    fn test_filter_by_status() {
        let all = vec![
            schedule(ScheduleStatus::Scheduled),
            schedule(ScheduleStatus::Departed),
            schedule(ScheduleStatus::Scheduled),
        ];

        assert_eq!(filter_by_status(all.clone(), None).len(), 3);
        assert_eq!(filter_by_status(all.clone(), Some(ScheduleStatus::Scheduled)).len(), 2);
        assert!(filter_by_status(all, Some(ScheduleStatus::Cancelled)).is_empty());
    }

    #[test]
    fn test_missing_driver() {
        let mut draft = ScheduleDraft {
            bus_name: "Moghamo Express".to_string(),
            route: "Bamenda → Buea".to_string(),
            departure_time: "06:00".to_string(),
            arrival_time: "12:30".to_string(),
            driver: String::new(),
            price: 5500,
            total_seats: 40,
        };
        assert_eq!(draft.validate().unwrap_err(), CatalogError::MissingField("driver"));

        draft.driver = "Fon Peter".to_string();
        assert!(draft.validate().is_ok());
    }
}
