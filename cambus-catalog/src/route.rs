use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::{contains_ignore_case, require, CatalogError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    #[default]
    Active,
    Suspended,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Active => "active",
            RouteStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for RouteStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RouteStatus::Active),
            "suspended" => Ok(RouteStatus::Suspended),
            other => Err(CatalogError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub distance_km: i32,
    pub price: i64,
    pub status: RouteStatus,
}

impl Route {
    pub fn matches(&self, term: &str) -> bool {
        contains_ignore_case(&self.from, term) || contains_ignore_case(&self.to, term)
    }

    pub fn apply(&mut self, draft: RouteDraft) -> Result<(), CatalogError> {
        draft.validate()?;
        self.from = draft.from;
        self.to = draft.to;
        self.distance_km = draft.distance_km;
        self.price = draft.price;
        if let Some(status) = draft.status {
            self.status = status;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDraft {
    pub from: String,
    pub to: String,
    pub distance_km: i32,
    pub price: i64,
    pub status: Option<RouteStatus>,
}

impl RouteDraft {
    pub fn validate(&self) -> Result<(), CatalogError> {
        require(&self.from, "from")?;
        require(&self.to, "to")?;
        if self.distance_km <= 0 {
            return Err(CatalogError::MissingField("distance_km"));
        }
        if self.price <= 0 {
            return Err(CatalogError::MissingField("price"));
        }
        Ok(())
    }

    pub fn into_route(self) -> Result<Route, CatalogError> {
        self.validate()?;
        Ok(Route {
            id: Uuid::new_v4(),
            from: self.from,
            to: self.to,
            distance_km: self.distance_km,
            price: self.price,
            status: self.status.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> RouteDraft {
        RouteDraft {
            from: "Douala".to_string(),
            to: "Limbe".to_string(),
            distance_km: 65,
            price: 2000,
            status: None,
        }
    }

    #[test]
    fn test_zero_distance_counts_as_missing() {
        let mut d = draft();
        d.distance_km = 0;
        assert_eq!(d.validate().unwrap_err(), CatalogError::MissingField("distance_km"));
    }

    #[test]
    fn test_search_matches_either_end() {
        let route = draft().into_route().unwrap();
        assert!(route.matches("limb"));
        assert!(route.matches("DOUALA"));
        assert!(!route.matches("Buea"));
    }

    #[test]
    fn test_edit_keeps_status_unless_given() {
        let mut route = draft().into_route().unwrap();
        route.status = RouteStatus::Suspended;

        let mut edit = draft();
        edit.price = 2500;
        route.apply(edit).unwrap();

        assert_eq!(route.price, 2500);
        assert_eq!(route.status, RouteStatus::Suspended);
    }
}
