use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{config::Config, utils::geo::Geofence};

#[derive(Debug, Clone, FromRow)]
pub struct OfficeLocationRow {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OfficeSource {
    Database,
    Default,
}

/// The office that check-in/out is measured against.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OfficeLocation {
    #[schema(example = 41.311081)]
    pub latitude: f64,
    #[schema(example = 69.240562)]
    pub longitude: f64,
    /// Radius in kilometres
    #[schema(example = 0.5)]
    pub radius: f64,
    pub source: OfficeSource,
}

impl OfficeLocation {
    pub fn from_config(config: &Config) -> Self {
        Self {
            latitude: config.office_latitude,
            longitude: config.office_longitude,
            radius: config.office_radius_km,
            source: OfficeSource::Default,
        }
    }

    pub fn geofence(&self) -> Geofence {
        Geofence {
            latitude: self.latitude,
            longitude: self.longitude,
            radius_km: self.radius,
        }
    }
}

impl From<OfficeLocationRow> for OfficeLocation {
    fn from(row: OfficeLocationRow) -> Self {
        Self {
            latitude: row.latitude,
            longitude: row.longitude,
            radius: row.radius,
            source: OfficeSource::Database,
        }
    }
}
