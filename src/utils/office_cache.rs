use std::time::Duration;

use futures::lock::Mutex;
use moka::future::Cache;
use once_cell::sync::{Lazy, OnceCell};
use sqlx::MySqlPool;
use tracing::{debug, warn};

use crate::{
    config::Config,
    db,
    model::office_location::{OfficeLocation, OfficeSource},
};

// only one office, so the key is constant
const KEY: () = ();

static OFFICE_CACHE: OnceCell<Cache<(), OfficeLocation>> = OnceCell::new();

// Held while filling the cache from the table and while publishing an update,
// so a fill that read the old row cannot land after the new one.
static REFILL: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn cache(ttl_secs: u64) -> &'static Cache<(), OfficeLocation> {
    OFFICE_CACHE.get_or_init(|| {
        Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    })
}

/// Office from the `office_location` table, or the configured default when the table is empty.
pub async fn effective_office(
    pool: &MySqlPool,
    config: &Config,
) -> Result<OfficeLocation, sqlx::Error> {
    let cache = cache(config.office_cache_ttl_secs);

    if let Some(office) = cache.get(&KEY).await {
        return Ok(office);
    }

    let _refill = REFILL.lock().await;
    if let Some(office) = cache.get(&KEY).await {
        return Ok(office);
    }

    let office = match db::office::fetch(pool).await? {
        Some(row) => OfficeLocation::from(row),
        None => OfficeLocation::from_config(config),
    };
    debug!(source = ?office.source, "Loaded office location");

    cache.insert(KEY, office.clone()).await;
    Ok(office)
}

/// Makes a committed office update visible immediately.
pub async fn publish(config: &Config, office: OfficeLocation) {
    let _refill = REFILL.lock().await;
    cache(config.office_cache_ttl_secs).insert(KEY, office).await;
}

/// Warns at startup when check-ins would be measured against an unset default office.
pub async fn warn_if_unconfigured(pool: &MySqlPool, config: &Config) {
    if config.office_configured {
        return;
    }

    match effective_office(pool, config).await {
        Ok(office) if office.source == OfficeSource::Default => warn!(
            latitude = office.latitude,
            longitude = office.longitude,
            "No office location stored and OFFICE_LATITUDE/OFFICE_LONGITUDE unset; check-ins will fail the geofence"
        ),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Could not read office location at startup"),
    }
}

/// Office every test that touches the shared cache agrees on.
#[cfg(test)]
pub fn test_office() -> OfficeLocation {
    OfficeLocation {
        latitude: 41.311081,
        longitude: 69.240562,
        radius: 0.5,
        source: OfficeSource::Database,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[actix_web::test]
    async fn published_office_is_served_without_the_database() {
        let config = test_config();
        // never connects; a table read would fail
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();

        publish(&config, test_office()).await;
        let office = effective_office(&pool, &config).await.unwrap();

        assert_eq!(office.latitude, test_office().latitude);
        assert_eq!(office.longitude, test_office().longitude);
        assert_eq!(office.source, OfficeSource::Database);
    }
}
