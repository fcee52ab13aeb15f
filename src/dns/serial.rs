// SOA serial maintenance, YYYYMMDDnn convention
use chrono::{Datelike, NaiveDate};
use tracing::debug;
use crate::database::models::ZoneId;
use crate::database::store::ZoneStore;
use crate::error::StoreError;

/// `YYYYMMDD01` for the given day.
pub fn seed_serial(today: NaiveDate) -> u64 {
    let date = today.year() as u64 * 10_000 + today.month() as u64 * 100 + today.day() as u64;
    date * 100 + 1
}

pub fn next_serial(current: u64, today: NaiveDate) -> u64 {
    (current + 1).max(seed_serial(today))
}

/// Rewrite SOA content with the next serial in the third field. Returns the
/// new content and serial, `None` when the content has no numeric serial.
pub fn bump_soa_content(content: &str, today: NaiveDate) -> Option<(String, u64)> {
    let mut fields: Vec<String> = content.split_whitespace().map(str::to_string).collect();
    let current: u64 = fields.get(2)?.parse().ok()?;
    let serial = next_serial(current, today);
    fields[2] = serial.to_string();
    Some((fields.join(" "), serial))
}

/// Increment the serial of one zone inside the open store transaction.
pub async fn bump<S: ZoneStore + ?Sized>(
    store: &mut S,
    zone: ZoneId,
    zone_name: &str,
    today: NaiveDate,
) -> Result<u64, StoreError> {
    let content = store
        .soa_content(zone)
        .await?
        .ok_or_else(|| StoreError::MissingSoa { zone: zone_name.to_string() })?;

    let (updated, serial) = bump_soa_content(&content, today).ok_or_else(|| StoreError::MalformedSoa {
        zone: zone_name.to_string(),
        content: content.clone(),
    })?;

    store.update_soa(zone, &updated).await?;
    debug!("Serial for {} is now {}", zone_name, serial);
    Ok(serial)
}
