// PTR twins for address records in the covering reverse zone
use tracing::debug;
use crate::database::models::RecordQuery;
use crate::database::store::ZoneStore;
use crate::dns::directory::ZoneDirectory;
use crate::dns::record_types::{reverse_name, RecordType};
use crate::dns::zone::{in_zone, Record, Zone};
use crate::error::{EngineError, ValidationError};

/// Zone from `zones` holding `reverse`. The longest suffix wins so a /24
/// reverse zone beats an overlapping /16 one.
pub fn pick_zone<'a>(reverse: &str, zones: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    zones
        .into_iter()
        .filter(|zone| in_zone(reverse, zone))
        .max_by_key(|zone| zone.len())
}

async fn covering_zone<S: ZoneStore>(
    directory: &mut ZoneDirectory<S>,
    reverse: &str,
) -> Result<Option<Zone>, EngineError> {
    let zones = directory.list_zones().await?;
    let Some(name) = pick_zone(reverse, zones.iter().map(|zone| zone.name.as_str())) else {
        return Ok(None);
    };
    let name = name.to_string();
    Ok(directory.resolve(&name).await?)
}

fn absolute(owner: &str) -> String {
    format!("{}.", owner.trim().trim_end_matches('.').to_lowercase())
}

/// Build the PTR insert pointing `ip` back at `owner`.
///
/// Without `hint` the reverse zone is looked up among all zones.
pub async fn synthesize_reverse<S: ZoneStore>(
    directory: &mut ZoneDirectory<S>,
    ip: &str,
    owner: &str,
    hint: Option<&Zone>,
    default_ttl: u32,
) -> Result<Record, EngineError> {
    let owner = absolute(owner);
    let reverse = reverse_name(ip)?;

    let zone = match hint {
        Some(zone) => zone.clone(),
        None => covering_zone(directory, &reverse)
            .await?
            .ok_or_else(|| ValidationError::NoReverseZone { reverse: reverse.clone() })?,
    };

    if let Some(existing) = directory
        .records(&zone.name)
        .await?
        .iter()
        .find(|record| record.name == reverse)
    {
        return Err(ValidationError::ReverseExists {
            key: reverse,
            value: existing.content.clone(),
        }
        .into());
    }

    if !in_zone(&reverse, &zone.name) {
        return Err(ValidationError::WrongZone.into());
    }

    let key = zone.relative(&reverse);
    let query = RecordQuery::owner(zone.fqdn(&key))
        .with_type(RecordType::PTR)
        .with_content(owner.clone());
    if directory.exists_record(&zone, &query).await? {
        return Err(ValidationError::RecordExists.into());
    }

    debug!("Reverse for {} is {} in {}", ip, reverse, zone.name);
    Ok(Record::insert(&zone, &key, RecordType::PTR, owner, None, None, default_ttl))
}

/// Build the PTR delete matching `ip` and `owner`, if such a record exists.
///
/// A missing reverse zone or record yields `None`: the forward delete that
/// triggered this must still go ahead.
pub async fn reverse_delete<S: ZoneStore>(
    directory: &mut ZoneDirectory<S>,
    ip: &str,
    owner: &str,
    hint: Option<&Zone>,
) -> Result<Option<Record>, EngineError> {
    let owner = absolute(owner);
    let reverse = reverse_name(ip)?;

    let zone = match hint {
        Some(zone) => zone.clone(),
        None => match covering_zone(directory, &reverse).await? {
            Some(zone) => zone,
            None => {
                debug!("No reverse zone for {}, nothing to remove", reverse);
                return Ok(None);
            }
        },
    };

    let found = directory
        .records(&zone.name)
        .await?
        .iter()
        .find(|record| {
            record.name == reverse
                && record.rtype == RecordType::PTR.as_str()
                && absolute(&record.content) == owner
        })
        .cloned();

    let Some(found) = found else {
        debug!("No reverse record {} PTR {}", reverse, owner);
        return Ok(None);
    };

    debug!("Removing reverse record {} PTR {}", found.name, found.content);
    Ok(Some(Record::delete(
        &zone,
        &zone.relative(&reverse),
        RecordType::PTR,
        found.content,
        found.ttl,
        None,
    )))
}
