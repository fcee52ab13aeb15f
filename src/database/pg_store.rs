// Runtime SQL queries against the PowerDNS gpgsql schema
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::debug;
use crate::database::models::{NewRecord, RecordQuery, RecordView, ZoneId, ZoneSummary};
use crate::database::store::ZoneStore;
use crate::error::StoreError;

/// Store backed by one PostgreSQL transaction, opened on first use and
/// finalized by `commit` or `rollback`.
pub struct PgStore {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    async fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                debug!("Opening store transaction");
                self.pool.begin().await?
            }
        };
        let tx = self.tx.insert(tx);
        Ok(&mut **tx)
    }
}

fn to_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn push_predicates(builder: &mut QueryBuilder<'_, Postgres>, zone: ZoneId, query: &RecordQuery) {
    builder.push(" WHERE domain_id = ").push_bind(zone.0);
    if let Some(name) = &query.name {
        builder.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(rtype) = &query.rtype {
        builder.push(" AND type = ").push_bind(rtype.as_str().to_string());
    }
    if let Some(content) = &query.content {
        builder.push(" AND content = ").push_bind(content.clone());
    }
    if let Some(ttl) = query.ttl {
        builder.push(" AND ttl = ").push_bind(to_db(ttl));
    }
    if let Some(priority) = query.priority {
        builder.push(" AND prio = ").push_bind(i32::from(priority));
    }
}

fn record_view(row: &PgRow) -> Result<RecordView, StoreError> {
    let ttl: Option<i32> = row.try_get("ttl")?;
    let priority: Option<i32> = row.try_get("prio")?;

    Ok(RecordView {
        name: row.try_get("name")?,
        rtype: row.try_get("type")?,
        ttl: ttl.and_then(|ttl| u32::try_from(ttl).ok()),
        priority: priority.and_then(|priority| u16::try_from(priority).ok()),
        content: row.try_get("content")?,
    })
}

#[async_trait]
impl ZoneStore for PgStore {
    async fn zone_id(&mut self, name: &str) -> Result<Option<ZoneId>, StoreError> {
        let conn = self.conn().await?;
        let row = sqlx::query(
            r#"
            SELECT id
            FROM domains
            WHERE name = $1
            "#
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(Some(ZoneId(row.try_get("id")?))),
            None => Ok(None),
        }
    }

    async fn list_zones(&mut self) -> Result<Vec<ZoneSummary>, StoreError> {
        let conn = self.conn().await?;
        let rows = sqlx::query(
            r#"
            SELECT name, type, notified_serial::bigint AS notified_serial
            FROM domains
            ORDER BY name
            "#
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut zones = Vec::with_capacity(rows.len());
        for row in rows {
            zones.push(ZoneSummary {
                name: row.try_get("name")?,
                kind: row.try_get("type")?,
                notified_serial: row.try_get("notified_serial")?,
            });
        }

        Ok(zones)
    }

    async fn insert_zone(&mut self, name: &str, master: &str) -> Result<ZoneId, StoreError> {
        let conn = self.conn().await?;
        let row = sqlx::query(
            r#"
            INSERT INTO domains (name, last_check, notified_serial, type, master, account)
            VALUES ($1, NULL, 0, 'MASTER', $2, '')
            RETURNING id
            "#
        )
        .bind(name)
        .bind(master)
        .fetch_one(&mut *conn)
        .await?;

        Ok(ZoneId(row.try_get("id")?))
    }

    async fn delete_zone(&mut self, zone: ZoneId) -> Result<(), StoreError> {
        let conn = self.conn().await?;
        sqlx::query(
            r#"
            DELETE FROM domains
            WHERE id = $1
            "#
        )
        .bind(zone.0)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn fetch_records(
        &mut self,
        zone: ZoneId,
        query: &RecordQuery,
    ) -> Result<Vec<RecordView>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT coalesce(name, '') AS name, coalesce(type, '') AS type, ttl, prio, \
             coalesce(content, '') AS content FROM records",
        );
        push_predicates(&mut builder, zone, query);
        builder.push(" ORDER BY name, type, content");

        let conn = self.conn().await?;
        let rows = builder.build().fetch_all(&mut *conn).await?;

        rows.iter().map(record_view).collect()
    }

    async fn insert_record(&mut self, zone: ZoneId, record: &NewRecord) -> Result<(), StoreError> {
        let conn = self.conn().await?;
        sqlx::query(
            r#"
            INSERT INTO records (domain_id, name, type, content, ttl, prio)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        )
        .bind(zone.0)
        .bind(&record.name)
        .bind(record.rtype.as_str())
        .bind(&record.content)
        .bind(record.ttl.map(to_db))
        .bind(record.priority.map(i32::from))
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn delete_records(&mut self, zone: ZoneId, query: &RecordQuery) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("DELETE FROM records");
        push_predicates(&mut builder, zone, query);

        let conn = self.conn().await?;
        let result = builder.build().execute(&mut *conn).await?;

        Ok(result.rows_affected())
    }

    async fn soa_content(&mut self, zone: ZoneId) -> Result<Option<String>, StoreError> {
        let conn = self.conn().await?;
        let row = sqlx::query(
            r#"
            SELECT content
            FROM records
            WHERE domain_id = $1 AND type = 'SOA'
            LIMIT 1
            "#
        )
        .bind(zone.0)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(row.try_get("content")?),
            None => Ok(None),
        }
    }

    async fn update_soa(&mut self, zone: ZoneId, content: &str) -> Result<(), StoreError> {
        let conn = self.conn().await?;
        sqlx::query(
            r#"
            UPDATE records
            SET content = $1
            WHERE domain_id = $2 AND type = 'SOA'
            "#
        )
        .bind(content)
        .bind(zone.0)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            debug!("Store transaction committed");
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            debug!("Store transaction rolled back");
        }
        Ok(())
    }
}
