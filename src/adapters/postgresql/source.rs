//! PostgreSQL record source
//!
//! Runs the configured query with the filter bound to `$1` (identity), `$2`
//! (date_start) and `$3` (date_end). Date parameters are bound according to
//! the type PostgreSQL infers for them, so the query can compare them with
//! `date`, `timestamp`, `timestamptz` or text columns directly. Every result
//! cell is converted to an optional string.

use super::client::{PgClientError, PostgresClient};
use crate::adapters::traits::RecordSource;
use crate::domain::{RecordTable, Result, SourceError, SourceFilter};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::Row;

type BoxedParam = Box<dyn ToSql + Sync + Send>;

fn source_error(e: PgClientError) -> SourceError {
    match e {
        PgClientError::Pool(e) => SourceError::ConnectionFailed(e.to_string()),
        PgClientError::Postgres(e) => SourceError::QueryFailed(e.to_string()),
    }
}

/// Record source reading from PostgreSQL
pub struct PostgresRecordSource {
    client: Arc<PostgresClient>,
    query: String,
    id_column: String,
}

impl PostgresRecordSource {
    pub fn new(client: Arc<PostgresClient>, query: impl Into<String>, id_column: impl Into<String>) -> Self {
        Self {
            client,
            query: query.into(),
            id_column: id_column.into(),
        }
    }
}

/// Bind a date bound to the parameter type the server inferred
fn date_param(position: usize, date: NaiveDate, ty: &Type) -> std::result::Result<BoxedParam, SourceError> {
    let midnight: NaiveDateTime = date.and_time(NaiveTime::MIN);
    match *ty {
        Type::DATE => Ok(Box::new(date)),
        Type::TIMESTAMP => Ok(Box::new(midnight)),
        Type::TIMESTAMPTZ => Ok(Box::new(Utc.from_utc_datetime(&midnight))),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => Ok(Box::new(date.format("%Y-%m-%d").to_string())),
        ref other => Err(SourceError::QueryFailed(format!(
            "parameter ${} is inferred as {}; cast it to date in the query",
            position,
            other.name()
        ))),
    }
}

/// Convert a single cell to its string form
fn cell_to_string(row: &Row, index: usize, column: &str, ty: &Type) -> std::result::Result<Option<String>, SourceError> {
    let invalid = |e: tokio_postgres::Error| SourceError::InvalidData(format!("column '{}': {}", column, e));

    let value = match *ty {
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(index).map_err(invalid)?
        }
        Type::INT2 => row.try_get::<_, Option<i16>>(index).map_err(invalid)?.map(|v| v.to_string()),
        Type::INT4 => row.try_get::<_, Option<i32>>(index).map_err(invalid)?.map(|v| v.to_string()),
        Type::INT8 => row.try_get::<_, Option<i64>>(index).map_err(invalid)?.map(|v| v.to_string()),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(index).map_err(invalid)?.map(|v| v.to_string()),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index).map_err(invalid)?.map(|v| v.to_string()),
        Type::BOOL => row.try_get::<_, Option<bool>>(index).map_err(invalid)?.map(|v| v.to_string()),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(index)
            .map_err(invalid)?
            .map(|v| v.format("%Y-%m-%d").to_string()),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(index)
            .map_err(invalid)?
            .map(|v| v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(index)
            .map_err(invalid)?
            .map(|v| v.to_rfc3339()),
        ref other => {
            return Err(SourceError::UnsupportedColumnType {
                column: column.to_string(),
                type_name: other.name().to_string(),
            })
        }
    };
    Ok(value)
}

#[async_trait]
impl RecordSource for PostgresRecordSource {
    async fn fetch(&self, filter: &SourceFilter) -> Result<RecordTable> {
        let client = self.client.get_connection().await.map_err(source_error)?;
        let statement = client
            .prepare_cached(&self.query)
            .await
            .map_err(|e| SourceError::QueryFailed(e.to_string()))?;

        let param_types = statement.params();
        if param_types.len() != 3 {
            return Err(SourceError::QueryFailed(format!(
                "query must take exactly 3 parameters, found {}",
                param_types.len()
            ))
            .into());
        }

        let params: Vec<BoxedParam> = vec![
            Box::new(filter.identity.as_str().to_string()),
            date_param(2, filter.date_start, &param_types[1])?,
            date_param(3, filter.date_end, &param_types[2])?,
        ];
        let param_refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let columns: Vec<(String, Type)> = statement
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.type_().clone()))
            .collect();

        tracing::debug!(
            identity = %filter.identity,
            date_start = %filter.date_start,
            date_end = %filter.date_end,
            "Querying candidate records"
        );

        let rows = client
            .query(&statement, &param_refs)
            .await
            .map_err(|e| SourceError::QueryFailed(e.to_string()))?;

        let mut table = RecordTable::new(
            columns.iter().map(|(name, _)| name.clone()).collect(),
            &self.id_column,
        )?;
        for row in &rows {
            let values = columns
                .iter()
                .enumerate()
                .map(|(index, (name, ty))| cell_to_string(row, index, name, ty))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            table.push_row(values)?;
        }

        tracing::info!(rows = table.len(), source = %self.describe(), "Candidate records fetched");
        Ok(table)
    }

    fn describe(&self) -> String {
        format!("postgresql source {}", self.client.connection_string_safe())
    }
}
