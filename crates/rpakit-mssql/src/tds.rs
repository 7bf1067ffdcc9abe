//! Native TDS connector (tiberius).

use tiberius::{AuthMethod, Client, ColumnData, Config, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, error, info};

use rpakit_core::{config::MssqlConfig, errors::Error, Result};

use crate::table::{Cell, Table};

pub struct MssqlClient {
    client: Client<Compat<TcpStream>>,
}

impl MssqlClient {
    /// Connect with SQL Server authentication.
    pub async fn connect(cfg: &MssqlConfig) -> Result<Self> {
        let mut config = Config::new();
        config.host(&cfg.server);
        config.port(cfg.port);
        config.authentication(AuthMethod::sql_server(&cfg.username, &cfg.password));
        if let Some(db) = &cfg.database {
            config.database(db);
        }
        config.trust_cert();

        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            error!(server = %cfg.server, port = cfg.port, "tcp connect failed: {e}");
            Error::Db(format!("connect to {}:{} failed: {e}", cfg.server, cfg.port))
        })?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| {
                error!("database connect failed: {e}");
                Error::Db(format!("database connect failed: {e}"))
            })?;

        info!(server = %cfg.server, database = ?cfg.database, "connected to the sql database");
        Ok(Self { client })
    }

    /// Run a SELECT and marshal the first result set into a [`Table`].
    ///
    /// Placeholders are `@P1`, `@P2`, … bound from `params` in order.
    pub async fn query(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<Table> {
        debug!(sql, "executing query");

        let mut stream = self
            .client
            .query(sql, params)
            .await
            .map_err(db_err("query"))?;

        let columns: Vec<String> = stream
            .columns()
            .await
            .map_err(db_err("column metadata"))?
            .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows = stream
            .into_first_result()
            .await
            .map_err(db_err("fetch"))?;

        let mut table = Table::new(columns);
        for row in rows {
            table
                .rows
                .push(row.into_iter().map(cell_from_column_data).collect());
        }

        info!(rows = table.len(), "query executed successfully");
        Ok(table)
    }

    /// Run a statement that returns no rows; yields the affected-row count.
    pub async fn execute(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<u64> {
        debug!(sql, "executing statement");

        let result = self
            .client
            .execute(sql, params)
            .await
            .map_err(db_err("execute"))?;

        let affected = result.total();
        info!(rows = affected, "statement executed successfully");
        Ok(affected)
    }

    pub async fn close(self) -> Result<()> {
        self.client.close().await.map_err(|e| {
            error!("disconnect failed: {e}");
            Error::Db(format!("disconnect failed: {e}"))
        })?;
        info!("disconnected from the sql database");
        Ok(())
    }
}

fn db_err(action: &'static str) -> impl Fn(tiberius::error::Error) -> Error {
    move |e| {
        error!("{action} failed: {e}");
        Error::Db(format!("{action} failed: {e}"))
    }
}

fn cell_from_column_data(data: ColumnData<'static>) -> Cell {
    match data {
        ColumnData::Bit(v) => v.map(Cell::Bool).unwrap_or(Cell::Null),
        ColumnData::U8(v) => v.map(|n| Cell::Int(i64::from(n))).unwrap_or(Cell::Null),
        ColumnData::I16(v) => v.map(|n| Cell::Int(i64::from(n))).unwrap_or(Cell::Null),
        ColumnData::I32(v) => v.map(|n| Cell::Int(i64::from(n))).unwrap_or(Cell::Null),
        ColumnData::I64(v) => v.map(Cell::Int).unwrap_or(Cell::Null),
        ColumnData::F32(v) => v.map(|n| Cell::Float(f64::from(n))).unwrap_or(Cell::Null),
        ColumnData::F64(v) => v.map(Cell::Float).unwrap_or(Cell::Null),
        ColumnData::String(v) => v.map(|s| Cell::Text(s.into_owned())).unwrap_or(Cell::Null),
        ColumnData::Binary(v) => v.map(|b| Cell::Bytes(b.into_owned())).unwrap_or(Cell::Null),
        ColumnData::Guid(v) => v.map(|g| Cell::Text(g.to_string())).unwrap_or(Cell::Null),
        // Dates, numerics and the exotic types keep their wire repr as text.
        other => Cell::Text(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_and_nulls_map_to_cells() {
        assert_eq!(cell_from_column_data(ColumnData::I32(Some(7))), Cell::Int(7));
        assert_eq!(cell_from_column_data(ColumnData::I32(None)), Cell::Null);
        assert_eq!(
            cell_from_column_data(ColumnData::Bit(Some(true))),
            Cell::Bool(true)
        );
    }

    #[test]
    fn strings_are_owned() {
        let data = ColumnData::String(Some("hello".into()));
        assert_eq!(
            cell_from_column_data(data),
            Cell::Text("hello".to_string())
        );
    }
}
