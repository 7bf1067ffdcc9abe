//! ODBC connector.
//!
//! Blocking variant for hosts where only a driver-manager setup is
//! available, and the only one supporting Windows integrated auth
//! (`Trusted_Connection=yes`).

use std::sync::OnceLock;

use odbc_api::{
    buffers::TextRowSet, parameter::InputParameter, ConnectionOptions, Cursor, Environment,
    IntoParameter, ResultSetMetadata,
};
use tracing::{debug, error, info};

use rpakit_core::{config::OdbcConfig, errors::Error, Result};

use crate::table::{Cell, Table};

const BATCH_SIZE: usize = 5000;
const MAX_TEXT_LEN: usize = 4096;

// One ODBC environment per process, shared by every connection.
static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

fn environment() -> Result<&'static Environment> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new().map_err(|e| Error::Db(format!("odbc environment: {e}")))?;
    Ok(ENVIRONMENT.get_or_init(|| env))
}

pub struct OdbcClient {
    conn: odbc_api::Connection<'static>,
}

impl OdbcClient {
    pub fn connect(cfg: &OdbcConfig) -> Result<Self> {
        let conn_str = connection_string(cfg)?;
        let conn = environment()?
            .connect_with_connection_string(&conn_str, ConnectionOptions::default())
            .map_err(|e| {
                error!(server = %cfg.server, "database connect failed: {e}");
                Error::Db(format!("database connection failed: {e}"))
            })?;

        info!(server = %cfg.server, database = %cfg.database, "connected to the sql database");
        Ok(Self { conn })
    }

    /// Run a SELECT and marshal the result set into a [`Table`].
    ///
    /// Placeholders are `?`, bound from `params` in order; everything comes
    /// back as text (the driver does the conversion).
    pub fn query(&self, sql: &str, params: &[&str]) -> Result<Table> {
        debug!(sql, ?params, "executing query");

        let params = boxed_params(params);
        let Some(mut cursor) = self
            .conn
            .execute(sql, params.as_slice())
            .map_err(query_err)?
        else {
            return Ok(Table::default());
        };

        let columns = cursor
            .column_names()
            .map_err(query_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(query_err)?;
        let mut table = Table::new(columns);

        let mut buffers =
            TextRowSet::for_cursor(BATCH_SIZE, &mut cursor, Some(MAX_TEXT_LEN)).map_err(query_err)?;
        let mut row_set_cursor = cursor.bind_buffer(&mut buffers).map_err(query_err)?;

        while let Some(batch) = row_set_cursor.fetch().map_err(query_err)? {
            for row in 0..batch.num_rows() {
                table.rows.push(
                    (0..batch.num_cols())
                        .map(|col| match batch.at(col, row) {
                            Some(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
                            None => Cell::Null,
                        })
                        .collect(),
                );
            }
        }

        info!(rows = table.len(), "query executed successfully");
        Ok(table)
    }

    /// Run a statement without a result set (INSERT/UPDATE/DELETE/DDL).
    /// The connection autocommits.
    pub fn execute(&self, sql: &str, params: &[&str]) -> Result<()> {
        debug!(sql, ?params, "executing statement");

        let params = boxed_params(params);
        self.conn
            .execute(sql, params.as_slice())
            .map_err(query_err)?;

        info!("statement executed successfully");
        Ok(())
    }
}

/// Build the ODBC connection string, preserving both auth modes.
pub fn connection_string(cfg: &OdbcConfig) -> Result<String> {
    if cfg.trusted {
        return Ok(format!(
            "Driver={{{}}};Server={};Database={};Trusted_Connection=yes;",
            cfg.driver, cfg.server, cfg.database
        ));
    }

    let (Some(username), Some(password)) = (&cfg.username, &cfg.password) else {
        return Err(Error::Config(
            "username and password are required for sql server authentication".to_string(),
        ));
    };

    Ok(format!(
        "Driver={{{}}};Server={};Database={};UID={};PWD={};",
        cfg.driver, cfg.server, cfg.database, username, password
    ))
}

fn boxed_params(params: &[&str]) -> Vec<Box<dyn InputParameter>> {
    params
        .iter()
        .map(|p| Box::new(p.to_string().into_parameter()) as Box<dyn InputParameter>)
        .collect()
}

fn query_err(e: odbc_api::Error) -> Error {
    error!("query execution failed: {e}");
    Error::Db(format!("query execution failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cfg() -> OdbcConfig {
        OdbcConfig {
            driver: "ODBC Driver 17 for SQL Server".to_string(),
            server: "db01".to_string(),
            database: "reporting".to_string(),
            trusted: false,
            username: Some("svc".to_string()),
            password: Some("secret".to_string()),
        }
    }

    #[test]
    fn trusted_connection_string_has_no_credentials() {
        let cfg = OdbcConfig {
            trusted: true,
            username: None,
            password: None,
            ..base_cfg()
        };
        let s = connection_string(&cfg).unwrap();
        assert_eq!(
            s,
            "Driver={ODBC Driver 17 for SQL Server};Server=db01;Database=reporting;Trusted_Connection=yes;"
        );
    }

    #[test]
    fn sql_auth_connection_string_carries_credentials() {
        let s = connection_string(&base_cfg()).unwrap();
        assert!(s.contains("UID=svc;"));
        assert!(s.contains("PWD=secret;"));
        assert!(!s.contains("Trusted_Connection"));
    }

    #[test]
    fn sql_auth_without_credentials_is_a_config_error() {
        let cfg = OdbcConfig {
            username: None,
            ..base_cfg()
        };
        assert!(matches!(connection_string(&cfg), Err(Error::Config(_))));
    }
}
