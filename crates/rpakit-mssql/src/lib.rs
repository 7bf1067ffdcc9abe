//! SQL Server connectors.
//!
//! Two variants with one result shape:
//!
//! - [`tds::MssqlClient`]: native TDS over TCP (async), SQL Server auth.
//! - [`odbc::OdbcClient`]: ODBC (blocking), the only variant supporting
//!   Windows integrated auth.
//!
//! Both marshal result sets into [`Table`], which also offers the rows as
//! column-name → cell maps via [`Table::records`].

pub mod odbc;
pub mod table;
pub mod tds;

pub use table::{Cell, Table};
