use duckdb::Connection;
use log::info;
use postgres::{Client, NoTls};

use crate::{config::WarehouseConfig, errors::Result, sql::quote_literal};

/// Name the warehouse is attached under inside the bulk engine.
pub const WAREHOUSE_ALIAS: &str = "warehouse";

/// Anything that can run a batch of SQL statements.
pub trait SqlExecutor {
    fn execute_batch(&mut self, sql: &str) -> Result<()>;
}

/// PostgreSQL warehouse connection, opened on first use.
pub struct PostgresWarehouse {
    config: WarehouseConfig,
    client: Option<Client>,
}

impl PostgresWarehouse {
    pub fn new(config: &WarehouseConfig) -> PostgresWarehouse {
        PostgresWarehouse {
            config: config.clone(),
            client: None,
        }
    }

    fn client(&mut self) -> Result<&mut Client> {
        let client = match self.client.take() {
            Some(client) => client,
            None => {
                info!(host = self.config.host.as_str(), dbname = self.config.dbname.as_str(); "Connecting to warehouse");
                Client::connect(&self.config.connection_string(), NoTls)?
            }
        };
        Ok(self.client.insert(client))
    }
}

impl SqlExecutor for PostgresWarehouse {
    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.client()?.batch_execute(sql)?;
        Ok(())
    }
}

/// Embedded DuckDB used as the bridge between Parquet files and the warehouse.
pub struct DuckDbEngine {
    conn: Connection,
    /// Connection string of a warehouse still to be attached.
    pending_attach: Option<String>,
}

impl DuckDbEngine {
    pub fn open_in_memory() -> Result<DuckDbEngine> {
        Ok(DuckDbEngine {
            conn: Connection::open_in_memory()?,
            pending_attach: None,
        })
    }

    /// In-memory engine that attaches the warehouse as [`WAREHOUSE_ALIAS`] before its first
    /// statement.
    pub fn attached_to(config: &WarehouseConfig) -> Result<DuckDbEngine> {
        let mut engine = DuckDbEngine::open_in_memory()?;
        engine.pending_attach = Some(config.connection_string());
        Ok(engine)
    }

    fn attach_postgres(&self, conninfo: &str) -> Result<()> {
        let sql = format!(
            "INSTALL postgres;
             LOAD postgres;
             ATTACH {} AS {} (TYPE POSTGRES);",
            quote_literal(conninfo),
            WAREHOUSE_ALIAS
        );
        self.conn.execute_batch(&sql)?;
        info!(alias = WAREHOUSE_ALIAS; "Warehouse attached to bulk engine");
        Ok(())
    }

    #[cfg(test)]
    pub fn try_clone(&self) -> Result<DuckDbEngine> {
        Ok(DuckDbEngine {
            conn: self.conn.try_clone()?,
            pending_attach: None,
        })
    }

    #[cfg(test)]
    pub fn query_count(&self, sql: &str) -> Result<i64> {
        Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
    }
}

impl SqlExecutor for DuckDbEngine {
    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        if let Some(conninfo) = &self.pending_attach {
            self.attach_postgres(conninfo)?;
            self.pending_attach = None;
        }
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}
