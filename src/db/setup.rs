use std::path::Path;

use rusqlite::Connection;

use super::migrations::run_migrations;

/// Open (or create) the ticket store at `path` and bring its schema up to date.
pub fn init_db(path: impl AsRef<Path>) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path.as_ref())?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA cache_size = -64000;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    run_migrations(&conn)?;
    log::info!("Ticket store ready at {}", path.as_ref().display());

    Ok(conn)
}
