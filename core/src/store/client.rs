use super::{bad_value, DeskStore};
use crate::{client_directory::Client, error::DeskResult, notify::Channel};
use rusqlite::params;

fn client_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Client> {
    let channel_raw: String = row.get(6)?;
    let preferred_channel = Channel::parse(&channel_raw)
        .ok_or_else(|| bad_value(6, format!("unknown channel '{channel_raw}'")))?;
    Ok(Client {
        client_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        address: row.get(5)?,
        preferred_channel,
        id_uploaded: row.get::<_, i32>(7)? != 0,
        income_uploaded: row.get::<_, i32>(8)? != 0,
        residence_uploaded: row.get::<_, i32>(9)? != 0,
        deleted: row.get::<_, i32>(10)? != 0,
        deleted_at: row.get(11)?,
        created_at: row.get(12)?,
    })
}

const CLIENT_COLUMNS: &str = "client_id, first_name, last_name, phone, email, address,
        preferred_channel, id_uploaded, income_uploaded, residence_uploaded,
        deleted, deleted_at, created_at";

impl DeskStore {
    pub fn insert_client(&self, c: &Client) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO client (
                client_id, first_name, last_name, phone, email, address,
                preferred_channel, id_uploaded, income_uploaded, residence_uploaded,
                deleted, deleted_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                c.client_id,
                c.first_name,
                c.last_name,
                c.phone,
                c.email,
                c.address,
                c.preferred_channel.as_str(),
                c.id_uploaded as i32,
                c.income_uploaded as i32,
                c.residence_uploaded as i32,
                c.deleted as i32,
                c.deleted_at,
                c.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn save_client(&self, c: &Client) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE client SET
                first_name = ?2, last_name = ?3, phone = ?4, email = ?5, address = ?6,
                preferred_channel = ?7, id_uploaded = ?8, income_uploaded = ?9,
                residence_uploaded = ?10, deleted = ?11, deleted_at = ?12
             WHERE client_id = ?1",
            params![
                c.client_id,
                c.first_name,
                c.last_name,
                c.phone,
                c.email,
                c.address,
                c.preferred_channel.as_str(),
                c.id_uploaded as i32,
                c.income_uploaded as i32,
                c.residence_uploaded as i32,
                c.deleted as i32,
                c.deleted_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_client(&self, client_id: &str) -> DeskResult<Option<Client>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client WHERE client_id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![client_id], client_row_mapper)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// Live or trashed clients, ordered by name.
    pub fn clients_where(&self, deleted: bool) -> DeskResult<Vec<Client>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client WHERE deleted = ?1
             ORDER BY first_name, last_name"
        ))?;
        let rows = stmt.query_map(params![deleted as i32], client_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Exact phone match, live clients only.
    pub fn clients_by_phone(&self, phone: &str) -> DeskResult<Vec<Client>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client WHERE phone = ?1 AND deleted = 0"
        ))?;
        let rows = stmt.query_map(params![phone], client_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_client_row(&self, client_id: &str) -> DeskResult<()> {
        self.conn
            .execute("DELETE FROM client WHERE client_id = ?1", params![client_id])?;
        Ok(())
    }
}
