use super::{bad_column, bad_value, DeskStore};
use crate::{
    appointment_scheduler::{Appointment, AppointmentStatus},
    error::DeskResult,
};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::params;

const APPOINTMENT_COLUMNS: &str = "appointment_id, client_id, record_id, date, time,
        dealer, language, status, confirmed, created_at, updated_at";

fn parse_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S").or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
}

fn appointment_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    let date: Option<NaiveDate> = row
        .get::<_, Option<String>>(3)?
        .map(|s| s.parse().map_err(|e| bad_column(3, e)))
        .transpose()?;
    let time: Option<NaiveTime> = row
        .get::<_, Option<String>>(4)?
        .map(|s| parse_time(&s).map_err(|e| bad_column(4, e)))
        .transpose()?;
    let status_raw: String = row.get(7)?;
    let status = AppointmentStatus::parse(&status_raw)
        .ok_or_else(|| bad_value(7, format!("unknown appointment status '{status_raw}'")))?;

    Ok(Appointment {
        appointment_id: row.get(0)?,
        client_id: row.get(1)?,
        record_id: row.get(2)?,
        date,
        time,
        dealer: row.get(5)?,
        language: row.get(6)?,
        status,
        confirmed: row.get::<_, i32>(8)? != 0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl DeskStore {
    pub fn insert_appointment(&self, a: &Appointment) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO appointment (
                appointment_id, client_id, record_id, date, time,
                dealer, language, status, confirmed, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                a.appointment_id,
                a.client_id,
                a.record_id,
                a.date.map(|d| d.to_string()),
                a.time.map(|t| t.format("%H:%M:%S").to_string()),
                a.dealer,
                a.language,
                a.status.as_str(),
                a.confirmed as i32,
                a.created_at,
                a.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn save_appointment(&self, a: &Appointment) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE appointment SET
                date = ?2, time = ?3, dealer = ?4, language = ?5,
                status = ?6, confirmed = ?7, updated_at = ?8
             WHERE appointment_id = ?1",
            params![
                a.appointment_id,
                a.date.map(|d| d.to_string()),
                a.time.map(|t| t.format("%H:%M:%S").to_string()),
                a.dealer,
                a.language,
                a.status.as_str(),
                a.confirmed as i32,
                a.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_appointment(&self, appointment_id: &str) -> DeskResult<Option<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointment WHERE appointment_id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![appointment_id], appointment_row_mapper)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// The record's single appointment, if any — record_id is UNIQUE.
    pub fn appointment_for_record(&self, record_id: &str) -> DeskResult<Option<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointment WHERE record_id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![record_id], appointment_row_mapper)?;
        rows.next().transpose().map_err(Into::into)
    }

    pub fn appointment_count_for_record(&self, record_id: &str) -> DeskResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM appointment WHERE record_id = ?1",
                params![record_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn delete_appointments_for_client(&self, client_id: &str) -> DeskResult<()> {
        self.conn.execute(
            "DELETE FROM appointment WHERE client_id = ?1",
            params![client_id],
        )?;
        Ok(())
    }
}
