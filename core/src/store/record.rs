use super::{bad_column, bad_value, DeskStore};
use crate::{
    error::DeskResult,
    record_lifecycle::{DownPaymentLine, FinanceStatus, Record, RecordStatus},
};
use chrono::NaiveDate;
use rusqlite::params;

const RECORD_COLUMNS: &str = "record_id, client_id, salesperson_id, opportunity_number,
        has_id, id_type, has_poi, poi_type, ssn, itin, has_por, por_types,
        employer, job_title, monthly_income, months_at_job,
        bank_name, has_deposit, deposit_amount,
        has_auto_loan, auto_loan_bank, auto_loan_payment, down_payment,
        dealer, finance_status, vehicle, sale_date,
        record_status, commission_percentage, commission_value, commission_locked,
        collaborator_id, deleted, version, created_at, updated_at";

fn record_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let por_json: String = row.get(11)?;
    let por_types: Vec<String> =
        serde_json::from_str(&por_json).map_err(|e| bad_column(11, e))?;
    let dp_json: String = row.get(22)?;
    let down_payment: Vec<DownPaymentLine> =
        serde_json::from_str(&dp_json).map_err(|e| bad_column(22, e))?;

    let finance_raw: String = row.get(24)?;
    let finance_status = FinanceStatus::parse(&finance_raw)
        .ok_or_else(|| bad_value(24, format!("unknown finance_status '{finance_raw}'")))?;

    let sale_date: Option<NaiveDate> = row
        .get::<_, Option<String>>(26)?
        .map(|s| s.parse().map_err(|e| bad_column(26, e)))
        .transpose()?;

    let record_status = row
        .get::<_, Option<String>>(27)?
        .map(|s| {
            RecordStatus::parse(&s)
                .ok_or_else(|| bad_value(27, format!("unknown record_status '{s}'")))
        })
        .transpose()?;

    Ok(Record {
        record_id: row.get(0)?,
        client_id: row.get(1)?,
        salesperson_id: row.get(2)?,
        opportunity_number: row.get(3)?,
        has_id: row.get::<_, i32>(4)? != 0,
        id_type: row.get(5)?,
        has_poi: row.get::<_, i32>(6)? != 0,
        poi_type: row.get(7)?,
        ssn: row.get(8)?,
        itin: row.get(9)?,
        has_por: row.get::<_, i32>(10)? != 0,
        por_types,
        employer: row.get(12)?,
        job_title: row.get(13)?,
        monthly_income: row.get(14)?,
        months_at_job: row.get(15)?,
        bank_name: row.get(16)?,
        has_deposit: row.get::<_, i32>(17)? != 0,
        deposit_amount: row.get(18)?,
        has_auto_loan: row.get::<_, i32>(19)? != 0,
        auto_loan_bank: row.get(20)?,
        auto_loan_payment: row.get(21)?,
        down_payment,
        dealer: row.get(23)?,
        finance_status,
        vehicle: row.get(25)?,
        sale_date,
        record_status,
        commission_percentage: row.get(28)?,
        commission_value: row.get(29)?,
        commission_locked: row.get::<_, i32>(30)? != 0,
        collaborator_id: row.get(31)?,
        collaborator_name: None,
        deleted: row.get::<_, i32>(32)? != 0,
        version: row.get(33)?,
        created_at: row.get(34)?,
        updated_at: row.get(35)?,
    })
}

impl DeskStore {
    pub fn insert_record(&self, r: &Record) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO record (
                record_id, client_id, salesperson_id, opportunity_number,
                has_id, id_type, has_poi, poi_type, ssn, itin, has_por, por_types,
                employer, job_title, monthly_income, months_at_job,
                bank_name, has_deposit, deposit_amount,
                has_auto_loan, auto_loan_bank, auto_loan_payment, down_payment,
                dealer, finance_status, vehicle, sale_date,
                record_status, commission_percentage, commission_value, commission_locked,
                collaborator_id, deleted, version, created_at, updated_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,
                      ?19,?20,?21,?22,?23,?24,?25,?26,?27,?28,?29,?30,?31,?32,?33,?34,?35,?36)",
            params![
                r.record_id,
                r.client_id,
                r.salesperson_id,
                r.opportunity_number,
                r.has_id as i32,
                r.id_type,
                r.has_poi as i32,
                r.poi_type,
                r.ssn,
                r.itin,
                r.has_por as i32,
                serde_json::to_string(&r.por_types)?,
                r.employer,
                r.job_title,
                r.monthly_income,
                r.months_at_job,
                r.bank_name,
                r.has_deposit as i32,
                r.deposit_amount,
                r.has_auto_loan as i32,
                r.auto_loan_bank,
                r.auto_loan_payment,
                serde_json::to_string(&r.down_payment)?,
                r.dealer,
                r.finance_status.as_str(),
                r.vehicle,
                r.sale_date.map(|d| d.to_string()),
                r.record_status.map(|s| s.as_str()),
                r.commission_percentage,
                r.commission_value,
                r.commission_locked as i32,
                r.collaborator_id,
                r.deleted as i32,
                r.version,
                r.created_at,
                r.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Full-row write guarded by the optimistic version counter: the
    /// update lands only if nobody moved the record past
    /// `expected_version` since it was read.
    pub fn save_record(&self, r: &Record, expected_version: i64) -> DeskResult<bool> {
        let affected = self.conn.execute(
            "UPDATE record SET
                has_id = ?2, id_type = ?3, has_poi = ?4, poi_type = ?5,
                ssn = ?6, itin = ?7, has_por = ?8, por_types = ?9,
                employer = ?10, job_title = ?11, monthly_income = ?12, months_at_job = ?13,
                bank_name = ?14, has_deposit = ?15, deposit_amount = ?16,
                has_auto_loan = ?17, auto_loan_bank = ?18, auto_loan_payment = ?19,
                down_payment = ?20, dealer = ?21, finance_status = ?22,
                vehicle = ?23, sale_date = ?24, record_status = ?25,
                commission_percentage = ?26, commission_value = ?27, commission_locked = ?28,
                collaborator_id = ?29, deleted = ?30, version = ?31, updated_at = ?32
             WHERE record_id = ?1 AND version = ?33",
            params![
                r.record_id,
                r.has_id as i32,
                r.id_type,
                r.has_poi as i32,
                r.poi_type,
                r.ssn,
                r.itin,
                r.has_por as i32,
                serde_json::to_string(&r.por_types)?,
                r.employer,
                r.job_title,
                r.monthly_income,
                r.months_at_job,
                r.bank_name,
                r.has_deposit as i32,
                r.deposit_amount,
                r.has_auto_loan as i32,
                r.auto_loan_bank,
                r.auto_loan_payment,
                serde_json::to_string(&r.down_payment)?,
                r.dealer,
                r.finance_status.as_str(),
                r.vehicle,
                r.sale_date.map(|d| d.to_string()),
                r.record_status.map(|s| s.as_str()),
                r.commission_percentage,
                r.commission_value,
                r.commission_locked as i32,
                r.collaborator_id,
                r.deleted as i32,
                r.version,
                r.updated_at,
                expected_version,
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn get_record(&self, record_id: &str) -> DeskResult<Option<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM record WHERE record_id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![record_id], record_row_mapper)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// Live records for a client, all salespeople.
    pub fn records_for_client(&self, client_id: &str) -> DeskResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM record
             WHERE client_id = ?1 AND deleted = 0
             ORDER BY opportunity_number ASC, created_at ASC"
        ))?;
        let rows = stmt.query_map(params![client_id], record_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Live records one salesperson authored for a client — the input
    /// to the opportunity gate.
    pub fn records_for_salesperson(
        &self,
        client_id: &str,
        salesperson_id: &str,
    ) -> DeskResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM record
             WHERE client_id = ?1 AND salesperson_id = ?2 AND deleted = 0
             ORDER BY opportunity_number ASC"
        ))?;
        let rows = stmt.query_map(params![client_id, salesperson_id], record_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All record ids for a client, trash included — the permanent
    /// delete cascade needs both.
    pub fn all_record_ids_for_client(&self, client_id: &str) -> DeskResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT record_id FROM record WHERE client_id = ?1")?;
        let rows = stmt.query_map(params![client_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count_records_for_client(&self, client_id: &str) -> DeskResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM record WHERE client_id = ?1",
                params![client_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn purge_records_for_client(&self, client_id: &str) -> DeskResult<i64> {
        let affected = self
            .conn
            .execute("DELETE FROM record WHERE client_id = ?1", params![client_id])?;
        Ok(affected as i64)
    }
}
