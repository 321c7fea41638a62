//! Opportunity sequencer — numbers a salesperson's attempts (1–5) per
//! client and gates the next one.
//!
//! A new attempt is a *repeat* sale to an already-financed client: the
//! funnel never forks into a parallel attempt unless the previous one
//! concluded in a sale (financiado or lease).

use crate::{
    desk::Desk,
    error::{codes, DeskError, DeskResult},
};

/// Hard cap on attempts per (client, salesperson).
pub const MAX_OPPORTUNITY: i64 = 5;

/// Result of evaluating the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpportunityGate {
    pub allowed: bool,
    pub next_number: i64,
    /// Highest attempt number so far, 0 when none exist.
    pub max_number: i64,
}

impl OpportunityGate {
    /// The specific error a closed gate produces, so callers can tell
    /// "need prior sale" from "out of attempts".
    pub fn denial(&self) -> DeskError {
        if self.max_number >= MAX_OPPORTUNITY {
            DeskError::validation(
                codes::MAX_OPPORTUNITIES,
                format!("client already has {MAX_OPPORTUNITY} opportunities for this salesperson"),
            )
        } else {
            DeskError::forbidden(
                codes::NEED_PRIOR_SALE,
                "latest record must be financiado or lease before opening the next opportunity",
            )
        }
    }
}

impl Desk {
    /// Evaluate the gate for `(client, salesperson)`.
    ///
    /// Opportunity 1 is always implicitly open the first time this
    /// salesperson adds a record for the client. After that the gate
    /// opens only while the latest record at the current max number is
    /// a concluded sale and the cap has not been reached.
    pub fn can_open_opportunity(
        &self,
        client_id: &str,
        salesperson_id: &str,
    ) -> DeskResult<OpportunityGate> {
        let records = self.salesperson_records(client_id, salesperson_id)?;
        let max_number = records
            .iter()
            .map(|r| r.opportunity_number)
            .max()
            .unwrap_or(0);

        if max_number == 0 {
            return Ok(OpportunityGate {
                allowed: true,
                next_number: 1,
                max_number,
            });
        }

        let latest_is_sale = records
            .iter()
            .filter(|r| r.opportunity_number == max_number)
            .any(|r| r.finance_status.is_sale());

        Ok(OpportunityGate {
            allowed: max_number < MAX_OPPORTUNITY && latest_is_sale,
            next_number: max_number + 1,
            max_number,
        })
    }
}
