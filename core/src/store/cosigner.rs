use super::DeskStore;
use crate::{cosigner_graph::CosignerEdge, error::DeskResult};
use rusqlite::params;

fn edge_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<CosignerEdge> {
    Ok(CosignerEdge {
        edge_id: row.get(0)?,
        buyer_client_id: row.get(1)?,
        cosigner_client_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

const EDGE_COLUMNS: &str = "edge_id, buyer_client_id, cosigner_client_id, created_at";

impl DeskStore {
    pub fn insert_edge(&self, e: &CosignerEdge) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO cosigner_edge (edge_id, buyer_client_id, cosigner_client_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![e.edge_id, e.buyer_client_id, e.cosigner_client_id, e.created_at],
        )?;
        Ok(())
    }

    pub fn get_edge(&self, edge_id: &str) -> DeskResult<Option<CosignerEdge>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM cosigner_edge WHERE edge_id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![edge_id], edge_row_mapper)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// The edge for an ordered (buyer, cosigner) pair, if linked.
    pub fn edge_between(
        &self,
        buyer_client_id: &str,
        cosigner_client_id: &str,
    ) -> DeskResult<Option<CosignerEdge>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM cosigner_edge
             WHERE buyer_client_id = ?1 AND cosigner_client_id = ?2"
        ))?;
        let mut rows = stmt.query_map(params![buyer_client_id, cosigner_client_id], edge_row_mapper)?;
        rows.next().transpose().map_err(Into::into)
    }

    pub fn edges_for_buyer(&self, buyer_client_id: &str) -> DeskResult<Vec<CosignerEdge>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM cosigner_edge
             WHERE buyer_client_id = ?1 ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(params![buyer_client_id], edge_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Edges touching a client on either side.
    pub fn edges_for_client(&self, client_id: &str) -> DeskResult<Vec<CosignerEdge>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM cosigner_edge
             WHERE buyer_client_id = ?1 OR cosigner_client_id = ?1
             ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(params![client_id], edge_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_edge(&self, edge_id: &str) -> DeskResult<()> {
        self.conn.execute(
            "DELETE FROM cosigner_edge WHERE edge_id = ?1",
            params![edge_id],
        )?;
        Ok(())
    }

    pub fn delete_edges_for_client(&self, client_id: &str) -> DeskResult<()> {
        self.conn.execute(
            "DELETE FROM cosigner_edge WHERE buyer_client_id = ?1 OR cosigner_client_id = ?1",
            params![client_id],
        )?;
        Ok(())
    }
}
