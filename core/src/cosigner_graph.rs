//! Co-signer graph — ordered (buyer, cosigner) edges between clients.
//!
//! A cosigner is a full client: it may back several buyers and may be
//! a buyer itself. Its own records go through the record lifecycle
//! but are never grouped into the buyer's opportunity sequence — no
//! gating applies on the cosigner side.

use crate::{
    desk::{now, Desk},
    error::{codes, DeskError, DeskResult},
    event::DeskEvent,
    client_directory::{Client, ClientFields},
    record_lifecycle::{Record, RecordPatch},
    types::{Actor, ClientId, EdgeId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosignerEdge {
    pub edge_id: EdgeId,
    pub buyer_client_id: ClientId,
    pub cosigner_client_id: ClientId,
    pub created_at: String,
}

impl Desk {
    /// Link an existing client as cosigner for a buyer. A duplicate
    /// ordered pair is rejected with a conflict — the edge is never
    /// created twice.
    pub fn link_cosigner(
        &mut self,
        actor: &Actor,
        buyer_client_id: &str,
        cosigner_client_id: &str,
    ) -> DeskResult<CosignerEdge> {
        if buyer_client_id == cosigner_client_id {
            return Err(DeskError::validation(
                codes::SELF_COSIGNER,
                "a client cannot cosign for itself",
            ));
        }
        self.live_client(buyer_client_id)?;
        self.live_client(cosigner_client_id)?;

        if self
            .store
            .edge_between(buyer_client_id, cosigner_client_id)?
            .is_some()
        {
            return Err(DeskError::conflict(
                codes::DUPLICATE_COSIGNER,
                "these clients are already linked",
            ));
        }

        let edge = CosignerEdge {
            edge_id: uuid::Uuid::new_v4().to_string(),
            buyer_client_id: buyer_client_id.to_string(),
            cosigner_client_id: cosigner_client_id.to_string(),
            created_at: now(),
        };
        match self.store.insert_edge(&edge) {
            Ok(()) => {}
            // UNIQUE backstop for a concurrent identical link.
            Err(e) if e.is_unique_violation() => {
                return Err(DeskError::conflict(
                    codes::DUPLICATE_COSIGNER,
                    "these clients are already linked",
                ));
            }
            Err(e) => return Err(e),
        }
        self.log_event(
            Some(actor),
            &DeskEvent::CosignerLinked {
                edge_id: edge.edge_id.clone(),
                buyer_client_id: edge.buyer_client_id.clone(),
                cosigner_client_id: edge.cosigner_client_id.clone(),
            },
        )?;
        Ok(edge)
    }

    /// Create a fresh client (the usual flow after a phone search came
    /// up empty) and link it in one step.
    pub fn create_and_link_cosigner(
        &mut self,
        actor: &Actor,
        buyer_client_id: &str,
        fields: ClientFields,
    ) -> DeskResult<(Client, CosignerEdge)> {
        self.live_client(buyer_client_id)?;
        let cosigner = self.create_client(actor, fields)?;
        let edge = self.link_cosigner(actor, buyer_client_id, &cosigner.client_id)?;
        Ok((cosigner, edge))
    }

    /// Remove the edge. Both clients persist.
    pub fn unlink_cosigner(&mut self, actor: &Actor, edge_id: &str) -> DeskResult<()> {
        self.store
            .get_edge(edge_id)?
            .ok_or_else(|| DeskError::not_found("cosigner_edge", edge_id))?;
        self.store.delete_edge(edge_id)?;
        self.log_event(
            Some(actor),
            &DeskEvent::CosignerUnlinked {
                edge_id: edge_id.to_string(),
            },
        )
    }

    /// Start a record on the cosigner side of an edge. Numbered for
    /// bookkeeping, but not gated: cosigner attempts never wait for a
    /// prior sale.
    pub fn create_cosigner_record(
        &mut self,
        edge_id: &str,
        salesperson_id: &str,
        fields: RecordPatch,
    ) -> DeskResult<Record> {
        let edge = self
            .store
            .get_edge(edge_id)?
            .ok_or_else(|| DeskError::not_found("cosigner_edge", edge_id))?;
        self.live_client(&edge.cosigner_client_id)?;
        self.create_ungated_record(&edge.cosigner_client_id, salesperson_id, fields)
    }

    /// The cosigners backing a buyer.
    pub fn cosigners_of(&self, buyer_client_id: &str) -> DeskResult<Vec<(CosignerEdge, Client)>> {
        let edges = self.store.edges_for_buyer(buyer_client_id)?;
        let mut out = Vec::with_capacity(edges.len());
        for edge in edges {
            let client = self.client(&edge.cosigner_client_id)?;
            out.push((edge, client));
        }
        Ok(out)
    }

    /// Every edge touching a client, on either side.
    pub fn cosigner_edges_for(&self, client_id: &str) -> DeskResult<Vec<CosignerEdge>> {
        self.store.edges_for_client(client_id)
    }
}
