//! Client directory — identity and the soft-delete lifecycle.
//!
//! Document-upload flags belong to the external document store; the
//! directory only surfaces them and exposes the collaborator's write
//! path (`set_document_flags`).

use crate::{
    desk::{now, Desk},
    error::{codes, DeskError, DeskResult},
    event::DeskEvent,
    notify::Channel,
    types::{Actor, ClientId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub client_id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Which channel outbound notifications take for this client.
    pub preferred_channel: Channel,
    pub id_uploaded: bool,
    pub income_uploaded: bool,
    pub residence_uploaded: bool,
    pub deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
}

/// Partial identity fields for create/update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub preferred_channel: Option<Channel>,
}

impl Desk {
    /// Create a client. First name and phone are mandatory — phone is
    /// the directory's lookup key.
    pub fn create_client(&mut self, actor: &Actor, fields: ClientFields) -> DeskResult<Client> {
        let first_name = fields
            .first_name
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DeskError::validation(codes::MISSING_FIELD, "first_name is required"))?;
        let phone = fields
            .phone
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DeskError::validation(codes::MISSING_FIELD, "phone is required"))?;

        let client = Client {
            client_id: uuid::Uuid::new_v4().to_string(),
            first_name,
            last_name: fields.last_name.unwrap_or_default(),
            phone,
            email: fields.email,
            address: fields.address,
            preferred_channel: fields.preferred_channel.unwrap_or(Channel::Sms),
            id_uploaded: false,
            income_uploaded: false,
            residence_uploaded: false,
            deleted: false,
            deleted_at: None,
            created_at: now(),
        };
        self.store.insert_client(&client)?;
        self.log_event(
            Some(actor),
            &DeskEvent::ClientCreated {
                client_id: client.client_id.clone(),
            },
        )?;
        Ok(client)
    }

    pub fn update_client(
        &mut self,
        actor: &Actor,
        client_id: &str,
        fields: ClientFields,
    ) -> DeskResult<Client> {
        let mut client = self.live_client(client_id)?;
        if let Some(v) = fields.first_name {
            client.first_name = v;
        }
        if let Some(v) = fields.last_name {
            client.last_name = v;
        }
        if let Some(v) = fields.phone {
            client.phone = v;
        }
        if let Some(v) = fields.email {
            client.email = Some(v);
        }
        if let Some(v) = fields.address {
            client.address = Some(v);
        }
        if let Some(v) = fields.preferred_channel {
            client.preferred_channel = v;
        }
        self.store.save_client(&client)?;
        self.log_event(
            Some(actor),
            &DeskEvent::ClientUpdated {
                client_id: client.client_id.clone(),
            },
        )?;
        Ok(client)
    }

    /// Move a client to the trash. Excluded from active listings and
    /// phone search, kept for restore.
    pub fn soft_delete_client(&mut self, actor: &Actor, client_id: &str) -> DeskResult<()> {
        let mut client = self.live_client(client_id)?;
        client.deleted = true;
        client.deleted_at = Some(now());
        self.store.save_client(&client)?;
        self.log_event(
            Some(actor),
            &DeskEvent::ClientSoftDeleted {
                client_id: client.client_id,
            },
        )
    }

    pub fn restore_client(&mut self, actor: &Actor, client_id: &str) -> DeskResult<Client> {
        let mut client = self
            .store
            .get_client(client_id)?
            .ok_or_else(|| DeskError::not_found("client", client_id))?;
        if !client.deleted {
            return Err(DeskError::validation(
                codes::NOT_DELETED,
                "client is not in the trash",
            ));
        }
        client.deleted = false;
        client.deleted_at = None;
        self.store.save_client(&client)?;
        self.log_event(
            Some(actor),
            &DeskEvent::ClientRestored {
                client_id: client.client_id.clone(),
            },
        )?;
        Ok(client)
    }

    /// Irreversible removal. Admin-only. Refuses while records exist
    /// unless `cascade_records` is explicitly set, in which case the
    /// client's records, their appointments and comments, and the
    /// client's co-signer edges go with it.
    pub fn permanent_delete_client(
        &mut self,
        actor: &Actor,
        client_id: &str,
        cascade_records: bool,
    ) -> DeskResult<()> {
        if !actor.is_admin() {
            return Err(DeskError::forbidden(
                codes::ADMIN_ONLY,
                "permanent deletion is admin-only",
            ));
        }
        self.store
            .get_client(client_id)?
            .ok_or_else(|| DeskError::not_found("client", client_id))?;

        let record_count = self.store.count_records_for_client(client_id)?;
        if record_count > 0 && !cascade_records {
            return Err(DeskError::conflict(
                codes::RECORDS_EXIST,
                format!("client has {record_count} records; pass cascade_records to purge them"),
            ));
        }

        let tx = self.store.begin()?;
        let record_ids = self.store.all_record_ids_for_client(client_id)?;
        for record_id in &record_ids {
            self.store.delete_comments_for_parent("record", record_id)?;
        }
        self.store.delete_appointments_for_client(client_id)?;
        let purged = self.store.purge_records_for_client(client_id)?;
        self.store.delete_comments_for_parent("client", client_id)?;
        self.store.delete_edges_for_client(client_id)?;
        self.store.delete_client_row(client_id)?;
        self.log_event(
            Some(actor),
            &DeskEvent::ClientPurged {
                client_id: client_id.to_string(),
                records_purged: purged,
            },
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Write path for the external document-store collaborator. Flags
    /// are read-only to everyone else.
    pub fn set_document_flags(
        &mut self,
        client_id: &str,
        id_uploaded: Option<bool>,
        income_uploaded: Option<bool>,
        residence_uploaded: Option<bool>,
    ) -> DeskResult<Client> {
        let mut client = self.live_client(client_id)?;
        if let Some(v) = id_uploaded {
            client.id_uploaded = v;
        }
        if let Some(v) = income_uploaded {
            client.income_uploaded = v;
        }
        if let Some(v) = residence_uploaded {
            client.residence_uploaded = v;
        }
        self.store.save_client(&client)?;
        Ok(client)
    }

    pub fn client(&self, client_id: &str) -> DeskResult<Client> {
        self.store
            .get_client(client_id)?
            .ok_or_else(|| DeskError::not_found("client", client_id))
    }

    pub fn active_clients(&self) -> DeskResult<Vec<Client>> {
        self.store.clients_where(false)
    }

    pub fn trashed_clients(&self) -> DeskResult<Vec<Client>> {
        self.store.clients_where(true)
    }

    /// Exact-match phone lookup over live clients.
    pub fn search_client_by_phone(&self, phone: &str) -> DeskResult<Vec<Client>> {
        self.store.clients_by_phone(phone)
    }

    pub(crate) fn live_client(&self, client_id: &str) -> DeskResult<Client> {
        self.store
            .get_client(client_id)?
            .filter(|c| !c.deleted)
            .ok_or_else(|| DeskError::not_found("client", client_id))
    }
}
