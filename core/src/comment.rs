//! Comments attached to a record or a client. Authors delete their
//! own; admins delete any.

use crate::{
    desk::{now, Desk},
    error::{codes, DeskError, DeskResult},
    event::DeskEvent,
    types::{Actor, ClientId, RecordId, UserId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentParent {
    Record(RecordId),
    Client(ClientId),
}

impl CommentParent {
    pub fn kind(&self) -> &'static str {
        match self {
            CommentParent::Record(_) => "record",
            CommentParent::Client(_) => "client",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CommentParent::Record(id) | CommentParent::Client(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub parent_kind: String,
    pub parent_id: String,
    pub author_id: UserId,
    pub body: String,
    pub created_at: String,
}

impl Desk {
    pub fn add_comment(
        &mut self,
        actor: &Actor,
        parent: CommentParent,
        body: &str,
    ) -> DeskResult<Comment> {
        if body.trim().is_empty() {
            return Err(DeskError::validation(
                codes::MISSING_FIELD,
                "comment body is empty",
            ));
        }
        // The parent must exist and be out of the trash.
        match &parent {
            CommentParent::Record(id) => {
                self.live_record(id)?;
            }
            CommentParent::Client(id) => {
                self.live_client(id)?;
            }
        }
        let comment = Comment {
            comment_id: uuid::Uuid::new_v4().to_string(),
            parent_kind: parent.kind().to_string(),
            parent_id: parent.id().to_string(),
            author_id: actor.id.clone(),
            body: body.to_string(),
            created_at: now(),
        };
        self.store.insert_comment(&comment)?;
        self.log_event(
            Some(actor),
            &DeskEvent::CommentAdded {
                comment_id: comment.comment_id.clone(),
                parent_kind: comment.parent_kind.clone(),
                parent_id: comment.parent_id.clone(),
            },
        )?;
        Ok(comment)
    }

    pub fn delete_comment(&mut self, actor: &Actor, comment_id: &str) -> DeskResult<()> {
        let comment = self
            .store
            .get_comment(comment_id)?
            .ok_or_else(|| DeskError::not_found("comment", comment_id))?;
        if !actor.is_admin() && actor.id != comment.author_id {
            return Err(DeskError::forbidden(
                codes::NOT_OWNER,
                "only the author or an admin may delete a comment",
            ));
        }
        self.store.delete_comment(comment_id)?;
        self.log_event(
            Some(actor),
            &DeskEvent::CommentDeleted {
                comment_id: comment_id.to_string(),
            },
        )
    }

    pub fn comments_for(&self, parent: &CommentParent) -> DeskResult<Vec<Comment>> {
        self.store.comments_for_parent(parent.kind(), parent.id())
    }
}
