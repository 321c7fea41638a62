use super::DeskStore;
use crate::{comment::Comment, error::DeskResult};
use rusqlite::params;

fn comment_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        comment_id: row.get(0)?,
        parent_kind: row.get(1)?,
        parent_id: row.get(2)?,
        author_id: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl DeskStore {
    pub fn insert_comment(&self, c: &Comment) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO comment (comment_id, parent_kind, parent_id, author_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                c.comment_id,
                c.parent_kind,
                c.parent_id,
                c.author_id,
                c.body,
                c.created_at
            ],
        )?;
        Ok(())
    }

    pub fn get_comment(&self, comment_id: &str) -> DeskResult<Option<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT comment_id, parent_kind, parent_id, author_id, body, created_at
             FROM comment WHERE comment_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![comment_id], comment_row_mapper)?;
        rows.next().transpose().map_err(Into::into)
    }

    pub fn comments_for_parent(&self, parent_kind: &str, parent_id: &str) -> DeskResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT comment_id, parent_kind, parent_id, author_id, body, created_at
             FROM comment WHERE parent_kind = ?1 AND parent_id = ?2
             ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![parent_kind, parent_id], comment_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_comment(&self, comment_id: &str) -> DeskResult<()> {
        self.conn.execute(
            "DELETE FROM comment WHERE comment_id = ?1",
            params![comment_id],
        )?;
        Ok(())
    }

    pub fn delete_comments_for_parent(&self, parent_kind: &str, parent_id: &str) -> DeskResult<()> {
        self.conn.execute(
            "DELETE FROM comment WHERE parent_kind = ?1 AND parent_id = ?2",
            params![parent_kind, parent_id],
        )?;
        Ok(())
    }
}
