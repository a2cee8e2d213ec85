use redb::{ReadableTable, ReadableTableMetadata};

use super::db::{Database, DatabaseError};
use super::models::{AttachmentRecord, NewAttachment};
use super::tables::*;

impl Database {
    // ========================================================================
    // Attachment operations
    // ========================================================================

    /// Create an attachment record, assigning its id and timestamps.
    ///
    /// Fails with `DuplicateKey` if another attachment already references the key.
    pub fn create_attachment(
        &self,
        attachment: NewAttachment,
    ) -> Result<AttachmentRecord, DatabaseError> {
        let record = attachment.into_record();
        self.put_attachment(&record)?;
        Ok(record)
    }

    /// Store an attachment record and update the key and record indexes.
    ///
    /// Re-putting an existing id moves its index entries: the previous key and
    /// owning record no longer resolve to it.
    pub fn put_attachment(&self, attachment: &AttachmentRecord) -> Result<(), DatabaseError> {
        debug_assert!(!attachment.id.is_empty(), "attachment id must not be empty");
        debug_assert!(!attachment.key.is_empty(), "attachment key must not be empty");

        let write_txn = self.begin_write()?;

        let key_owner: Option<String> = {
            let key_table = write_txn.open_table(ATTACHMENT_KEYS)?;
            let owner = key_table
                .get(attachment.key.as_str())?
                .map(|v| v.value().to_string());
            owner
        };
        if key_owner.is_some_and(|owner| owner != attachment.id) {
            write_txn.abort()?;
            return Err(DatabaseError::DuplicateKey(attachment.key.clone()));
        }

        {
            let mut table = write_txn.open_table(ATTACHMENTS)?;
            let previous: Option<AttachmentRecord> = match table.get(attachment.id.as_str())? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            let data = rmp_serde::to_vec_named(attachment)?;
            table.insert(attachment.id.as_str(), data.as_slice())?;

            let mut key_table = write_txn.open_table(ATTACHMENT_KEYS)?;
            let mut record_table = write_txn.open_table(RECORD_ATTACHMENTS)?;

            if let Some(ref previous) = previous {
                if previous.key != attachment.key {
                    key_table.remove(previous.key.as_str())?;
                }
                if let Some(ref old_record) = previous.record_id {
                    if previous.record_id != attachment.record_id {
                        let mut ids: Vec<String> = match record_table.get(old_record.as_str())? {
                            Some(v) => rmp_serde::from_slice(v.value())?,
                            None => Vec::new(),
                        };
                        ids.retain(|id| id != &attachment.id);
                        if ids.is_empty() {
                            record_table.remove(old_record.as_str())?;
                        } else {
                            let index_data = rmp_serde::to_vec_named(&ids)?;
                            record_table.insert(old_record.as_str(), index_data.as_slice())?;
                        }
                    }
                }
            }

            key_table.insert(attachment.key.as_str(), attachment.id.as_str())?;

            if let Some(ref record_id) = attachment.record_id {
                let mut ids: Vec<String> = match record_table.get(record_id.as_str())? {
                    Some(v) => rmp_serde::from_slice(v.value())?,
                    None => Vec::new(),
                };

                if !ids.contains(&attachment.id) {
                    ids.push(attachment.id.clone());
                    let index_data = rmp_serde::to_vec_named(&ids)?;
                    record_table.insert(record_id.as_str(), index_data.as_slice())?;
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get an attachment by its UUID
    pub fn get_attachment(&self, id: &str) -> Result<Option<AttachmentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ATTACHMENTS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get an attachment by its storage key (resolves key -> uuid -> attachment)
    pub fn get_attachment_by_key(
        &self,
        key: &str,
    ) -> Result<Option<AttachmentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let key_table = read_txn.open_table(ATTACHMENT_KEYS)?;

        let id = match key_table.get(key)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(ATTACHMENTS)?;
        match table.get(id.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Check whether any attachment references the storage key
    pub fn key_exists(&self, key: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ATTACHMENT_KEYS)?;
        Ok(table.get(key)?.is_some())
    }

    /// Get all attachments owned by a record, in creation order
    pub fn get_attachments_by_record(
        &self,
        record_id: &str,
    ) -> Result<Vec<AttachmentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let record_table = read_txn.open_table(RECORD_ATTACHMENTS)?;
        let table = read_txn.open_table(ATTACHMENTS)?;

        let ids: Vec<String> = match record_table.get(record_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut attachments = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(data) = table.get(id.as_str())? {
                attachments.push(rmp_serde::from_slice(data.value())?);
            }
        }

        Ok(attachments)
    }

    /// Get all attachments, oldest first
    pub fn get_all_attachments(&self) -> Result<Vec<AttachmentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ATTACHMENTS)?;

        let mut attachments = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let attachment: AttachmentRecord = rmp_serde::from_slice(value.value())?;
            attachments.push(attachment);
        }
        attachments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(attachments)
    }

    /// List attachments with optional record_id and record_type filters
    pub fn list_attachments(
        &self,
        record_id: Option<&str>,
        record_type: Option<&str>,
    ) -> Result<Vec<AttachmentRecord>, DatabaseError> {
        // Use the owner index when record_id is provided
        let all = match record_id {
            Some(rid) => self.get_attachments_by_record(rid)?,
            None => self.get_all_attachments()?,
        };

        match record_type {
            Some(rt) => Ok(all
                .into_iter()
                .filter(|a| a.record_type.as_deref() == Some(rt))
                .collect()),
            None => Ok(all),
        }
    }

    pub fn count_attachments(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ATTACHMENTS)?;
        Ok(table.len()?)
    }
}
