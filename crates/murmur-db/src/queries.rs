use crate::Database;
use crate::models::{AccountRow, MessageRow};
use anyhow::Result;
use rusqlite::Connection;

/// Result of the atomic signup reservation (see [`Database::reserve_signup`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Username reserved: a fresh pending account was created, or an
    /// expired pending account was overwritten in place.
    Reserved,
    /// Username belongs to a verified account or an unexpired pending one.
    UsernameTaken,
    /// Email belongs to another account that is not reclaimable.
    EmailTaken,
}

impl Database {
    // -- Accounts --

    /// Reserve `username` for a pending signup, as a single conditional
    /// upsert so that two concurrent signups cannot both succeed.
    ///
    /// A conflicting row is overwritten only when it is reclaimable
    /// (unverified with its verification window lapsed); the row id is kept
    /// stable so any messages already received survive the overwrite.
    /// Expired pending rows squatting on `email` under a different username
    /// are reclaimed in the same transaction.
    pub fn reserve_signup(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        verify_code: &str,
        verify_code_expiry: i64,
        now: i64,
    ) -> Result<ReserveOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM accounts
                 WHERE email = ?1 AND username <> ?2
                   AND is_verified = 0 AND verify_code_expiry <= ?3",
                rusqlite::params![email, username, now],
            )?;

            let changed = match tx.execute(
                "INSERT INTO accounts
                    (id, username, email, password, verify_code, verify_code_expiry, is_verified, is_accepting)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 1)
                 ON CONFLICT(username) DO UPDATE SET
                    email = excluded.email,
                    password = excluded.password,
                    verify_code = excluded.verify_code,
                    verify_code_expiry = excluded.verify_code_expiry
                 WHERE accounts.is_verified = 0 AND accounts.verify_code_expiry <= ?7",
                rusqlite::params![id, username, email, password_hash, verify_code, verify_code_expiry, now],
            ) {
                Ok(n) => n,
                // Dropping the transaction rolls the email reclaim back too:
                // a failed signup leaves no partial writes behind.
                Err(rusqlite::Error::SqliteFailure(e, Some(ref msg)))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation
                        && msg.contains("accounts.email") =>
                {
                    return Ok(ReserveOutcome::EmailTaken);
                }
                Err(e) => return Err(e.into()),
            };

            if changed == 0 {
                return Ok(ReserveOutcome::UsernameTaken);
            }

            tx.commit()?;
            Ok(ReserveOutcome::Reserved)
        })
    }

    /// Push the pending reservation's expiry into the past, making the
    /// username immediately reclaimable. Used when verification-code
    /// dispatch fails after the reservation committed.
    pub fn expire_pending(&self, username: &str, now: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE accounts SET verify_code_expiry = ?2
                 WHERE username = ?1 AND is_verified = 0",
                rusqlite::params![username, now],
            )?;
            Ok(())
        })
    }

    /// Flip the account to verified. Returns false if the account was
    /// already verified (or absent), so callers can stay idempotent.
    pub fn mark_verified(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE accounts SET is_verified = 1
                 WHERE username = ?1 AND is_verified = 0",
                [username],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_account_by_username(&self, username: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "username = ?1", username))
    }

    pub fn get_account_by_id(&self, id: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "id = ?1", id))
    }

    /// Login lookup: the identifier may be a username or an email.
    pub fn get_account_by_identifier(&self, identifier: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "username = ?1 OR email = ?1", identifier))
    }

    // -- Inbox gate --

    /// Returns false if no such account exists.
    pub fn set_accepting(&self, account_id: &str, accepting: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE accounts SET is_accepting = ?2 WHERE id = ?1",
                rusqlite::params![account_id, accepting],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Messages --

    /// Append a message to `username`'s inbox, but only while the account
    /// is accepting. One statement, so a concurrent gate toggle cannot slip
    /// a message past a closed gate. Returns false when the gate was closed
    /// (or the account vanished) between the caller's lookup and the insert.
    pub fn insert_message_if_accepting(
        &self,
        message_id: &str,
        username: &str,
        content: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT INTO messages (id, account_id, content)
                 SELECT ?1, id, ?3 FROM accounts
                 WHERE username = ?2 AND is_accepting = 1",
                rusqlite::params![message_id, username, content],
            )?;
            Ok(changed > 0)
        })
    }

    /// Newest first; rowid breaks ties between same-second appends.
    pub fn list_messages(&self, account_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, account_id, content, created_at FROM messages
                 WHERE account_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;

            let rows = stmt
                .query_map([account_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        account_id: row.get(1)?,
                        content: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Owner-scoped delete. Returns false when no message with that id
    /// exists under that account — including ids that belong to someone
    /// else, which must be indistinguishable from absent ones.
    pub fn delete_message(&self, account_id: &str, message_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM messages WHERE id = ?1 AND account_id = ?2",
                rusqlite::params![message_id, account_id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_account(conn: &Connection, filter: &str, param: &str) -> Result<Option<AccountRow>> {
    let sql = format!(
        "SELECT id, username, email, password, verify_code, verify_code_expiry,
                is_verified, is_accepting, created_at
         FROM accounts WHERE {filter}"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([param], |row| {
            Ok(AccountRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                verify_code: row.get(4)?,
                verify_code_expiry: row.get(5)?,
                is_verified: row.get(6)?,
                is_accepting: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
