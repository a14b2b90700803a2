//! Persistent storage for users, counsellors, institutions, appointments and
//! screening results using redb.
//!
//! # Table design
//!
//! Records are JSON values under string keys:
//!
//! | table          | key                                  |
//! |----------------|--------------------------------------|
//! | `users`        | user id                              |
//! | `counsellors`  | counsellor profile id                |
//! | `institutions` | institution id                       |
//! | `appointments` | appointment id                       |
//! | `screenings`   | `user_id|created_ms (20 digits)|id`  |
//!
//! The zero-padded timestamp in the screening key makes a prefix scan on
//! `user_id|` return one user's history in chronological order.
//!
//! Secondary indexes map a key to an id: counsellor profile by user id,
//! institution by email domain, and `slots`, keyed by
//! `counsellor_id|date|slot`, holding the one appointment that occupies the
//! slot. Student and counsellor appointment lists are multimaps.
//!
//! # Consistency
//!
//! redb admits one write transaction at a time. Every read-check-write goes
//! through [`Store::write`], so slot claims and appends to an appointment's
//! audit log or chat cannot interleave.

use std::path::Path;

use redb::{
    Database, MultimapTableDefinition, ReadTransaction, ReadableMultimapTable, ReadableTable,
    TableDefinition, WriteTransaction,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::appointment::{self, Appointment};
use crate::counsellor::Counsellor;
use crate::error::{CareError, Result};
use crate::institution::Institution;
use crate::paths;
use crate::screening::ScreeningResult;
use crate::user::User;

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;
pub type IndexTable = TableDefinition<'static, &'static str, &'static str>;
pub type IndexMultimap = MultimapTableDefinition<'static, &'static str, &'static str>;

const USERS: JsonTable = TableDefinition::new("users");
const COUNSELLORS: JsonTable = TableDefinition::new("counsellors");
const INSTITUTIONS: JsonTable = TableDefinition::new("institutions");
const APPOINTMENTS: JsonTable = TableDefinition::new("appointments");
const SCREENINGS: JsonTable = TableDefinition::new("screenings");

const COUNSELLOR_BY_USER: IndexTable = TableDefinition::new("counsellor_by_user");
const INSTITUTION_BY_DOMAIN: IndexTable = TableDefinition::new("institution_by_domain");
const SLOTS: IndexTable = TableDefinition::new("slots");

const BY_STUDENT: IndexMultimap = MultimapTableDefinition::new("appointments_by_student");
const BY_COUNSELLOR: IndexMultimap = MultimapTableDefinition::new("appointments_by_counsellor");

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

fn screening_key(result: &ScreeningResult) -> String {
    let ms = result.created_at.timestamp_millis().max(0) as u64;
    format!("{}|{:020}|{}", result.user_id, ms, result.id)
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| CareError::Store(format!("corrupt index entry '{raw}': {e}")))
}

fn decode<T: DeserializeOwned>(bytes: Option<Vec<u8>>) -> Result<Option<T>> {
    match bytes {
        Some(b) => Ok(Some(serde_json::from_slice(&b)?)),
        None => Ok(None),
    }
}

fn decode_all<T: DeserializeOwned>(rows: Vec<Vec<u8>>) -> Result<Vec<T>> {
    rows.iter()
        .map(|b| serde_json::from_slice(b).map_err(CareError::from))
        .collect()
}

fn get_json<T>(table: &T, key: &str) -> Result<Option<Vec<u8>>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    Ok(table.get(key)?.map(|v| v.value().to_vec()))
}

fn scan_json<T>(table: &T, prefix: &str) -> Result<Vec<Vec<u8>>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let mut out = Vec::new();
    for entry in table.range(prefix..)? {
        let (k, v) = entry?;
        if !k.value().starts_with(prefix) {
            break;
        }
        out.push(v.value().to_vec());
    }
    Ok(out)
}

fn get_link<T>(table: &T, key: &str) -> Result<Option<String>>
where
    T: ReadableTable<&'static str, &'static str>,
{
    Ok(table.get(key)?.map(|v| v.value().to_string()))
}

fn scan_links<T>(table: &T, prefix: &str) -> Result<Vec<String>>
where
    T: ReadableTable<&'static str, &'static str>,
{
    let mut out = Vec::new();
    for entry in table.range(prefix..)? {
        let (k, v) = entry?;
        if !k.value().starts_with(prefix) {
            break;
        }
        out.push(v.value().to_string());
    }
    Ok(out)
}

fn multimap_members<T>(table: &T, key: &str) -> Result<Vec<String>>
where
    T: ReadableMultimapTable<&'static str, &'static str>,
{
    let mut out = Vec::new();
    for v in table.get(key)? {
        out.push(v?.value().to_string());
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Records: typed reads shared by snapshots and write transactions
// ---------------------------------------------------------------------------

pub trait Records {
    #[doc(hidden)]
    fn raw(&self, table: JsonTable, key: &str) -> Result<Option<Vec<u8>>>;
    #[doc(hidden)]
    fn raw_prefix(&self, table: JsonTable, prefix: &str) -> Result<Vec<Vec<u8>>>;
    #[doc(hidden)]
    fn link(&self, table: IndexTable, key: &str) -> Result<Option<String>>;
    #[doc(hidden)]
    fn links(&self, table: IndexTable, prefix: &str) -> Result<Vec<String>>;
    #[doc(hidden)]
    fn members(&self, table: IndexMultimap, key: &str) -> Result<Vec<String>>;

    // -- users --------------------------------------------------------------

    fn user(&self, id: Uuid) -> Result<Option<User>> {
        decode(self.raw(USERS, &id.to_string())?)
    }

    fn require_user(&self, id: Uuid) -> Result<User> {
        self.user(id)?
            .ok_or_else(|| CareError::UserNotFound(id.to_string()))
    }

    /// All users, oldest first.
    fn users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = decode_all(self.raw_prefix(USERS, "")?)?;
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .users()?
            .into_iter()
            .find(|u| u.email.as_deref() == Some(email.as_str())))
    }

    // -- counsellors --------------------------------------------------------

    fn counsellor(&self, id: Uuid) -> Result<Option<Counsellor>> {
        decode(self.raw(COUNSELLORS, &id.to_string())?)
    }

    fn require_counsellor(&self, id: Uuid) -> Result<Counsellor> {
        self.counsellor(id)?
            .ok_or_else(|| CareError::CounsellorNotFound(id.to_string()))
    }

    fn counsellors(&self) -> Result<Vec<Counsellor>> {
        let mut all: Vec<Counsellor> = decode_all(self.raw_prefix(COUNSELLORS, "")?)?;
        all.sort_by_key(|c| c.created_at);
        Ok(all)
    }

    /// The profile owned by `user_id`, if they have one.
    fn counsellor_for_user(&self, user_id: Uuid) -> Result<Option<Counsellor>> {
        match self.link(COUNSELLOR_BY_USER, &user_id.to_string())? {
            Some(id) => self.counsellor(parse_id(&id)?),
            None => Ok(None),
        }
    }

    // -- institutions -------------------------------------------------------

    fn institution(&self, id: Uuid) -> Result<Option<Institution>> {
        decode(self.raw(INSTITUTIONS, &id.to_string())?)
    }

    fn institutions(&self) -> Result<Vec<Institution>> {
        let mut all: Vec<Institution> = decode_all(self.raw_prefix(INSTITUTIONS, "")?)?;
        all.sort_by_key(|i| i.created_at);
        Ok(all)
    }

    fn institution_by_domain(&self, domain: &str) -> Result<Option<Institution>> {
        match self.link(INSTITUTION_BY_DOMAIN, &domain.trim().to_lowercase())? {
            Some(id) => self.institution(parse_id(&id)?),
            None => Ok(None),
        }
    }

    // -- appointments -------------------------------------------------------

    fn appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        decode(self.raw(APPOINTMENTS, &id.to_string())?)
    }

    fn require_appointment(&self, id: Uuid) -> Result<Appointment> {
        self.appointment(id)?
            .ok_or_else(|| CareError::AppointmentNotFound(id.to_string()))
    }

    fn appointments_for_student(&self, student_id: Uuid) -> Result<Vec<Appointment>> {
        let ids = self.members(BY_STUDENT, &student_id.to_string())?;
        load_appointments(self, &ids)
    }

    fn appointments_for_counsellor(&self, counsellor_id: Uuid) -> Result<Vec<Appointment>> {
        let ids = self.members(BY_COUNSELLOR, &counsellor_id.to_string())?;
        load_appointments(self, &ids)
    }

    /// The appointment currently holding `(counsellor, date, slot)`.
    fn slot_holder(&self, counsellor_id: Uuid, date: &str, slot: &str) -> Result<Option<Uuid>> {
        match self.link(SLOTS, &appointment::slot_key(counsellor_id, date, slot))? {
            Some(id) => Ok(Some(parse_id(&id)?)),
            None => Ok(None),
        }
    }

    /// Non-cancelled appointments of one counsellor on one date, by slot.
    fn booked_on(&self, counsellor_id: Uuid, date: &str) -> Result<Vec<Appointment>> {
        let ids = self.links(SLOTS, &appointment::day_prefix(counsellor_id, date))?;
        load_appointments(self, &ids)
    }

    // -- screenings ---------------------------------------------------------

    /// One user's results, oldest first.
    fn screenings_for_user(&self, user_id: Uuid) -> Result<Vec<ScreeningResult>> {
        decode_all(self.raw_prefix(SCREENINGS, &format!("{user_id}|"))?)
    }

    fn latest_screening(&self, user_id: Uuid) -> Result<Option<ScreeningResult>> {
        Ok(self.screenings_for_user(user_id)?.pop())
    }

    fn screenings(&self) -> Result<Vec<ScreeningResult>> {
        decode_all(self.raw_prefix(SCREENINGS, "")?)
    }
}

fn load_appointments<R: Records + ?Sized>(records: &R, ids: &[String]) -> Result<Vec<Appointment>> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        match records.appointment(parse_id(id)?)? {
            Some(a) => out.push(a),
            None => tracing::warn!(appointment = %id, "index points at missing appointment"),
        }
    }
    Ok(out)
}

macro_rules! impl_records {
    ($ty:ty) => {
        impl Records for $ty {
            fn raw(&self, table: JsonTable, key: &str) -> Result<Option<Vec<u8>>> {
                let t = self.txn.open_table(table)?;
                get_json(&t, key)
            }

            fn raw_prefix(&self, table: JsonTable, prefix: &str) -> Result<Vec<Vec<u8>>> {
                let t = self.txn.open_table(table)?;
                scan_json(&t, prefix)
            }

            fn link(&self, table: IndexTable, key: &str) -> Result<Option<String>> {
                let t = self.txn.open_table(table)?;
                get_link(&t, key)
            }

            fn links(&self, table: IndexTable, prefix: &str) -> Result<Vec<String>> {
                let t = self.txn.open_table(table)?;
                scan_links(&t, prefix)
            }

            fn members(&self, table: IndexMultimap, key: &str) -> Result<Vec<String>> {
                let t = self.txn.open_multimap_table(table)?;
                multimap_members(&t, key)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Snapshot / StoreTx
// ---------------------------------------------------------------------------

/// A consistent read view.
pub struct Snapshot {
    txn: ReadTransaction,
}

impl_records!(Snapshot);

/// An open write transaction. Created only by [`Store::write`].
pub struct StoreTx {
    txn: WriteTransaction,
}

impl_records!(StoreTx);

impl StoreTx {
    fn put_json(&self, table: JsonTable, key: &str, value: &[u8]) -> Result<()> {
        let mut t = self.txn.open_table(table)?;
        t.insert(key, value)?;
        Ok(())
    }

    pub fn put_user(&self, user: &User) -> Result<()> {
        let value = serde_json::to_vec(user)?;
        self.put_json(USERS, &user.id.to_string(), &value)
    }

    /// Insert or update an institution, keeping its domain unique.
    pub fn put_institution(&self, institution: &Institution) -> Result<()> {
        let id = institution.id.to_string();
        {
            let mut t = self.txn.open_table(INSTITUTION_BY_DOMAIN)?;
            let holder = t
                .get(institution.domain.as_str())?
                .map(|v| v.value().to_string());
            match holder {
                Some(h) if h != id => {
                    return Err(CareError::InstitutionExists(institution.domain.clone()));
                }
                Some(_) => {}
                None => {
                    t.insert(institution.domain.as_str(), id.as_str())?;
                }
            }
        }
        let value = serde_json::to_vec(institution)?;
        self.put_json(INSTITUTIONS, &id, &value)
    }

    pub fn put_counsellor(&self, counsellor: &Counsellor) -> Result<()> {
        let id = counsellor.id.to_string();
        let value = serde_json::to_vec(counsellor)?;
        self.put_json(COUNSELLORS, &id, &value)?;
        let mut t = self.txn.open_table(COUNSELLOR_BY_USER)?;
        t.insert(counsellor.user_id.to_string().as_str(), id.as_str())?;
        Ok(())
    }

    /// Insert or update an appointment and keep the slot index in step.
    ///
    /// A cancelled appointment, or one moved to another date or slot, gives
    /// up its old slot. A live appointment claims its current slot and fails
    /// with `SlotTaken` when another appointment holds it.
    pub fn save_appointment(&self, appt: &Appointment) -> Result<()> {
        if let Some(prev) = self.appointment(appt.id)? {
            let moved = prev.slot_key() != appt.slot_key();
            if prev.status.holds_slot() && (moved || !appt.status.holds_slot()) {
                self.release_slot(&prev)?;
            }
        }
        if appt.status.holds_slot() {
            self.claim_slot(appt)?;
        }

        let id = appt.id.to_string();
        let value = serde_json::to_vec(appt)?;
        self.put_json(APPOINTMENTS, &id, &value)?;

        {
            let mut t = self.txn.open_multimap_table(BY_STUDENT)?;
            t.insert(appt.student_id.to_string().as_str(), id.as_str())?;
        }
        let mut t = self.txn.open_multimap_table(BY_COUNSELLOR)?;
        t.insert(appt.counsellor_id.to_string().as_str(), id.as_str())?;
        Ok(())
    }

    fn claim_slot(&self, appt: &Appointment) -> Result<()> {
        let key = appt.slot_key();
        let id = appt.id.to_string();
        let mut t = self.txn.open_table(SLOTS)?;
        let holder = t.get(key.as_str())?.map(|v| v.value().to_string());
        match holder {
            Some(h) if h == id => Ok(()),
            Some(_) => Err(CareError::SlotTaken {
                counsellor: appt.counsellor_id.to_string(),
                date: appt.scheduled_date.clone(),
                slot: appt.time_slot.clone(),
            }),
            None => {
                t.insert(key.as_str(), id.as_str())?;
                Ok(())
            }
        }
    }

    fn release_slot(&self, appt: &Appointment) -> Result<()> {
        let key = appt.slot_key();
        let id = appt.id.to_string();
        let mut t = self.txn.open_table(SLOTS)?;
        let holder = t.get(key.as_str())?.map(|v| v.value().to_string());
        if holder.as_deref() == Some(id.as_str()) {
            t.remove(key.as_str())?;
        }
        Ok(())
    }

    pub fn insert_screening(&self, result: &ScreeningResult) -> Result<()> {
        let value = serde_json::to_vec(result)?;
        self.put_json(SCREENINGS, &screening_key(result), &value)
    }

    // -- removal ------------------------------------------------------------

    pub fn delete_appointment(&self, appt: &Appointment) -> Result<()> {
        if appt.status.holds_slot() {
            self.release_slot(appt)?;
        }
        let id = appt.id.to_string();
        {
            let mut t = self.txn.open_table(APPOINTMENTS)?;
            t.remove(id.as_str())?;
        }
        {
            let mut t = self.txn.open_multimap_table(BY_STUDENT)?;
            t.remove(appt.student_id.to_string().as_str(), id.as_str())?;
        }
        let mut t = self.txn.open_multimap_table(BY_COUNSELLOR)?;
        t.remove(appt.counsellor_id.to_string().as_str(), id.as_str())?;
        Ok(())
    }

    pub fn delete_counsellor(&self, counsellor: &Counsellor) -> Result<()> {
        {
            let mut t = self.txn.open_table(COUNSELLORS)?;
            t.remove(counsellor.id.to_string().as_str())?;
        }
        let mut t = self.txn.open_table(COUNSELLOR_BY_USER)?;
        t.remove(counsellor.user_id.to_string().as_str())?;
        Ok(())
    }

    pub fn delete_user(&self, id: Uuid) -> Result<()> {
        let mut t = self.txn.open_table(USERS)?;
        t.remove(id.to_string().as_str())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct Store {
    db: Database,
}

impl Store {
    /// Open or create the database at `path`, creating every table so read
    /// transactions never see a missing one.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;
        let wt = db.begin_write()?;
        for table in [USERS, COUNSELLORS, INSTITUTIONS, APPOINTMENTS, SCREENINGS] {
            wt.open_table(table)?;
        }
        for table in [COUNSELLOR_BY_USER, INSTITUTION_BY_DOMAIN, SLOTS] {
            wt.open_table(table)?;
        }
        for table in [BY_STUDENT, BY_COUNSELLOR] {
            wt.open_multimap_table(table)?;
        }
        wt.commit()?;
        Ok(Self { db })
    }

    /// Open the database of an initialized root.
    pub fn open_root(root: &Path) -> Result<Self> {
        if !paths::is_initialized(root) {
            return Err(CareError::NotInitialized);
        }
        Self::open(&paths::db_path(root))
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            txn: self.db.begin_read()?,
        })
    }

    /// Run `f` in one write transaction: committed when it returns `Ok`,
    /// aborted otherwise.
    pub fn write<T>(&self, f: impl FnOnce(&StoreTx) -> Result<T>) -> Result<T> {
        let tx = StoreTx {
            txn: self.db.begin_write()?,
        };
        match f(&tx) {
            Ok(value) => {
                tx.txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = tx.txn.abort() {
                    tracing::warn!(error = %abort, "failed to abort write transaction");
                }
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
