//! Client-side vote ledger for idempotency.
//!
//! Records which (user, record) pairs already carry this user's vote so that
//! a repeated click retracts the vote instead of adding a second one, across
//! sessions. Storage is pluggable through [`LedgerStorage`]:
//!
//! - [`MemoryLedgerStorage`]: process-local, for tests and ephemeral sessions
//! - [`FileLedgerStorage`]: JSON file written atomically, survives restarts

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use tracklist_types::{RecordId, UserId};

use crate::error::{Result, SdkError};

/// Composite ledger key of a user and a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoteKey {
    /// Voting user.
    pub user: UserId,
    /// Voted record.
    pub record: RecordId,
}

impl VoteKey {
    /// Creates a key.
    pub fn new(user: &UserId, record: &RecordId) -> Self {
        Self { user: user.clone(), record: record.clone() }
    }
}

/// Renders as `vote:{user}:{record}` with `%` and `:` percent-escaped in
/// both parts, so distinct pairs never share a key.
impl fmt::Display for VoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("vote:")?;
        write_escaped(f, self.user.as_str())?;
        f.write_str(":")?;
        write_escaped(f, self.record.as_str())
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, part: &str) -> fmt::Result {
    for c in part.chars() {
        match c {
            '%' => f.write_str("%25")?,
            ':' => f.write_str("%3A")?,
            c => fmt::Write::write_char(f, c)?,
        }
    }
    Ok(())
}

/// Persistent key/boolean store backing the [`VoteLedger`].
///
/// Implementations must be `Send + Sync`; the ledger is shared by every
/// clone of a session.
pub trait LedgerStorage: Send + Sync + fmt::Debug {
    /// Returns the stored flag, `None` if the key was never written or was removed.
    fn get(&self, key: &str) -> Result<Option<bool>>;

    /// Stores a flag.
    fn set(&self, key: &str, value: bool) -> Result<()>;

    /// Removes a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory ledger storage.
#[derive(Debug, Default)]
pub struct MemoryLedgerStorage {
    entries: RwLock<HashMap<String, bool>>,
}

impl MemoryLedgerStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LedgerStorage for MemoryLedgerStorage {
    fn get(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.entries.read().get(key).copied())
    }

    fn set(&self, key: &str, value: bool) -> Result<()> {
        self.entries.write().insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// File-backed ledger storage.
///
/// The whole ledger is a single JSON object. Every write rewrites the file
/// through a temporary sibling and a rename, so a crash leaves either the old
/// or the new contents on disk.
#[derive(Debug)]
pub struct FileLedgerStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, bool>>,
}

impl FileLedgerStorage {
    /// Opens the ledger at `path`, creating an empty one if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Storage`] if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| SdkError::Storage {
                message: format!("corrupt ledger {}: {e}", path.display()),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(SdkError::Storage {
                    message: format!("failed to read ledger {}: {e}", path.display()),
                });
            },
        };
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    /// Returns the ledger file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, bool>) -> Result<()> {
        let storage_err = |e: std::io::Error| SdkError::Storage {
            message: format!("failed to write ledger {}: {e}", self.path.display()),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(storage_err)?;
        }

        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(storage_err)?;
        fs::rename(&tmp, &self.path).map_err(storage_err)
    }
}

impl LedgerStorage for FileLedgerStorage {
    fn get(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.entries.lock().get(key).copied())
    }

    fn set(&self, key: &str, value: bool) -> Result<()> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_owned(), value);
        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_owned(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_owned(), previous);
            return Err(e);
        }
        Ok(())
    }
}

/// Which (user, record) pairs already carry a vote.
///
/// Entries are created on the first successful vote, cleared when a repeat
/// vote retracts it, and otherwise only removed by [`VoteLedger::unvote`].
#[derive(Debug, Clone)]
pub struct VoteLedger {
    storage: Arc<dyn LedgerStorage>,
}

impl VoteLedger {
    /// Creates a ledger over the given storage.
    pub fn new(storage: Arc<dyn LedgerStorage>) -> Self {
        Self { storage }
    }

    /// Creates a ledger backed by [`MemoryLedgerStorage`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLedgerStorage::new()))
    }

    /// Returns whether `user` has voted on `record`. An absent entry means no.
    pub fn has_voted(&self, user: &UserId, record: &RecordId) -> Result<bool> {
        let key = VoteKey::new(user, record).to_string();
        Ok(self.storage.get(&key)?.unwrap_or(false))
    }

    /// Records the outcome of a successful toggle.
    ///
    /// `true` stores the entry; `false` clears it.
    pub fn set_voted(&self, user: &UserId, record: &RecordId, voted: bool) -> Result<()> {
        let key = VoteKey::new(user, record).to_string();
        if voted { self.storage.set(&key, true) } else { self.storage.remove(&key) }
    }

    /// Explicitly forgets a vote.
    pub fn unvote(&self, user: &UserId, record: &RecordId) -> Result<()> {
        self.storage.remove(&VoteKey::new(user, record).to_string())
    }
}
