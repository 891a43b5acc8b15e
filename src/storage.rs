use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::CoreError;
use crate::model::{AdminCredential, Appointment};

/// Durable, exclusively-owned collection of appointments.
///
/// `load` returns the collection as currently durable; `replace_all`
/// overwrites it in one atomic step so readers never observe a partially
/// written collection.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Appointment>, CoreError>;
    async fn replace_all(&self, appointments: &[Appointment]) -> Result<(), CoreError>;
}

/// Durable singleton holding the administrator credential record.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when no credential has been written yet — a merely-absent
    /// record is not an error.
    async fn load(&self) -> Result<Option<AdminCredential>, CoreError>;
    async fn store(&self, credential: &AdminCredential) -> Result<(), CoreError>;
}

// ── JSON file stores ─────────────────────────────────────────────

/// On-disk shape of `appointments.json`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentsFile {
    #[serde(default)]
    appointments: Vec<Appointment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// Write `bytes` to a temp sibling, fsync, then rename over `path`.
/// The rename is the commit point — a crash mid-write leaves the old
/// file intact.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// File-backed appointment store (`appointments.json`).
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Accepts either the wrapped `{"appointments": [...]}` object or a bare
/// top-level array — both shapes exist in the wild for this file.
fn parse_appointments(raw: &[u8]) -> Result<Vec<Appointment>, serde_json::Error> {
    if raw.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }
    match serde_json::from_slice::<AppointmentsFile>(raw) {
        Ok(file) => Ok(file.appointments),
        Err(_) => serde_json::from_slice::<Vec<Appointment>>(raw),
    }
}

#[async_trait]
impl AppointmentStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Appointment>, CoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CoreError::Storage(e.to_string())),
        };
        parse_appointments(&raw).map_err(|e| CoreError::Storage(e.to_string()))
    }

    async fn replace_all(&self, appointments: &[Appointment]) -> Result<(), CoreError> {
        let file = AppointmentsFile {
            appointments: appointments.to_vec(),
            updated_at: Some(Utc::now()),
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| CoreError::Storage(e.to_string()))?;

        let flush_start = std::time::Instant::now();
        write_atomic(&self.path, &bytes)
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        metrics::histogram!(crate::observability::STORE_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());
        Ok(())
    }
}

/// File-backed credential store (`admin.json`).
pub struct JsonCredentialFile {
    path: PathBuf,
}

impl JsonCredentialFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Lenient on-disk shape: a record without a hash counts as "no credential"
/// so bootstrap can reseed it.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CredentialFileOnDisk {
    password_hash: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl CredentialStore for JsonCredentialFile {
    async fn load(&self) -> Result<Option<AdminCredential>, CoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::Storage(e.to_string())),
        };
        if raw.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(None);
        }
        let on_disk: CredentialFileOnDisk = match serde_json::from_slice(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("unreadable admin credential file, treating as unset: {e}");
                return Ok(None);
            }
        };
        Ok(on_disk.password_hash.map(|password_hash| AdminCredential {
            password_hash,
            updated_at: on_disk.updated_at.unwrap_or_else(Utc::now),
        }))
    }

    async fn store(&self, credential: &AdminCredential) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec_pretty(credential)
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        write_atomic(&self.path, &bytes)
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))
    }
}

// ── In-memory stores ─────────────────────────────────────────────

/// In-memory appointment store for tests. `fail_writes` simulates a
/// durable-medium write failure.
#[derive(Default)]
pub struct MemoryStore {
    appointments: tokio::sync::RwLock<Vec<Appointment>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Appointment>, CoreError> {
        Ok(self.appointments.read().await.clone())
    }

    async fn replace_all(&self, appointments: &[Appointment]) -> Result<(), CoreError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(CoreError::Storage("simulated write failure".into()));
        }
        *self.appointments.write().await = appointments.to_vec();
        Ok(())
    }
}

/// In-memory credential store for tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    credential: tokio::sync::RwLock<Option<AdminCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<AdminCredential>, CoreError> {
        Ok(self.credential.read().await.clone())
    }

    async fn store(&self, credential: &AdminCredential) -> Result<(), CoreError> {
        *self.credential.write().await = Some(credential.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("mowbook_test_storage");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn appt(hour: u32) -> Appointment {
        Appointment {
            id: Ulid::new(),
            start: Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 6, 1, hour, 30, 0).unwrap(),
            summary: "Mowing".into(),
            description: String::new(),
            customer_name: String::new(),
            customer_email: String::new(),
            customer_phone: String::new(),
            customer_notes: String::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let store = JsonFileStore::new(tmp_path("missing.json"));
        let loaded = store.load().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn replace_all_roundtrip() {
        let path = tmp_path("roundtrip.json");
        let store = JsonFileStore::new(path.clone());
        let appointments = vec![appt(9), appt(11)];

        store.replace_all(&appointments).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, appointments);

        // Overwrite wholesale — no merge semantics.
        store.replace_all(&appointments[..1]).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn replace_all_leaves_no_temp_file() {
        let path = tmp_path("no_temp.json");
        let store = JsonFileStore::new(path.clone());
        store.replace_all(&[appt(9)]).await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn load_accepts_bare_array() {
        let path = tmp_path("bare_array.json");
        let appointments = vec![appt(9)];
        std::fs::write(&path, serde_json::to_vec(&appointments).unwrap()).unwrap();

        let store = JsonFileStore::new(path.clone());
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, appointments);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn load_empty_file_is_empty() {
        let path = tmp_path("empty.json");
        std::fs::write(&path, "  \n").unwrap();
        let store = JsonFileStore::new(path.clone());
        assert!(store.load().await.unwrap().is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn load_corrupt_file_is_storage_error() {
        let path = tmp_path("corrupt.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = JsonFileStore::new(path.clone());
        let result = store.load().await;
        assert!(matches!(result, Err(CoreError::Storage(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn credential_store_roundtrip() {
        let path = tmp_path("admin.json");
        let store = JsonCredentialFile::new(path.clone());
        assert!(store.load().await.unwrap().is_none());

        let credential = AdminCredential {
            password_hash: "$argon2id$fake".into(),
            updated_at: Utc::now(),
        };
        store.store(&credential).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.password_hash, credential.password_hash);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn credential_record_without_hash_is_unset() {
        let path = tmp_path("admin_nohash.json");
        std::fs::write(&path, b"{}").unwrap();
        let store = JsonCredentialFile::new(path.clone());
        assert!(store.load().await.unwrap().is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn memory_store_simulated_failure() {
        let store = MemoryStore::new();
        store.replace_all(&[appt(9)]).await.unwrap();
        store.fail_writes(true);
        let result = store.replace_all(&[]).await;
        assert!(matches!(result, Err(CoreError::Storage(_))));
        // Prior contents untouched by the failed write.
        assert_eq!(store.load().await.unwrap().len(), 1);
    }
}
