use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{is_backup_name, BackupObject, CloudError, CloudStorage};

type Hook = Arc<dyn Fn() + Send + Sync>;

struct StoredObject {
    meta: BackupObject,
    bytes: Vec<u8>,
}

struct CloudState {
    authenticated: bool,
    auth_error: Option<CloudError>,
    objects: Vec<StoredObject>,
    next_id: u64,
    fail_next: u32,
    fail_downloads: u32,
    failure: CloudError,
    download_hook: Option<Hook>,
    list_calls: usize,
    download_calls: usize,
}

impl Default for CloudState {
    fn default() -> Self {
        Self {
            authenticated: true,
            auth_error: None,
            objects: Vec::new(),
            next_id: 1,
            fail_next: 0,
            fail_downloads: 0,
            failure: CloudError::Network("injected failure".into()),
            download_hook: None,
            list_calls: 0,
            download_calls: 0,
        }
    }
}

/// In-process object store. Clones share the same storage.
///
/// Starts signed in and empty. Faults can be queued with
/// [`InMemoryCloud::fail_next`]; they apply to list, upload and download
/// calls in order.
#[derive(Clone, Default)]
pub struct InMemoryCloud {
    state: Arc<Mutex<CloudState>>,
}

impl InMemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CloudState>, CloudError> {
        self.state
            .lock()
            .map_err(|_| CloudError::Network("cloud state poisoned".into()))
    }

    // Test helpers below treat a poisoned lock as a bug in the caller.
    fn state(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.state().authenticated = authenticated;
    }

    /// Make `is_authenticated` fail with `error` until cleared with `None`.
    pub fn set_auth_error(&self, error: Option<CloudError>) {
        self.state().auth_error = error;
    }

    /// Fail the next `count` list/upload/download calls with `error`.
    pub fn fail_next(&self, count: u32, error: CloudError) {
        let mut state = self.state();
        state.fail_next = count;
        state.failure = error;
    }

    /// Fail only the next `count` download calls with `error`.
    pub fn fail_next_downloads(&self, count: u32, error: CloudError) {
        let mut state = self.state();
        state.fail_downloads = count;
        state.failure = error;
    }

    /// Run `hook` while a download is in flight, before its bytes are returned.
    pub fn on_download(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.state().download_hook = Some(Arc::new(hook));
    }

    /// Store an object directly, bypassing auth and fault injection.
    pub fn insert(
        &self,
        name: &str,
        created_at: DateTime<Utc>,
        bytes: impl Into<Vec<u8>>,
    ) -> BackupObject {
        let mut state = self.state();
        store_object(&mut state, name, created_at, bytes.into())
    }

    pub fn object_count(&self) -> usize {
        self.state().objects.len()
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    pub fn download_calls(&self) -> usize {
        self.state().download_calls
    }
}

fn store_object(
    state: &mut CloudState,
    name: &str,
    created_at: DateTime<Utc>,
    bytes: Vec<u8>,
) -> BackupObject {
    let meta = BackupObject {
        id: format!("obj-{}", state.next_id),
        name: name.to_string(),
        created_at,
        size_bytes: bytes.len() as u64,
    };
    state.next_id += 1;
    state.objects.push(StoredObject {
        meta: meta.clone(),
        bytes,
    });
    meta
}

fn take_fault(state: &mut CloudState) -> Result<(), CloudError> {
    if state.fail_next > 0 {
        state.fail_next -= 1;
        return Err(state.failure.clone());
    }
    Ok(())
}

fn require_auth(state: &CloudState) -> Result<(), CloudError> {
    if state.authenticated {
        Ok(())
    } else {
        Err(CloudError::Auth("not signed in".into()))
    }
}

impl CloudStorage for InMemoryCloud {
    async fn is_authenticated(&self) -> Result<bool, CloudError> {
        let state = self.lock()?;
        match &state.auth_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.authenticated),
        }
    }

    async fn list_backups(&self) -> Result<Vec<BackupObject>, CloudError> {
        let mut state = self.lock()?;
        state.list_calls += 1;
        require_auth(&state)?;
        take_fault(&mut state)?;
        Ok(state
            .objects
            .iter()
            .filter(|o| is_backup_name(&o.meta.name))
            .map(|o| o.meta.clone())
            .collect())
    }

    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<BackupObject, CloudError> {
        let mut state = self.lock()?;
        require_auth(&state)?;
        take_fault(&mut state)?;
        Ok(store_object(&mut state, name, Utc::now(), bytes))
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, CloudError> {
        let (bytes, hook) = {
            let mut state = self.lock()?;
            state.download_calls += 1;
            require_auth(&state)?;
            if state.fail_downloads > 0 {
                state.fail_downloads -= 1;
                return Err(state.failure.clone());
            }
            take_fault(&mut state)?;
            let bytes = state
                .objects
                .iter()
                .find(|o| o.meta.id == id)
                .map(|o| o.bytes.clone())
                .ok_or_else(|| CloudError::NotFound(id.to_string()))?;
            (bytes, state.download_hook.clone())
        };
        if let Some(hook) = hook {
            hook();
        }
        Ok(bytes)
    }

    async fn sign_out(&self) -> Result<(), CloudError> {
        self.lock()?.authenticated = false;
        Ok(())
    }
}
