//! In-memory [`RemoteService`] fake

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use lore_stores::{
    Error, RemoteCharacter, RemoteFaction, RemoteItem, RemoteLink, RemoteLocation, RemoteService,
    RemoteSession, Result, check_description,
};

/// A `RemoteService` holding one campaign's data in memory.
///
/// Enforces the description length limit on every create/update so the
/// too-long error path is exercisable, and can be switched into a failure
/// mode where every create is rejected with a transport error.
#[derive(Debug, Default)]
pub struct MemoryRemoteService {
    characters: Mutex<Vec<RemoteCharacter>>,
    items: Mutex<Vec<RemoteItem>>,
    locations: Mutex<Vec<RemoteLocation>>,
    factions: Mutex<Vec<RemoteFaction>>,
    sessions: Mutex<Vec<RemoteSession>>,
    links: Mutex<Vec<RemoteLink>>,
    next_id: AtomicUsize,
    fail_creates: AtomicBool,
}

impl MemoryRemoteService {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every `create_*` call fails with a transport error.
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn seed_character(&self, character: RemoteCharacter) {
        self.characters.lock().unwrap().push(character);
    }

    pub fn seed_item(&self, item: RemoteItem) {
        self.items.lock().unwrap().push(item);
    }

    pub fn seed_location(&self, location: RemoteLocation) {
        self.locations.lock().unwrap().push(location);
    }

    pub fn seed_faction(&self, faction: RemoteFaction) {
        self.factions.lock().unwrap().push(faction);
    }

    pub fn seed_session(&self, session: RemoteSession) {
        self.sessions.lock().unwrap().push(session);
    }

    /// Count of characters currently on the service.
    pub fn character_count(&self) -> usize {
        self.characters.lock().unwrap().len()
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    fn mint_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}-{n}")
    }

    fn check_create(&self) -> Result<()> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Error::Transport {
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteService for MemoryRemoteService {
    async fn list_characters(&self, _campaign_id: &str) -> Result<Vec<RemoteCharacter>> {
        Ok(self.characters.lock().unwrap().clone())
    }

    async fn list_items(&self, _campaign_id: &str) -> Result<Vec<RemoteItem>> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn list_locations(&self, _campaign_id: &str) -> Result<Vec<RemoteLocation>> {
        Ok(self.locations.lock().unwrap().clone())
    }

    async fn list_factions(&self, _campaign_id: &str) -> Result<Vec<RemoteFaction>> {
        Ok(self.factions.lock().unwrap().clone())
    }

    async fn list_sessions(&self, _campaign_id: &str) -> Result<Vec<RemoteSession>> {
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn list_links(&self, _campaign_id: &str) -> Result<Vec<RemoteLink>> {
        Ok(self.links.lock().unwrap().clone())
    }

    async fn create_character(
        &self,
        _campaign_id: &str,
        mut payload: RemoteCharacter,
    ) -> Result<String> {
        self.check_create()?;
        check_description("character", &payload.name, &payload.description)?;
        payload.id = self.mint_id("char");
        let id = payload.id.clone();
        self.characters.lock().unwrap().push(payload);
        Ok(id)
    }

    async fn create_item(&self, _campaign_id: &str, mut payload: RemoteItem) -> Result<String> {
        self.check_create()?;
        check_description("item", &payload.name, &payload.description)?;
        payload.id = self.mint_id("item");
        let id = payload.id.clone();
        self.items.lock().unwrap().push(payload);
        Ok(id)
    }

    async fn create_location(
        &self,
        _campaign_id: &str,
        mut payload: RemoteLocation,
    ) -> Result<String> {
        self.check_create()?;
        check_description("location", &payload.name, &payload.description)?;
        payload.id = self.mint_id("loc");
        let id = payload.id.clone();
        self.locations.lock().unwrap().push(payload);
        Ok(id)
    }

    async fn create_faction(
        &self,
        _campaign_id: &str,
        mut payload: RemoteFaction,
    ) -> Result<String> {
        self.check_create()?;
        check_description("faction", &payload.name, &payload.description)?;
        payload.id = self.mint_id("fact");
        let id = payload.id.clone();
        self.factions.lock().unwrap().push(payload);
        Ok(id)
    }

    async fn create_link(&self, _campaign_id: &str, mut payload: RemoteLink) -> Result<String> {
        self.check_create()?;
        payload.id = self.mint_id("link");
        let id = payload.id.clone();
        self.links.lock().unwrap().push(payload);
        Ok(id)
    }

    async fn update_character(&self, id: &str, payload: RemoteCharacter) -> Result<()> {
        check_description("character", &payload.name, &payload.description)?;
        update_in(&self.characters, id, payload, |c| c.id.clone(), |c, id| c.id = id)
    }

    async fn update_item(&self, id: &str, payload: RemoteItem) -> Result<()> {
        check_description("item", &payload.name, &payload.description)?;
        update_in(&self.items, id, payload, |i| i.id.clone(), |i, id| i.id = id)
    }

    async fn update_location(&self, id: &str, payload: RemoteLocation) -> Result<()> {
        check_description("location", &payload.name, &payload.description)?;
        update_in(&self.locations, id, payload, |l| l.id.clone(), |l, id| l.id = id)
    }

    async fn update_faction(&self, id: &str, payload: RemoteFaction) -> Result<()> {
        check_description("faction", &payload.name, &payload.description)?;
        update_in(&self.factions, id, payload, |f| f.id.clone(), |f, id| f.id = id)
    }

    async fn delete_link(&self, id: &str) -> Result<()> {
        let mut links = self.links.lock().unwrap();
        let before = links.len();
        links.retain(|link| link.id != id);
        if links.len() == before {
            return Err(Error::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}

fn update_in<T>(
    collection: &Mutex<Vec<T>>,
    id: &str,
    mut payload: T,
    get_id: impl Fn(&T) -> String,
    set_id: impl Fn(&mut T, String),
) -> Result<()> {
    let mut items = collection.lock().unwrap();
    let Some(slot) = items.iter_mut().find(|item| get_id(item) == id) else {
        return Err(Error::NotFound { id: id.to_string() });
    };
    set_id(&mut payload, id.to_string());
    *slot = payload;
    Ok(())
}
