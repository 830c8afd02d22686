// ABOUTME: In-memory container engine for orchestration tests.
// ABOUTME: Records every call and fails on demand.

use async_trait::async_trait;
use bondi::runtime::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps,
    ContainerState, ImageError, ImageOps, ManagedContainer, NetworkConfig, NetworkError,
    NetworkOps, RegistryAuth,
};
use bondi::types::{ContainerId, ImageId, ImageRef, NetworkId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::Duration;

/// One engine call, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Pull(String),
    ResolveImage(String),
    RemoveImage(String),
    Create(String),
    Start(String),
    Stop(String),
    Remove(String),
    Inspect(String),
    NetworkExists(String),
    CreateNetwork(String),
}

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub image_id: ImageId,
    pub state: ContainerState,
    pub labels: HashMap<String, String>,
    pub config: Option<ContainerConfig>,
}

#[derive(Default)]
struct State {
    containers: Vec<FakeContainer>,
    /// Image reference -> image id.
    images: BTreeMap<String, ImageId>,
    networks: HashSet<String>,
    calls: Vec<Call>,
    next_id: u64,
    pull_auth: Vec<Option<RegistryAuth>>,
    fail_pull: bool,
    fail_start: bool,
    fail_inspect: bool,
    fail_network_exists: bool,
    /// State a container has after `start`; `None` means running.
    state_after_start: Option<ContainerState>,
    /// States returned by successive inspects; `None` means "no such container".
    inspect_script: VecDeque<Option<ContainerState>>,
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<State>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an existing container and its image.
    pub fn seed_container(
        &self,
        name: &str,
        image: &str,
        state: ContainerState,
        labels: HashMap<String, String>,
    ) -> ContainerId {
        let mut s = self.state.lock();
        s.next_id += 1;
        let id = ContainerId::new(format!("seeded{:06}", s.next_id));
        let image_id = s
            .images
            .entry(image.to_string())
            .or_insert_with(|| ImageId::new(format!("sha256:{image}")))
            .clone();
        s.containers.push(FakeContainer {
            id: id.clone(),
            name: name.to_string(),
            image: image.to_string(),
            image_id,
            state,
            labels,
            config: None,
        });
        id
    }

    pub fn seed_network(&self, name: &str) {
        self.state.lock().networks.insert(name.to_string());
    }

    pub fn fail_pull(&self) {
        self.state.lock().fail_pull = true;
    }

    pub fn fail_start(&self) {
        self.state.lock().fail_start = true;
    }

    pub fn fail_inspect(&self) {
        self.state.lock().fail_inspect = true;
    }

    pub fn fail_network_exists(&self) {
        self.state.lock().fail_network_exists = true;
    }

    pub fn stay_in_state_after_start(&self, state: ContainerState) {
        self.state.lock().state_after_start = Some(state);
    }

    pub fn script_inspect(&self, states: impl IntoIterator<Item = Option<ContainerState>>) {
        self.state.lock().inspect_script.extend(states);
    }

    pub fn containers(&self) -> Vec<FakeContainer> {
        self.state.lock().containers.clone()
    }

    pub fn container(&self, id: &ContainerId) -> Option<FakeContainer> {
        self.state
            .lock()
            .containers
            .iter()
            .find(|c| &c.id == id)
            .cloned()
    }

    pub fn has_image(&self, reference: &str) -> bool {
        self.state.lock().images.contains_key(reference)
    }

    pub fn has_network(&self, name: &str) -> bool {
        self.state.lock().networks.contains(name)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn pull_auth(&self) -> Vec<Option<RegistryAuth>> {
        self.state.lock().pull_auth.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn summary(c: &FakeContainer) -> ManagedContainer {
        ManagedContainer {
            id: c.id.clone(),
            name: c.name.clone(),
            image: c.image.clone(),
            image_id: c.image_id.clone(),
            state: c.state,
            labels: c.labels.clone(),
        }
    }
}

#[async_trait]
impl ImageOps for FakeEngine {
    async fn pull_image(
        &self,
        reference: &ImageRef,
        auth: Option<&RegistryAuth>,
    ) -> Result<(), ImageError> {
        let mut s = self.state.lock();
        let image = reference.to_string();
        s.calls.push(Call::Pull(image.clone()));
        s.pull_auth.push(auth.cloned());
        if s.fail_pull {
            return Err(ImageError::PullFailed(format!("{image}: registry unavailable")));
        }
        s.images
            .entry(image.clone())
            .or_insert_with(|| ImageId::new(format!("sha256:{image}")));
        Ok(())
    }

    async fn image_id(&self, reference: &ImageRef) -> Result<Option<ImageId>, ImageError> {
        let mut s = self.state.lock();
        let image = reference.to_string();
        s.calls.push(Call::ResolveImage(image.clone()));
        Ok(s.images.get(&image).cloned())
    }

    async fn remove_image(&self, id: &ImageId, _force: bool) -> Result<(), ImageError> {
        let mut s = self.state.lock();
        s.calls.push(Call::RemoveImage(id.to_string()));
        let before = s.images.len();
        s.images.retain(|_, image_id| image_id != id);
        if s.images.len() == before {
            return Err(ImageError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for FakeEngine {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let mut s = self.state.lock();
        s.calls.push(Call::Create(config.name.clone()));

        if s.containers.iter().any(|c| c.name == config.name) {
            return Err(ContainerError::AlreadyExists(config.name.clone()));
        }
        let image = config.image.to_string();
        let image_id = s
            .images
            .get(&image)
            .cloned()
            .ok_or_else(|| ContainerError::ImageNotFound(image.clone()))?;

        s.next_id += 1;
        let id = ContainerId::new(format!("created{:06}", s.next_id));
        s.containers.push(FakeContainer {
            id: id.clone(),
            name: config.name.clone(),
            image,
            image_id,
            state: ContainerState::Created,
            labels: config.labels.clone(),
            config: Some(config.clone()),
        });
        Ok(id)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let mut s = self.state.lock();
        s.calls.push(Call::Start(id.to_string()));
        if s.fail_start {
            return Err(ContainerError::Runtime("port is already allocated".to_string()));
        }
        let next = s.state_after_start.unwrap_or(ContainerState::Running);
        let container = s
            .containers
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        container.state = next;
        Ok(())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _grace: Duration,
    ) -> Result<(), ContainerError> {
        let mut s = self.state.lock();
        s.calls.push(Call::Stop(id.to_string()));
        let container = s
            .containers
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if !container.state.is_running() {
            return Err(ContainerError::NotRunning(id.to_string()));
        }
        container.state = ContainerState::Exited;
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, _force: bool) -> Result<(), ContainerError> {
        let mut s = self.state.lock();
        s.calls.push(Call::Remove(id.to_string()));
        let before = s.containers.len();
        s.containers.retain(|c| &c.id != id);
        if s.containers.len() == before {
            return Err(ContainerError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let mut s = self.state.lock();
        s.calls.push(Call::Inspect(id.to_string()));
        if s.fail_inspect {
            return Err(ContainerError::Runtime("engine unavailable".to_string()));
        }

        let scripted = s.inspect_script.pop_front();
        let container = s.containers.iter().find(|c| &c.id == id);
        let state = match (scripted, container) {
            (Some(None), _) | (None, None) => return Err(ContainerError::NotFound(id.to_string())),
            (Some(Some(state)), _) => state,
            (None, Some(c)) => c.state,
        };

        let (name, image, image_id, labels) = container
            .map(|c| (c.name.clone(), c.image.clone(), c.image_id.clone(), c.labels.clone()))
            .unwrap_or_else(|| (String::new(), String::new(), ImageId::new(""), HashMap::new()));

        Ok(ContainerInfo {
            id: id.clone(),
            name,
            image,
            image_id,
            state,
            created: "2026-01-02T03:04:05Z".to_string(),
            restart_count: 0,
            labels,
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ManagedContainer>, ContainerError> {
        let mut s = self.state.lock();
        s.calls.push(Call::List);
        Ok(s.containers
            .iter()
            .map(Self::summary)
            .filter(|c| filters.matches(c))
            .collect())
    }
}

#[async_trait]
impl NetworkOps for FakeEngine {
    async fn create_network(&self, config: &NetworkConfig) -> Result<NetworkId, NetworkError> {
        let mut s = self.state.lock();
        s.calls.push(Call::CreateNetwork(config.name.clone()));
        if !s.networks.insert(config.name.clone()) {
            return Err(NetworkError::AlreadyExists(config.name.clone()));
        }
        Ok(NetworkId::new(format!("net-{}", config.name)))
    }

    async fn network_exists(&self, name: &str) -> Result<bool, NetworkError> {
        let mut s = self.state.lock();
        s.calls.push(Call::NetworkExists(name.to_string()));
        if s.fail_network_exists {
            return Err(NetworkError::Runtime("engine unavailable".to_string()));
        }
        Ok(s.networks.contains(name))
    }
}
