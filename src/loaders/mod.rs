pub mod fetch;
pub mod gltf;
pub mod hdr;
pub mod texture;

pub use fetch::Source;
pub use gltf::{decode_model, load_model};
pub use hdr::{decode_environment, load_environment};
pub use texture::{decode_texture, load_texture};

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::LoadError;
use crate::scene::{Attachment, EntityId, Environment, EnvironmentUse, SceneState, TextureSlot, Transform};

pub type TaskId = u64;

/// Something to fetch and install into the scene
#[derive(Debug, Clone, PartialEq)]
pub enum LoadRequest {
    /// glTF/GLB model that fills `slot`
    Model {
        url: String,
        slot: EntityId,
        transform: Transform,
    },
    /// Equirectangular map installed as the scene environment
    Environment { url: String, usage: EnvironmentUse },
    /// 2D image installed into every material of `entity`
    Texture {
        url: String,
        entity: EntityId,
        slot: TextureSlot,
    },
}

impl LoadRequest {
    pub fn url(&self) -> &str {
        match self {
            LoadRequest::Model { url, .. }
            | LoadRequest::Environment { url, .. }
            | LoadRequest::Texture { url, .. } => url,
        }
    }

    pub fn kind(&self) -> LoadKind {
        match self {
            LoadRequest::Model { .. } => LoadKind::Model,
            LoadRequest::Environment { .. } => LoadKind::Environment,
            LoadRequest::Texture { .. } => LoadKind::Texture,
        }
    }

    /// Blocking fetch and decode, run on a worker thread
    pub fn execute(self, progress: &mut dyn FnMut(f32)) -> Result<Attachment, LoadError> {
        match self {
            LoadRequest::Model { url, slot, transform } => {
                let entity = load_model(&url, progress)?.with_transform(transform);
                Ok(Attachment::Entity { slot, entity })
            }
            LoadRequest::Environment { url, usage } => {
                let map = load_environment(&url, progress)?;
                Ok(Attachment::Environment(Environment {
                    map: Arc::new(map),
                    usage,
                }))
            }
            LoadRequest::Texture { url, entity, slot } => {
                let image = load_texture(&url, slot, progress)?;
                Ok(Attachment::Texture {
                    entity,
                    slot,
                    image: Arc::new(image),
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Model,
    Environment,
    Texture,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Pending,
    /// Percent loaded, only reported when the size is known
    Progress(f32),
    Succeeded,
    Failed(String),
    /// Outlived the scene it was loading into
    Discarded,
}

impl LoadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoadStatus::Succeeded | LoadStatus::Failed(_) | LoadStatus::Discarded
        )
    }
}

#[derive(Debug, Clone)]
pub struct LoadTask {
    pub id: TaskId,
    pub url: String,
    pub kind: LoadKind,
    pub status: LoadStatus,
}

#[derive(Debug)]
pub enum LoadEventKind {
    Progress(f32),
    Succeeded(Attachment),
    Failed(LoadError),
}

/// Message from a load worker to the frame loop
#[derive(Debug)]
pub struct LoadEvent {
    pub task: TaskId,
    /// Scene generation the task was started in
    pub epoch: u64,
    pub kind: LoadEventKind,
}

/// Tracks load tasks and applies their results between frames
pub struct LoadQueue {
    sender: Sender<LoadEvent>,
    receiver: Receiver<LoadEvent>,
    tasks: BTreeMap<TaskId, LoadTask>,
    next_id: TaskId,
    epoch: u64,
}

impl Default for LoadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            tasks: BTreeMap::new(),
            next_id: 1,
            epoch: 0,
        }
    }

    /// Start `request` on its own worker thread
    pub fn submit(&mut self, request: LoadRequest) -> TaskId {
        let id = self.register(request.url(), request.kind());
        let epoch = self.epoch;
        let sender = self.sender.clone();
        let url = request.url().to_string();

        let spawned = std::thread::Builder::new()
            .name(format!("load-{id}"))
            .spawn(move || run_worker(request, id, epoch, sender));

        if let Err(e) = spawned {
            let error = LoadError::Worker(e.to_string());
            log::error!("{}: {}", url, error);
            if let Some(task) = self.tasks.get_mut(&id) {
                task.status = LoadStatus::Failed(error.to_string());
            }
        } else {
            log::debug!("load {} started for {}", id, url);
        }
        id
    }

    /// Track a task whose events are produced elsewhere through [`LoadQueue::sender`]
    pub fn register(&mut self, url: &str, kind: LoadKind) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.insert(
            id,
            LoadTask {
                id,
                url: url.to_string(),
                kind,
                status: LoadStatus::Pending,
            },
        );
        id
    }

    pub fn sender(&self) -> Sender<LoadEvent> {
        self.sender.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Start a new scene generation. Finished tasks are forgotten; tasks still
    /// in flight become discarded, stay visible until the next generation,
    /// and their late events are dropped.
    pub fn invalidate(&mut self) {
        self.epoch += 1;
        let before = self.tasks.len();
        self.tasks.retain(|_, task| !task.status.is_terminal());
        for task in self.tasks.values_mut() {
            log::debug!("discarding in-flight load of {}", task.url);
            task.status = LoadStatus::Discarded;
        }
        log::debug!(
            "epoch {}: pruned {} finished load(s), {} discarded",
            self.epoch,
            before - self.tasks.len(),
            self.tasks.len()
        );
    }

    /// Apply every event received since the last call. Returns how many
    /// results were attached to the scene.
    pub fn drain(&mut self, scene: &mut SceneState) -> usize {
        let mut attached = 0;
        while let Ok(event) = self.receiver.try_recv() {
            if self.apply(event, scene) {
                attached += 1;
            }
        }
        attached
    }

    fn apply(&mut self, event: LoadEvent, scene: &mut SceneState) -> bool {
        if event.epoch != self.epoch {
            log::debug!(
                "dropping result of load {} from scene epoch {} (now {})",
                event.task,
                event.epoch,
                self.epoch
            );
            return false;
        }
        let Some(task) = self.tasks.get_mut(&event.task) else {
            log::debug!("dropping event for unknown load {}", event.task);
            return false;
        };
        if task.status.is_terminal() {
            log::debug!("ignoring late event for finished load of {}", task.url);
            return false;
        }

        match event.kind {
            LoadEventKind::Progress(pct) => {
                log::info!("{}: {:.0}% loaded", task.url, pct);
                task.status = LoadStatus::Progress(pct);
                false
            }
            LoadEventKind::Succeeded(attachment) => {
                if scene.attach(attachment) {
                    log::info!("{}: loaded", task.url);
                    task.status = LoadStatus::Succeeded;
                    true
                } else {
                    log::warn!("{}: target entity is gone, dropping result", task.url);
                    task.status = LoadStatus::Discarded;
                    false
                }
            }
            LoadEventKind::Failed(error) => {
                log::error!("{}: {}", task.url, error);
                task.status = LoadStatus::Failed(error.to_string());
                false
            }
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&LoadTask> {
        self.tasks.get(&id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &LoadTask> {
        self.tasks.values()
    }

    /// Tasks not yet terminal
    pub fn pending(&self) -> usize {
        self.tasks.values().filter(|t| !t.status.is_terminal()).count()
    }
}

fn run_worker(request: LoadRequest, task: TaskId, epoch: u64, sender: Sender<LoadEvent>) {
    let mut progress = |pct: f32| {
        let _ = sender.send(LoadEvent {
            task,
            epoch,
            kind: LoadEventKind::Progress(pct),
        });
    };
    let kind = match request.execute(&mut progress) {
        Ok(attachment) => LoadEventKind::Succeeded(attachment),
        Err(error) => LoadEventKind::Failed(error),
    };
    if sender.send(LoadEvent { task, epoch, kind }).is_err() {
        log::debug!("load {} finished after its queue was dropped", task);
    }
}
