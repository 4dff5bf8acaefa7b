use adaptcore::{Workflow, WorkflowStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid workflow in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Workflows held in memory, keyed by id
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<String, Workflow>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` graph in `dir`; the file stem is the workflow id
    pub fn load_dir(dir: &Path) -> Result<Self, StoreError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| StoreError::Io { path, source }
        };

        let mut workflows = HashMap::new();
        for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
            let path = entry.map_err(io_err(dir))?.path();
            if path.extension() != Some("json".as_ref()) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            let workflow = read_workflow(&path)?;
            tracing::info!("Loaded workflow {} ({} nodes)", id, workflow.nodes.len());
            workflows.insert(id, workflow);
        }

        Ok(Self {
            workflows: RwLock::new(workflows),
        })
    }

    pub async fn insert(&self, id: impl Into<String>, workflow: Workflow) {
        self.workflows.write().await.insert(id.into(), workflow);
    }

    /// Workflow ids, sorted
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workflows.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Parse a single graph file
pub fn read_workflow(path: &Path) -> Result<Workflow, StoreError> {
    let file = std::fs::File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn get_workflow(&self, id: &str) -> Option<Workflow> {
        self.workflows.read().await.get(id).cloned()
    }
}
