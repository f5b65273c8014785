//! The sandbox execution runtime: an explicit, per-session context that owns
//! the virtual filesystem the generation engine works against.

mod fs;
mod path;

pub use fs::{MemoryFs, VfsError};
pub use path::{PathError, StagedPath};

use uuid::Uuid;

/// Runtime state shared by every step of one staging + generation session.
///
/// Created by [`RuntimeContext::init`] when the user starts a flow and torn
/// down when the job completes or fails; nothing survives between sessions.
#[derive(Debug)]
pub struct RuntimeContext {
    id: String,
    fs: MemoryFs,
}

impl RuntimeContext {
    pub fn init() -> Self {
        let id = Uuid::new_v4().to_string();
        tracing::debug!(session = %id, "sandbox runtime initialized");
        Self {
            id,
            fs: MemoryFs::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fs(&self) -> &MemoryFs {
        &self.fs
    }

    /// Release the session: wipe the virtual filesystem and drop the context.
    pub async fn teardown(self) {
        let files = self.fs.file_count().await;
        self.fs.clear().await;
        tracing::debug!(session = %self.id, files, "sandbox runtime torn down");
    }
}
