use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::RwLock;

use super::path::StagedPath;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VfsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("is a directory: {0}")]
    IsADirectory(String),
}

#[derive(Debug, Default)]
struct Tree {
    dirs: BTreeSet<StagedPath>,
    files: BTreeMap<StagedPath, Vec<u8>>,
}

impl Tree {
    fn is_dir(&self, path: &StagedPath) -> bool {
        path.is_root() || self.dirs.contains(path)
    }
}

/// Session-scoped in-memory filesystem backing the sandbox.
///
/// The root always exists. Every operation takes the tree lock once, so
/// directory creation is atomic with respect to concurrent writers.
#[derive(Debug, Default)]
pub struct MemoryFs {
    tree: RwLock<Tree>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `dir` and all missing ancestors. Existing directories are fine.
    pub async fn create_dir_all(&self, dir: &StagedPath) -> Result<(), VfsError> {
        let mut tree = self.tree.write().await;
        for ancestor in dir.ancestors_inclusive() {
            if tree.files.contains_key(&ancestor) {
                return Err(VfsError::NotADirectory(ancestor.to_string()));
            }
            tree.dirs.insert(ancestor);
        }
        Ok(())
    }

    /// Write `bytes` to `path`, replacing any previous content.
    /// Returns `true` when an existing file was overwritten.
    pub async fn write_file(&self, path: &StagedPath, bytes: Vec<u8>) -> Result<bool, VfsError> {
        let mut tree = self.tree.write().await;
        let parent = path.parent().unwrap_or_else(StagedPath::root);
        if !tree.is_dir(&parent) {
            return Err(VfsError::NotFound(parent.to_string()));
        }
        if tree.is_dir(path) {
            return Err(VfsError::IsADirectory(path.to_string()));
        }
        Ok(tree.files.insert(path.clone(), bytes).is_some())
    }

    pub async fn read_file(&self, path: &StagedPath) -> Result<Vec<u8>, VfsError> {
        let tree = self.tree.read().await;
        if tree.is_dir(path) {
            return Err(VfsError::IsADirectory(path.to_string()));
        }
        tree.files
            .get(path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    /// Sorted names of the files and directories directly under `dir`.
    pub async fn list_dir(&self, dir: &StagedPath) -> Result<Vec<String>, VfsError> {
        let tree = self.tree.read().await;
        if !tree.is_dir(dir) {
            if tree.files.contains_key(dir) {
                return Err(VfsError::NotADirectory(dir.to_string()));
            }
            return Err(VfsError::NotFound(dir.to_string()));
        }

        let direct_child = |p: &StagedPath| p.parent().as_ref() == Some(dir);
        let mut names: Vec<String> = tree
            .dirs
            .iter()
            .filter(|p| direct_child(*p))
            .chain(tree.files.keys().filter(|p| direct_child(*p)))
            .map(|p| p.file_name().to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Remove the file at `path`. Returns `false` when there was none.
    pub async fn remove_file(&self, path: &StagedPath) -> Result<bool, VfsError> {
        let mut tree = self.tree.write().await;
        if tree.is_dir(path) {
            return Err(VfsError::IsADirectory(path.to_string()));
        }
        Ok(tree.files.remove(path).is_some())
    }

    pub async fn is_file(&self, path: &StagedPath) -> bool {
        self.tree.read().await.files.contains_key(path)
    }

    pub async fn is_dir(&self, path: &StagedPath) -> bool {
        self.tree.read().await.is_dir(path)
    }

    pub async fn file_count(&self) -> usize {
        self.tree.read().await.files.len()
    }

    pub async fn dir_count(&self) -> usize {
        self.tree.read().await.dirs.len()
    }

    /// Copy of every file, in path order.
    pub async fn snapshot(&self) -> Vec<(StagedPath, Vec<u8>)> {
        let tree = self.tree.read().await;
        tree.files.iter().map(|(p, b)| (p.clone(), b.clone())).collect()
    }

    /// Drop every file and directory.
    pub async fn clear(&self) {
        let mut tree = self.tree.write().await;
        tree.dirs.clear();
        tree.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> StagedPath {
        StagedPath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn create_dir_all_is_idempotent() {
        let fs = MemoryFs::new();
        fs.create_dir_all(&p("a/b")).await.unwrap();
        fs.create_dir_all(&p("a/b")).await.unwrap();
        fs.create_dir_all(&p("a")).await.unwrap();
        assert!(fs.is_dir(&p("a")).await);
        assert!(fs.is_dir(&p("a/b")).await);
        assert_eq!(fs.dir_count().await, 2);
    }

    #[tokio::test]
    async fn write_requires_existing_parent() {
        let fs = MemoryFs::new();
        let err = fs.write_file(&p("img/fig.png"), vec![1]).await.unwrap_err();
        assert_eq!(err, VfsError::NotFound("img".into()));

        fs.create_dir_all(&p("img")).await.unwrap();
        assert!(!fs.write_file(&p("img/fig.png"), vec![1]).await.unwrap());
        assert!(fs.write_file(&p("img/fig.png"), vec![2]).await.unwrap());
        assert_eq!(fs.read_file(&p("img/fig.png")).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn top_level_files_need_no_directory() {
        let fs = MemoryFs::new();
        fs.write_file(&p("main.md"), b"# Title".to_vec()).await.unwrap();
        assert_eq!(fs.list_dir(&StagedPath::root()).await.unwrap(), vec!["main.md"]);
    }

    #[tokio::test]
    async fn list_dir_shows_direct_children_only() {
        let fs = MemoryFs::new();
        fs.create_dir_all(&p("paper/img/raw")).await.unwrap();
        fs.write_file(&p("paper/main.md"), vec![]).await.unwrap();
        fs.write_file(&p("paper/img/fig.png"), vec![]).await.unwrap();

        assert_eq!(fs.list_dir(&p("paper")).await.unwrap(), vec!["img", "main.md"]);
        assert_eq!(fs.list_dir(&p("paper/img")).await.unwrap(), vec!["fig.png", "raw"]);
        assert_eq!(fs.list_dir(&StagedPath::root()).await.unwrap(), vec!["paper"]);
    }

    #[tokio::test]
    async fn files_and_directories_do_not_collide() {
        let fs = MemoryFs::new();
        fs.write_file(&p("notes"), vec![]).await.unwrap();
        assert_eq!(
            fs.create_dir_all(&p("notes/a")).await.unwrap_err(),
            VfsError::NotADirectory("notes".into())
        );

        fs.create_dir_all(&p("img")).await.unwrap();
        assert_eq!(
            fs.write_file(&p("img"), vec![]).await.unwrap_err(),
            VfsError::IsADirectory("img".into())
        );
        assert_eq!(
            fs.list_dir(&p("notes")).await.unwrap_err(),
            VfsError::NotADirectory("notes".into())
        );
    }

    #[tokio::test]
    async fn read_missing_file_fails() {
        let fs = MemoryFs::new();
        assert_eq!(
            fs.read_file(&p("out.docx")).await.unwrap_err(),
            VfsError::NotFound("out.docx".into())
        );
    }

    #[tokio::test]
    async fn clear_empties_everything() {
        let fs = MemoryFs::new();
        fs.create_dir_all(&p("a")).await.unwrap();
        fs.write_file(&p("a/b"), vec![1, 2]).await.unwrap();
        fs.clear().await;
        assert_eq!(fs.file_count().await, 0);
        assert_eq!(fs.dir_count().await, 0);
        assert!(fs.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn remove_file_drops_only_that_file() {
        let fs = MemoryFs::new();
        fs.create_dir_all(&p("a")).await.unwrap();
        fs.write_file(&p("a/b"), vec![1]).await.unwrap();
        fs.write_file(&p("out.docx"), vec![2]).await.unwrap();

        assert!(fs.remove_file(&p("out.docx")).await.unwrap());
        assert!(!fs.is_file(&p("out.docx")).await);
        assert!(!fs.remove_file(&p("out.docx")).await.unwrap());
        assert!(fs.is_file(&p("a/b")).await);
        assert_eq!(fs.remove_file(&p("a")).await, Err(VfsError::IsADirectory("a".into())));
    }
}
