use std::path::{Path, PathBuf};

use anyhow::Context;
use uuid::Uuid;

/// An exclusively-owned scratch directory, created fresh per request and
/// never shared. Cleanup is best-effort and must happen on every exit
/// path: call [`Workspace::release`] on the way out; `Drop` runs the same
/// sweep synchronously if an early return or panic skipped it.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    released: bool,
}

impl Workspace {
    pub async fn allocate(root: &Path) -> anyhow::Result<Self> {
        let dir = root.join(format!("runcode-{}", Uuid::new_v4().as_simple()));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create workspace {}", dir.display()))?;
        Ok(Self {
            dir,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub async fn write_file(&self, name: &str, contents: &str) -> anyhow::Result<PathBuf> {
        let path = self.dir.join(name);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Deletes every file in the directory, then the directory itself.
    /// Not recursive: adapters never create nested directories. All
    /// errors are swallowed.
    pub async fn release(mut self) {
        self.released = true;
        let dir = self.dir.clone();
        if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let _ = tokio::fs::remove_file(entry.path()).await;
            }
        }
        let _ = tokio::fs::remove_dir(&dir).await;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Ok(entries) = std::fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let _ = std::fs::remove_file(entry.path());
            }
        }
        let _ = std::fs::remove_dir(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::Workspace;

    #[tokio::test]
    async fn release_leaves_nothing_behind() {
        let ws = Workspace::allocate(&std::env::temp_dir()).await.unwrap();
        let dir = ws.path().to_path_buf();
        ws.write_file("solution.py", "print('hi')").await.unwrap();
        ws.write_file("data.txt", "scratch").await.unwrap();
        assert!(dir.exists());

        ws.release().await;
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn concurrent_allocations_never_collide() {
        let a = Workspace::allocate(&std::env::temp_dir()).await.unwrap();
        let b = Workspace::allocate(&std::env::temp_dir()).await.unwrap();
        assert_ne!(a.path(), b.path());
        a.release().await;
        b.release().await;
    }

    #[tokio::test]
    async fn drop_is_a_cleanup_backstop() {
        let dir = {
            let ws = Workspace::allocate(&std::env::temp_dir()).await.unwrap();
            ws.write_file("left-behind.txt", "x").await.unwrap();
            ws.path().to_path_buf()
            // dropped without release
        };
        assert!(!dir.exists());
    }
}
