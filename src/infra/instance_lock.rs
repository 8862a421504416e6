use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use fs2::FileExt;

use crate::infra::error::AppError;

/// Advisory lock held for the lifetime of a running client of one profile.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Self, AppError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| AppError::InstanceLock {
                path: path.to_path_buf(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                file,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == fs2::lock_contended_error().kind() => {
                Err(AppError::InstanceBusy {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(AppError::InstanceLock {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(error) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %error, "instance unlock failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_on_same_profile_is_busy() {
        let dir = tempfile::tempdir().expect("temp dir must be created");
        let path = dir.path().join("instance.lock");

        let _held = InstanceLock::acquire(&path).expect("first lock should succeed");
        let error = InstanceLock::acquire(&path).expect_err("second lock must fail");

        assert!(matches!(error, AppError::InstanceBusy { .. }));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().expect("temp dir must be created");
        let path = dir.path().join("instance.lock");

        drop(InstanceLock::acquire(&path).expect("first lock should succeed"));

        let again = InstanceLock::acquire(&path).expect("lock should be free again");
        assert_eq!(again.path.as_path(), path.as_path());
    }
}
