use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub clips_dir: PathBuf,
    pub config_file: PathBuf,
}

impl AppPaths {
    pub fn resolve() -> AppResult<Self> {
        let project_dirs = ProjectDirs::from("io", "framecast", "framecast")
            .ok_or_else(|| AppError::Config("unable to resolve project directories".to_owned()))?;

        let config_dir = project_dirs.config_dir().to_path_buf();
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        let clips_dir = cache_dir.join("clips");
        let config_file = config_dir.join("config.toml");

        Ok(Self {
            config_dir,
            cache_dir,
            clips_dir,
            config_file,
        })
    }

    pub fn ensure_dirs(&self) -> AppResult<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::create_dir_all(&self.clips_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::AppPaths;

    #[test]
    fn ensure_dirs_creates_every_directory() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let root = temp.path();
        let paths = AppPaths {
            config_dir: root.join("config"),
            cache_dir: root.join("cache"),
            clips_dir: root.join("cache/clips"),
            config_file: root.join("config/config.toml"),
        };

        paths.ensure_dirs().expect("dirs");
        assert!(paths.config_dir.is_dir());
        assert!(paths.clips_dir.is_dir());
        assert!(!paths.config_file.exists());
    }
}
