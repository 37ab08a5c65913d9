use std::{
    io::Write,
    path::{Path, PathBuf},
};

use {
    secrecy::Secret,
    telefwd_common::{ChatDescriptor, Error, Result},
    tracing::{debug, warn},
};

use crate::schema::ForwarderConfig;

/// The configuration record plus the file it lives in.
///
/// Every mutator persists immediately. Mutations that happen inside the
/// forwarding loop (the counter) use [`ConfigStore::advance_counter`], which
/// logs persistence failures instead of failing the loop.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: ForwarderConfig,
}

impl ConfigStore {
    /// Load the record from `path`. A missing file yields the documented
    /// defaults; a malformed file is a fatal configuration error.
    pub fn load(path: PathBuf) -> Result<Self> {
        let config = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| Error::ConfigFile {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                ForwarderConfig::default()
            },
            Err(e) => return Err(e.into()),
        };
        config.validate()?;
        Ok(Self { path, config })
    }

    /// Load from the standard location (see [`crate::paths`]).
    pub fn load_default() -> Result<Self> {
        Self::load(crate::paths::config_path())
    }

    #[must_use]
    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full record as pretty JSON. The write goes to a temp file
    /// in the same directory and is renamed over the target, so a crash on
    /// the common path leaves either the old or the new file, not a torn one.
    pub fn save(&self) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        let json = serde_json::to_string_pretty(&self.config).map_err(|source| {
            Error::ConfigFile {
                path: self.path.clone(),
                source,
            }
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Io(e.error))?;
        debug!(path = %self.path.display(), "saved config");
        Ok(())
    }

    /// The caption the next media message gets: `"<prefix> <counter>"`.
    #[must_use]
    pub fn next_caption(&self) -> String {
        self.config.next_caption()
    }

    /// Increment the counter after a successful custom-caption forward and
    /// persist. Persistence failures are logged, not fatal: the loop keeps
    /// going with in-memory state.
    pub fn advance_counter(&mut self) {
        self.config.counter += 1;
        if let Err(e) = self.save() {
            warn!(counter = self.config.counter, error = %e, "failed to persist counter");
        }
    }

    /// Select the source and destination chats. Rejects identical ids.
    pub fn set_chats(
        &mut self,
        source: &ChatDescriptor,
        destination: &ChatDescriptor,
    ) -> Result<()> {
        if source.id == destination.id {
            return Err(Error::InvalidConfig(
                "destination chat cannot be the same as the source chat".into(),
            ));
        }
        self.config.source_chat_id = Some(source.id);
        self.config.source_name = source.display_name.clone();
        self.config.destination_chat_id = Some(destination.id);
        self.config.destination_name = destination.display_name.clone();
        self.save()
    }

    pub fn set_caption_prefix(&mut self, prefix: impl Into<String>) -> Result<()> {
        self.config.caption_prefix = prefix.into();
        self.save()
    }

    pub fn reset_counter(&mut self) -> Result<()> {
        self.config.counter = 1;
        self.save()
    }

    pub fn set_credentials(&mut self, api_id: i32, api_hash: impl Into<String>) -> Result<()> {
        self.config.api_id = Some(api_id);
        self.config.api_hash = Some(Secret::new(api_hash.into()));
        self.save()
    }

    /// Forget the stored credentials (logout). The session artifact is
    /// removed separately by the session owner.
    pub fn clear_credentials(&mut self) -> Result<()> {
        self.config.api_id = None;
        self.config.api_hash = None;
        self.save()
    }
}
