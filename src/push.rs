// Bento push workflow. One push runs strictly in order, on the calling
// thread:
//
// 1. reconcile the remote bento and bento version records (get, create if missing)
// 2. presign a direct-to-storage upload URL
// 3. build the archive in memory
// 4. mark the upload as started
// 5. PUT the archive to storage
// 6. report the upload outcome back to the registry
//
// Failures in steps 1-4 abort the push. A failed PUT is captured as an
// `UploadOutcome` and step 6 still runs; only a failing report aborts
// after the upload has started.

use crate::api::{ObjectStorage, Registry};
use crate::archive::build_archive;
use crate::bento::{BentoTag, LocalBento};
use crate::error::{CliError, Result};
use crate::schemas::{
    Bento, BentoVersion, BentoVersionManifest, CreateBento, CreateBentoVersion,
    FinishUploadBentoVersion, UploadStatus,
};
use crate::ui;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, info_span, warn};

/// Terminal result of the storage upload, reported back to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub status: UploadStatus,
    pub reason: String,
}

impl UploadOutcome {
    pub fn success() -> Self {
        UploadOutcome {
            status: UploadStatus::Success,
            reason: String::new(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        UploadOutcome {
            status: UploadStatus::Failed,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == UploadStatus::Success
    }
}

impl From<&UploadOutcome> for FinishUploadBentoVersion {
    fn from(outcome: &UploadOutcome) -> Self {
        FinishUploadBentoVersion {
            status: outcome.status,
            reason: outcome.reason.clone(),
        }
    }
}

/// Runs pushes against an already-authenticated registry handle.
pub struct Pusher<'a> {
    registry: &'a dyn Registry,
    storage: &'a dyn ObjectStorage,
    org: &'a str,
    quiet: bool,
}

impl<'a> Pusher<'a> {
    pub fn new(registry: &'a dyn Registry, storage: &'a dyn ObjectStorage, org: &'a str) -> Self {
        Pusher {
            registry,
            storage,
            org,
            quiet: false,
        }
    }

    /// Hide spinners and the upload bar.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Make sure the bento and its version exist remotely, creating either
    /// when missing. An existing version is reused as-is; its manifest is
    /// never re-submitted.
    pub fn reconcile(&self, local: &LocalBento) -> Result<(Bento, BentoVersion)> {
        let name = local.name();
        let version = local.version();

        let existing = {
            let _spinner = ui::spinner(format!("Fetching bento {name}"), self.quiet);
            self.registry.get_bento(self.org, name)?
        };
        let bento = match existing {
            Some(bento) => bento,
            None => {
                info!(bento = %name, "bento not found, creating it");
                let req = CreateBento {
                    name: name.to_string(),
                    description: String::new(),
                };
                self.registry.create_bento(self.org, &req)?
            }
        };

        let existing = {
            let _spinner = ui::spinner(format!("Fetching bento version {version}"), self.quiet);
            self.registry.get_bento_version(self.org, &bento.name, version)?
        };
        let bento_version = match existing {
            Some(record) => {
                debug!(bento = %name, version, "bento version exists, reusing it");
                record
            }
            None => {
                info!(bento = %name, version, "bento version not found, creating it");
                let req = CreateBentoVersion {
                    description: String::new(),
                    version: version.to_string(),
                    build_at: local.descriptor.metadata.created_at,
                    manifest: BentoVersionManifest::from(&local.descriptor),
                };
                self.registry.create_bento_version(self.org, &bento.name, &req)?
            }
        };

        Ok((bento, bento_version))
    }

    /// Ask for a fresh presigned upload URL. A response without one is
    /// treated like a failed call.
    pub fn presign(&self, bento: &Bento, version: &str) -> Result<String> {
        let record = self
            .registry
            .presign_bento_version_upload_url(self.org, &bento.name, version)?;
        record.presigned_url().map(str::to_string).ok_or_else(|| {
            CliError::Config(format!(
                "registry returned no presigned upload url for {}:{}",
                bento.name, version
            ))
        })
    }

    pub fn start_upload(&self, bento: &Bento, version: &str) -> Result<BentoVersion> {
        let _spinner = ui::spinner(format!("Starting upload bento {}", bento.name), self.quiet);
        self.registry
            .start_upload_bento_version(self.org, &bento.name, version)
    }

    /// PUT the archive to `url`, counting bytes on the progress bar as the
    /// transport reads them. Never fails: transport errors and non-2xx
    /// answers come back as a failed outcome.
    pub fn upload(&self, name: &str, url: &str, archive: Vec<u8>) -> UploadOutcome {
        let total = archive.len() as u64;
        let bar = ui::upload_bar(name, total, self.quiet);
        let body = Box::new(bar.wrap_read(Cursor::new(archive)));

        let outcome = match self.storage.put(url, body, total) {
            Ok(res) if res.is_success() => UploadOutcome::success(),
            Ok(res) => {
                warn!(status = res.status, "storage rejected the upload");
                if res.body.trim().is_empty() {
                    UploadOutcome::failed(format!(
                        "storage responded with status code {}",
                        res.status
                    ))
                } else {
                    UploadOutcome::failed(res.body)
                }
            }
            Err(err) => {
                warn!(error = %err, "upload to storage failed");
                UploadOutcome::failed(err.to_string())
            }
        };

        if outcome.is_success() {
            bar.finish();
        } else {
            bar.abandon();
        }
        outcome
    }

    pub fn report(
        &self,
        bento: &Bento,
        version: &str,
        outcome: &UploadOutcome,
    ) -> Result<BentoVersion> {
        debug!(bento = %bento.name, version, status = ?outcome.status, "reporting upload outcome");
        self.registry.finish_upload_bento_version(
            self.org,
            &bento.name,
            version,
            &FinishUploadBentoVersion::from(outcome),
        )
    }

    /// Run the whole workflow for one local bento.
    pub fn push(&self, local: &LocalBento) -> Result<UploadOutcome> {
        let _span = info_span!("push", bento = %local.tag).entered();
        let version = local.version();

        let (bento, _) = self.reconcile(local)?;
        let url = self.presign(&bento, version)?;

        let archive = {
            let _spinner = ui::spinner(format!("Taring bento {}", bento.name), self.quiet);
            build_archive(&local.path)?
        };

        self.start_upload(&bento, version)?;
        let outcome = self.upload(&bento.name, &url, archive);
        self.report(&bento, version, &outcome)?;

        info!(status = ?outcome.status, "push finished");
        Ok(outcome)
    }
}

/// Parse `tag` and load the bento it names from `repository`. Touches
/// neither the registry nor the context store.
pub fn load_local(repository: &Path, tag: &str) -> Result<LocalBento> {
    let tag: BentoTag = tag.parse()?;
    LocalBento::open(repository, &tag)
}

/// Load the bento named by `tag` and push it. Input errors surface before
/// any registry call.
pub fn push_bento(
    registry: &dyn Registry,
    storage: &dyn ObjectStorage,
    org: &str,
    repository: &Path,
    tag: &str,
    quiet: bool,
) -> Result<UploadOutcome> {
    let local = load_local(repository, tag)?;
    Pusher::new(registry, storage, org).quiet(quiet).push(&local)
}
