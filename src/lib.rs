// Library root
// -----------
// The `yatai` binary (`main.rs`) is a thin shell over these modules.
//
// Module responsibilities:
// - `api`: HTTP clients for the registry and for presigned storage URLs,
//   behind the `Registry` / `ObjectStorage` traits.
// - `archive`: packs a bento directory into an in-memory tar.gz.
// - `bento`: `name:version` tags and the local bento repository.
// - `config`: the `~/.yatai.yaml` context store.
// - `error`: the shared error type and exit codes.
// - `push`: the bento push workflow.
// - `schemas`: registry records and the `bentoml.yml` descriptor.
// - `ui`: user-facing flows, spinners and progress bars.
pub mod api;
pub mod archive;
pub mod bento;
pub mod config;
pub mod error;
pub mod push;
pub mod schemas;
pub mod ui;
