//! # STAC Inventory Loader
//!
//! Turns satellite image records held in an inventory service into STAC
//! items, one record at a time, with a resumable checkpointed batch loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ to-do    │──▶│ Fetch        │──▶│ Normalize   │──▶│ Sink         │
//! │ − done   │   │ image/points │   │ + scope     │   │ folder/queue │
//! └──────────┘   │ cloud/stereo │   │   fixup     │   └──────┬───────┘
//!                └──────┬───────┘   └─────────────┘          │
//!                       │                                    ▼
//!                  ┌────┴─────┐                        ┌──────────┐
//!                  │  Token   │                        │  Ledger  │
//!                  │ manager  │                        │done/error│
//!                  └──────────┘                        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! stacload list-images all.txt
//! stacload process --todo-file all.txt --done-file done.txt \
//!     --error-file errors.txt --catalog wv04 --stac-folder out/
//! stacload show 10400100389D5B00 --catalog wv04
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Per-record error taxonomy |
//! | [`token`] | Cached OAuth client-credentials tokens |
//! | [`inventory`] | Inventory and selection HTTP client |
//! | [`fetch`] | Bounded concurrent per-record fetch |
//! | [`models`] | Inbound records and STAC output types |
//! | [`normalize`] | Record to STAC item conversion |
//! | [`scopes`] | Access policy scope rewriting |
//! | [`ledger`] | Done/error checkpoint files |
//! | [`sink`] | Folder and queue outputs |
//! | [`sqs`] | SigV4-signed SQS `SendMessage` |
//! | [`batch`] | Resumable batch runner |
//! | [`progress`] | Batch progress reporting |
//! | [`ingest`] | Command entry points |

pub mod batch;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod inventory;
pub mod ledger;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod scopes;
pub mod sink;
pub mod sqs;
pub mod token;
