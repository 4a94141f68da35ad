//! # Feishu Fetcher
//!
//! Pulls rows of a Feishu/Lark Bitable view into a local folder of notes.
//! Each row becomes one file whose path comes from its `Title` and
//! `SubFolder` columns and whose content is its `MD` column.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌───────────┐
//! │  Filter  │──▶│ Token + Page │──▶│ Normalizer │──▶│ Reconciler│──▶ vault
//! │ selector │   │   search     │   │            │   │           │
//! └──────────┘   └──────────────┘   └────────────┘   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ffetch init                                   # write a starter config
//! ffetch source add --name Reading --url "https://acme.feishu.cn/base/..." \
//!     --app-id cli_xxx --app-secret xxx --path Feishu/Reading
//! ffetch fetch Reading --filter week
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`credentials`] | At-rest obfuscation of app credentials |
//! | [`models`] | Source descriptor, recency filters, records |
//! | [`auth`] | App access token |
//! | [`fetch`] | Paginated record search |
//! | [`normalize`] | Field shape normalization |
//! | [`reconcile`] | Records → vault files |
//! | [`vault`] | File store trait and implementations |
//! | [`select`] | Recency filter selection |
//! | [`notice`] | User-facing notices |
//! | [`sync`] | Pipeline orchestration |

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod export;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod notice;
pub mod reconcile;
pub mod select;
pub mod sources;
pub mod sync;
pub mod transport;
pub mod vault;
