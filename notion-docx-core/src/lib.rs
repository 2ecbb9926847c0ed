#![doc = "notion-docx-core: core logic library for notion-docx."]

//! This crate contains all pipeline logic and data models for notion-docx:
//! the Notion content contract and HTTP client, the block-tree walker, the
//! document model and renderer, filter expressions, history persistence and
//! the .docx serializer. CLI glue and the Google Drive integration live in
//! the root crate.

pub mod config;
pub mod contract;
pub mod document;
pub mod docx;
pub mod estimation;
pub mod filter;
pub mod history;
pub mod notion;
pub mod render;
pub mod snapshot;
pub mod walker;
