//! Core engine for merging redundant Wikipedia talk-page banners ({{ITN
//! talk}}, {{On this day}}, {{dyk talk}}) into the {{article history}}
//! template, plus the MediaWiki plumbing the bot drivers share.

pub mod banner;
pub mod batch;
pub mod config;
pub mod error;
pub mod merge;
pub mod record;
pub mod remote;
pub mod scan;
pub mod timestamp;
