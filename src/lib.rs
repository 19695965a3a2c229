// phishstream: phishing-domain detection for certificate transparency feeds
//
// This is the library root. Each module corresponds to a stage of the
// detection pipeline; main.rs is a thin CLI over it.

pub mod classifier;
pub mod config;
pub mod db;
pub mod features;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod status;
