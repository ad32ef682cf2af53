//! Vulnerability review over a labeled code dataset.
//!
//! Loads vulnerable samples, normalizes them, scans each with Bandit, masks
//! the flagged lines as fill-in-the-middle holes and asks a code model to
//! complete them. Results are collected into a Markdown report.

pub mod config;
pub mod dataset;
pub mod masking;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod review;
pub mod scanner;
