//! Command-line interface for dataselect.
//!
//! Provides commands for sample sizing, reservoir sampling, subset selection
//! and hard-negative mining over JSONL corpora.

mod commands;

pub use commands::{parse_cli, read_jsonl, run, run_with_cli, write_jsonl, Cli, Commands};
