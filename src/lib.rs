//! kittgen library
//!
//! Clones Kitt deployment descriptor templates once per target market,
//! rewrites the market-specific fields, registers the clones as deployment
//! tasks in the per-directory pipeline descriptor, and can undo every
//! filesystem side effect of a run via backup and rollback.

pub mod backup;
pub mod catalog;
pub mod cli;
pub mod context;
pub mod diff;
pub mod error;
pub mod generator;
pub mod registrar;
pub mod report;
pub mod rules;
pub mod run;
pub mod yaml;

// Re-export main types for convenience
pub use backup::{rollback, BackupManager, RollbackSummary};
pub use context::{RunContext, RunOptions};
pub use error::{KittgenError, Result};
pub use generator::{MarkerSubstitution, NamingStrategy};
pub use report::{ChangeRecord, ChangeReport, RunManifest};
pub use rules::{apply_rules, market_rules, MismatchPolicy, Rule, RewriteOutcome};
pub use run::{run, run_with_naming, RunSummary};
pub use yaml::{parse, Document, Node, ParseError};
