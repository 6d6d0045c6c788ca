//! Template discovery by naming convention.
//!
//! Selection is name-based only; nothing reads file content at this stage.
//! Results are sorted lexicographically, never filesystem order, so the
//! downstream task-append order is reproducible across machines.

use crate::error::Result;
use std::fs;
use std::path::Path;

/// Product prefix every descriptor filename carries.
pub const PRODUCT_PREFIX: &str = "kitt";
/// Descriptor file extension.
pub const DESCRIPTOR_EXT: &str = ".yml";
/// Primary-region marker of the reference market.
pub const PRIMARY_MARKER: &str = "us-wm.primary";
/// Secondary-region marker of the reference market.
pub const SECONDARY_MARKER: &str = "us-wm.secondary";
/// Region portion substituted with the target market code.
pub const REGION_MARKER: &str = "us-wm";
/// Placeholder token meaning "to be replaced by the market cell code".
pub const CELL_TOKEN: &str = "cell000";
/// Fixed name of the per-directory pipeline descriptor.
pub const PIPELINE_DESCRIPTOR: &str = "kitt.yml";

/// Canonical top-level template names without a region marker.
const CANONICAL_TEMPLATES: [&str; 2] = ["kitt.primary.yml", "kitt.secondary.yml"];

/// Does this filename name a cloneable template?
pub fn is_template(name: &str) -> bool {
    if !name.starts_with(PRODUCT_PREFIX) || !name.ends_with(DESCRIPTOR_EXT) {
        return false;
    }
    name.contains(PRIMARY_MARKER)
        || name.contains(SECONDARY_MARKER)
        || CANONICAL_TEMPLATES.contains(&name)
        || name.contains(CELL_TOKEN)
}

/// Discover template filenames in `dir`, sorted lexicographically.
pub fn discover(dir: &Path) -> Result<Vec<String>> {
    let mut templates = Vec::new();
    for dir_entry in fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_file() {
            continue;
        }
        let name = dir_entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if is_template(name) {
            templates.push(name.to_string());
        }
    }
    templates.sort();
    Ok(templates)
}
