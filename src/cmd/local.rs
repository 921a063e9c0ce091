//! Local package management commands

use std::path::Path;

use anyhow::Result;
use kiln::catalog::Catalogs;
use kiln::types::PackageName;

/// Register a local package at an explicit path
pub fn add(catalogs: &mut Catalogs, name: &str, dir: &Path) -> Result<()> {
    let name = PackageName::new(name);
    catalogs.complete.add_local_package(&name, dir)?;
    println!("✓ {name} now loads from {}", dir.display());
    Ok(())
}

/// Unregister a local package
pub fn remove(catalogs: &mut Catalogs, name: &str) -> Result<()> {
    let name = PackageName::new(name);
    catalogs.complete.remove_local_package(&name)?;
    println!("✓ {name} removed");
    Ok(())
}

/// List effective local packages
pub fn list(catalogs: &Catalogs) -> Result<()> {
    let local = catalogs.complete.effective_local_packages();
    if local.is_empty() {
        println!("No local packages.");
        return Ok(());
    }
    for (name, dir) in local {
        println!("  {name} {}", dir.display());
    }
    Ok(())
}
