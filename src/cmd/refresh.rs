//! Refresh command

use anyhow::Result;
use kiln::catalog::Catalogs;

/// Rebuild the merged catalog from the registry snapshot and local trees
pub fn refresh(catalogs: &mut Catalogs) -> Result<()> {
    catalogs.complete.refresh()?;

    let data = catalogs.complete.data()?;
    println!(
        "{} packages, {} versions ({} local)",
        data.package_count(),
        data.version_count(),
        catalogs.complete.effective_local_packages().len()
    );
    Ok(())
}
