//! Build command

use anyhow::Result;
use kiln::catalog::Catalogs;
use kiln::types::PackageName;

/// Build a local package and its local build-order dependencies
pub fn build(catalogs: &mut Catalogs, package_str: &str) -> Result<()> {
    let package = PackageName::new(package_str);
    catalogs.complete.ensure_built(&package)?;

    if let Some(path) = catalogs
        .complete
        .get_load_path_for_package(&package, None)?
    {
        println!("✓ {package} built at {}", path.display());
    }
    Ok(())
}
