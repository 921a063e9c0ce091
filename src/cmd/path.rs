//! Path command

use anyhow::{bail, Result};
use kiln::catalog::Catalogs;
use kiln::types::PackageName;

/// Print the load path for a package, building it first if local
pub fn path(catalogs: &mut Catalogs, package_str: &str, version: Option<&str>) -> Result<()> {
    let package = PackageName::new(package_str);
    match catalogs
        .complete
        .get_load_path_for_package(&package, version)?
    {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => bail!("Package '{package}' is not present on disk"),
    }
}
