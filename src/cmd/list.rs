//! List command

use anyhow::Result;
use kiln::catalog::{CatalogData, Catalogs};

/// List all known packages with their latest version
pub fn list(catalogs: &mut Catalogs, server: bool) -> Result<()> {
    if server {
        catalogs.official.refresh()?;
        print_packages(catalogs.official.data()?, None);
    } else {
        let local: Vec<String> = catalogs
            .complete
            .effective_local_packages()
            .keys()
            .map(|n| n.to_string())
            .collect();
        print_packages(catalogs.complete.data()?, Some(&local));
    }
    Ok(())
}

fn print_packages(data: &CatalogData, local: Option<&[String]>) {
    if data.package_count() == 0 {
        println!("No packages known. Run 'kiln refresh' first.");
        return;
    }

    for name in data.package_names() {
        let version = data
            .get_latest_version(name)
            .and_then(|id| data.get_version_by_id(id))
            .map(|v| v.version.as_str())
            .unwrap_or("?");
        let marker = match local {
            Some(local) if local.iter().any(|l| l.as_str() == name.as_str()) => " (local)",
            _ => "",
        };
        println!("  {name} {version}{marker}");
    }
}
