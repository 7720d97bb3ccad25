use super::RouteCatalog;
use crate::error::CatalogError;
use crate::route::Route;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Writes the whole catalog as JSON.
pub fn write_snapshot(catalog: &RouteCatalog, writer: impl Write) -> Result<(), CatalogError> {
    let routes = catalog.iter().collect::<Vec<_>>();
    serde_json::to_writer(writer, &routes)?;
    Ok(())
}

/// Reads a catalog previously written by [write_snapshot].
pub fn read_snapshot(reader: impl Read) -> Result<RouteCatalog, CatalogError> {
    let routes: Vec<Route> = serde_json::from_reader(reader)?;
    Ok(RouteCatalog::from_routes(routes))
}

/// Saves the catalog to a snapshot file.
pub fn save_snapshot(catalog: &RouteCatalog, path: impl AsRef<Path>) -> Result<(), CatalogError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_snapshot(catalog, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Loads a catalog from a snapshot file.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<RouteCatalog, CatalogError> {
    let path = path.as_ref();
    let catalog = read_snapshot(BufReader::new(File::open(path)?))?;
    log::info!("Loaded {} routes from {}", catalog.len(), path.display());
    Ok(catalog)
}
