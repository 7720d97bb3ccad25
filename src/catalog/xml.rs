use super::RouteCatalog;
use crate::error::CatalogError;
use crate::route::{Route, RouteKey, StopSequence};
use crate::Position;
use roxmltree::{Document, Node};
use std::path::Path;

/// Loads a catalog from an XML route file. See [parse_xml] for the format.
pub fn load_xml(path: impl AsRef<Path>) -> Result<RouteCatalog, CatalogError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let catalog = parse_xml(&text)?;
    log::info!("Loaded {} routes from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Parses a catalog from XML.
///
/// The document consists of `route` elements. Each has a `number` element
/// and `up`, `down` or `updown` elements describing the stops of a direction.
/// These contain a `name` and a `stops` element holding `stop` elements with
/// `lat` and `lon` attributes. An `updown` path serves both directions.
///
/// Routes with more than one path per direction are skipped, as are routes
/// without an outbound path.
pub fn parse_xml(text: &str) -> Result<RouteCatalog, CatalogError> {
    let doc = Document::parse(text)?;
    let mut catalog = RouteCatalog::new();

    for route in children(doc.root_element(), "route") {
        let ups = children(route, "up").collect::<Vec<_>>();
        let downs = children(route, "down").collect::<Vec<_>>();
        let updowns = children(route, "updown").collect::<Vec<_>>();

        let number = children(route, "number")
            .next()
            .and_then(|n| n.text())
            .map(str::trim);

        if ups.len() > 1 || downs.len() > 1 || updowns.len() > 1 {
            log::warn!(
                "Route {} has multiple up and down paths, which are not handled",
                number.unwrap_or("without a number")
            );
            continue;
        }

        let number =
            number.ok_or_else(|| CatalogError::Parse("route without a number".into()))?;
        let key = number
            .parse::<u32>()
            .map(RouteKey::Number)
            .map_err(|_| CatalogError::Parse(format!("invalid route number {:?}", number)))?;
        log::debug!("Creating routes for {}", key);

        // An `updown` path takes the place of the `up` path
        let up = match updowns.first().or(ups.first()) {
            Some(node) => stops_of(*node)?,
            None => {
                log::debug!("Route {} has no up path", key);
                continue;
            }
        };
        let down = match downs.first() {
            Some(node) => Some(vec![stops_of(*node)?]),
            None => None,
        };

        catalog.insert(Route::new(key, vec![up], down)?);
    }

    Ok(catalog)
}

/// Iterates over the child elements with the given tag name.
fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.has_tag_name(name))
}

/// Builds a stop sequence from an `up`, `down` or `updown` element.
fn stops_of(path: Node) -> Result<StopSequence, CatalogError> {
    if let Some(name) = children(path, "name").next().and_then(|n| n.text()) {
        log::debug!("    {}", name.trim());
    }
    let stops = children(path, "stops")
        .next()
        .ok_or_else(|| CatalogError::Parse("path without stops".into()))?;
    children(stops, "stop")
        .map(|stop| -> Result<Position, CatalogError> {
            Ok(Position::new(
                coordinate(stop, "lat")?,
                coordinate(stop, "lon")?,
            ))
        })
        .collect()
}

fn coordinate(stop: Node, attr: &str) -> Result<f64, CatalogError> {
    let value = stop
        .attribute(attr)
        .ok_or_else(|| CatalogError::Parse(format!("stop without {}", attr)))?;
    value
        .trim()
        .parse()
        .map_err(|_| CatalogError::Parse(format!("invalid {} {:?}", attr, value)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::route::Direction;

    const ROUTES: &str = r#"
        <routes>
            <route>
                <number>728</number>
                <up>
                    <name>Restelo - Portela</name>
                    <stops>
                        <stop lat="38.7035" lon="-9.2110"/>
                        <stop lat="38.7071" lon="-9.1960"/>
                        <stop lat="38.7120" lon="-9.1700"/>
                    </stops>
                </up>
                <down>
                    <name>Portela - Restelo</name>
                    <stops>
                        <stop lat="38.7121" lon="-9.1702"/>
                        <stop lat="38.7036" lon="-9.2112"/>
                    </stops>
                </down>
            </route>
            <route>
                <number>15</number>
                <updown>
                    <name>Circular</name>
                    <stops>
                        <stop lat="38.7000" lon="-9.1800"/>
                        <stop lat="38.7100" lon="-9.1500"/>
                    </stops>
                </updown>
            </route>
            <route>
                <number>760</number>
                <up><name>A</name><stops><stop lat="38.7" lon="-9.1"/></stops></up>
                <up><name>B</name><stops><stop lat="38.8" lon="-9.2"/></stops></up>
            </route>
            <route>
                <number>12</number>
                <down><name>Only down</name><stops><stop lat="38.7" lon="-9.1"/></stops></down>
            </route>
        </routes>
    "#;

    #[test]
    fn parses_routes() {
        let catalog = parse_xml(ROUTES).unwrap();
        assert_eq!(catalog.len(), 2);

        let route = catalog.route(&RouteKey::Number(728)).unwrap();
        assert_eq!(route.candidates(Direction::Outbound)[0].len(), 3);
        assert_eq!(route.candidates(Direction::Inbound)[0].len(), 2);
        assert_eq!(
            route.candidates(Direction::Outbound)[0][1],
            Position::new(38.7071, -9.1960)
        );
    }

    #[test]
    fn updown_is_mirrored() {
        let catalog = parse_xml(ROUTES).unwrap();
        let route = catalog.route(&RouteKey::Number(15)).unwrap();
        let up = &route.candidates(Direction::Outbound)[0];
        let down = &route.candidates(Direction::Inbound)[0];
        assert_eq!(up[0], down[1]);
        assert_eq!(up[1], down[0]);
    }

    #[test]
    fn skips_multiple_paths() {
        let catalog = parse_xml(ROUTES).unwrap();
        assert!(catalog.route(&RouteKey::Number(760)).is_err());
        assert!(catalog.route(&RouteKey::Number(12)).is_err());
    }

    #[test]
    fn skips_multiple_paths_before_reading_number() {
        let xml = r#"<routes>
            <route>
                <number>7B</number>
                <up><stops><stop lat="38.7" lon="-9.1"/></stops></up>
                <up><stops><stop lat="38.8" lon="-9.2"/></stops></up>
            </route>
            <route>
                <down><stops><stop lat="38.7" lon="-9.1"/></stops></down>
                <down><stops><stop lat="38.8" lon="-9.2"/></stops></down>
            </route>
            <route>
                <number>3</number>
                <up><stops><stop lat="38.7" lon="-9.1"/></stops></up>
            </route>
        </routes>"#;
        let catalog = parse_xml(xml).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.route(&RouteKey::Number(3)).is_ok());
    }

    #[test]
    fn rejects_bad_route_number() {
        let xml = r#"<routes><route><number>7B</number>
            <up><stops><stop lat="38.7" lon="-9.1"/></stops></up>
        </route></routes>"#;
        assert!(matches!(parse_xml(xml), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn rejects_bad_coordinates() {
        let xml = r#"<routes><route><number>1</number>
            <up><stops><stop lat="north" lon="-9.1"/></stops></up>
        </route></routes>"#;
        assert!(matches!(parse_xml(xml), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(matches!(parse_xml("<routes>"), Err(CatalogError::Xml(_))));
    }
}
