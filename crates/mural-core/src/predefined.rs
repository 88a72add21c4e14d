//! Ready-made item specs for common shapes.
//!
//! Render descriptors produced here are plain JSON drawing instructions for
//! clients; the engine stores and forwards them without reading them.

use crate::hitbox::{Circle, GeometryError, Hitbox, Oval, Polygon, Rectangle, RoundedLine};
use crate::item::{ItemKind, ItemSpec};
use kurbo::Point;
use serde_json::json;
use std::collections::BTreeMap;

/// A filled rectangle centred on the item's position.
pub fn rectangle(width: f64, height: f64, colour: &str) -> Result<ItemSpec, GeometryError> {
    let x = -width / 2.0;
    let y = -height / 2.0;
    Ok(ItemSpec {
        hitbox: Some(Rectangle::at(x, y, width, height)?.into()),
        render: Some(json!({
            "shape": "rect",
            "x": x,
            "y": y,
            "width": width,
            "height": height,
            "fill": colour,
            "stroke": "black",
        })),
        ..ItemSpec::default()
    })
}

pub fn square(length: f64, colour: &str) -> Result<ItemSpec, GeometryError> {
    rectangle(length, length, colour)
}

pub fn circle(radius: f64, colour: &str) -> Result<ItemSpec, GeometryError> {
    Ok(ItemSpec {
        hitbox: Some(Circle::new(Point::ZERO, radius)?.into()),
        render: Some(json!({
            "shape": "circle",
            "radius": radius,
            "fill": colour,
            "stroke": "black",
        })),
        ..ItemSpec::default()
    })
}

pub fn oval(radius_x: f64, radius_y: f64, colour: &str) -> Result<ItemSpec, GeometryError> {
    Ok(ItemSpec {
        hitbox: Some(Oval::new(Point::ZERO, radius_x, radius_y)?.into()),
        render: Some(json!({
            "shape": "oval",
            "radius_x": radius_x,
            "radius_y": radius_y,
            "fill": colour,
            "stroke": "black",
        })),
        ..ItemSpec::default()
    })
}

/// A filled polygon. At least three points are required.
pub fn polygon(points: Vec<Point>, colour: &str) -> Result<ItemSpec, GeometryError> {
    let render = json!({
        "shape": "polygon",
        "points": points.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>(),
        "fill": colour,
        "stroke": "black",
    });
    Ok(ItemSpec {
        hitbox: Some(Polygon::new(points)?.into()),
        render: Some(render),
        ..ItemSpec::default()
    })
}

/// A round-capped line from the item's position to `(dx, dy)` relative to it.
pub fn line(dx: f64, dy: f64, width: f64, colour: &str) -> Result<ItemSpec, GeometryError> {
    Ok(ItemSpec {
        hitbox: Some(RoundedLine::new(Point::ZERO, Point::new(dx, dy), width)?.into()),
        render: Some(json!({
            "shape": "line",
            "dx": dx,
            "dy": dy,
            "width": width,
            "stroke": colour,
            "cap": "round",
        })),
        ..ItemSpec::default()
    })
}

/// An image; it only gets a hitbox when both dimensions are known.
pub fn image(
    src: &str,
    width: Option<f64>,
    height: Option<f64>,
) -> Result<ItemSpec, GeometryError> {
    let hitbox: Option<Hitbox> = match (width, height) {
        (Some(w), Some(h)) => Some(Rectangle::new(w, h)?.into()),
        _ => None,
    };
    Ok(ItemSpec {
        kind: ItemKind::Image {
            src: src.to_string(),
            width,
            height,
        },
        hitbox,
        ..ItemSpec::default()
    })
}

/// A markup element whose hitbox has its top-left corner at `(x, y)`.
pub fn element(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    tag: &str,
) -> Result<ItemSpec, GeometryError> {
    Ok(ItemSpec {
        kind: ItemKind::Element {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
        },
        hitbox: Some(Rectangle::at(x, y, width, height)?.into()),
        ..ItemSpec::default()
    })
}

/// A `div` wrapping the given markup.
pub fn html(markup: &str, width: f64, height: f64) -> Result<ItemSpec, GeometryError> {
    let mut attributes = BTreeMap::new();
    attributes.insert("innerHTML".to_string(), markup.to_string());
    Ok(ItemSpec {
        kind: ItemKind::Element {
            tag: "div".to_string(),
            attributes,
        },
        hitbox: Some(Rectangle::new(width, height)?.into()),
        ..ItemSpec::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hitbox::Hittable;
    use crate::ids::ItemId;
    use crate::item::Item;

    #[test]
    fn test_rectangle_is_centred() {
        let spec = rectangle(100.0, 50.0, "blue").unwrap().at(200.0, 200.0);
        let item = Item::from_spec(ItemId(1), spec);
        assert!(item.contains_point(Point::new(160.0, 180.0)));
        assert!(!item.contains_point(Point::new(260.0, 200.0)));
    }

    #[test]
    fn test_polygon_needs_three_points() {
        let err = polygon(vec![Point::ZERO, Point::new(1.0, 0.0)], "green").unwrap_err();
        assert_eq!(err, GeometryError::TooFewVertices(2));
    }

    #[test]
    fn test_line_hitbox() {
        let spec = line(100.0, 0.0, 10.0, "black").unwrap();
        let item = Item::from_spec(ItemId(1), spec);
        assert!(item.contains_point(Point::new(50.0, 4.0)));
        assert!(!item.contains_point(Point::new(50.0, 6.0)));
    }

    #[test]
    fn test_image_without_size_has_no_hitbox() {
        assert!(image("/cat.png", Some(10.0), None).unwrap().hitbox.is_none());
        assert!(image("/cat.png", Some(10.0), Some(20.0)).unwrap().hitbox.is_some());
    }

    #[test]
    fn test_html_wraps_markup() {
        let spec = html("<b>hi</b>", 100.0, 40.0).unwrap();
        let ItemKind::Element { tag, attributes } = spec.kind else {
            panic!("expected an element");
        };
        assert_eq!(tag, "div");
        assert_eq!(attributes["innerHTML"], "<b>hi</b>");
    }

    #[test]
    fn test_negative_size_rejected() {
        assert!(square(-5.0, "red").is_err());
        assert!(circle(-1.0, "red").is_err());
        assert!(element(0.0, 0.0, 10.0, f64::NAN, "p").is_err());
    }
}
