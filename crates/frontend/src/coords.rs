use sentinels_shared::models::Position;

/// Native width of the map surface. The world is drawn equirectangular,
/// 360 degrees of longitude across.
pub const MAP_WIDTH_PX: f64 = 2048.0;
/// Native height of the map surface, 180 degrees of latitude.
pub const MAP_HEIGHT_PX: f64 = 1024.0;

const PX_PER_DEGREE: f64 = MAP_WIDTH_PX / 360.0;

/// Project a geographic position onto the map surface.
pub fn position_to_map_px(position: Position) -> (f64, f64) {
    (
        (position.lng + 180.0) * PX_PER_DEGREE,
        (90.0 - position.lat) * PX_PER_DEGREE,
    )
}

/// Inverse of [`position_to_map_px`].
pub fn map_px_to_position(px_x: f64, px_y: f64) -> Position {
    Position::new(90.0 - px_y / PX_PER_DEGREE, px_x / PX_PER_DEGREE - 180.0)
}

/// Pure function: convert container-relative coordinates to native map pixels,
/// undoing zoom/pan CSS transform. Usable in unit tests (no web_sys dependency).
///
/// Only `container_w` is needed because the surface renders at `width:100%`
/// with a fixed aspect ratio, so both axes share the same scale factor.
pub fn client_to_map_px_zoomed(
    container_x: f64,
    container_y: f64,
    container_w: f64,
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
) -> Option<(f64, f64)> {
    if container_w <= 0.0 || zoom <= 0.0 {
        return None;
    }

    // Undo CSS transform: translate(pan_x, pan_y) scale(zoom)
    let rendered_x = (container_x - pan_x) / zoom;
    let rendered_y = (container_y - pan_y) / zoom;

    let scale = MAP_WIDTH_PX / container_w;
    let img_x = (rendered_x * scale).clamp(0.0, MAP_WIDTH_PX);
    let img_y = (rendered_y * scale).clamp(0.0, MAP_HEIGHT_PX);

    Some((img_x, img_y))
}

/// Get container-relative click coordinates using web_sys, then convert
/// from rendered pixel space to map pixel space, undoing zoom/pan transform.
pub fn click_to_map_px_zoomed(
    client_x: f64,
    client_y: f64,
    container_id: &str,
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
) -> Option<(f64, f64)> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(container_id)?;
    let rect = element.get_bounding_client_rect();

    let container_x = client_x - rect.left();
    let container_y = client_y - rect.top();

    client_to_map_px_zoomed(container_x, container_y, rect.width(), zoom, pan_x, pan_y)
}

/// Coordinates as shown in the detail panel: four decimals, latitude first.
pub fn format_position(position: Position) -> String {
    format!("{:.4}, {:.4}", position.lat, position.lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_corners() {
        let (x, y) = position_to_map_px(Position::new(90.0, -180.0));
        assert!(x.abs() < 1e-9 && y.abs() < 1e-9);
        let (x, y) = position_to_map_px(Position::new(-90.0, 180.0));
        assert!((x - MAP_WIDTH_PX).abs() < 1e-9);
        assert!((y - MAP_HEIGHT_PX).abs() < 1e-9);
    }

    #[test]
    fn test_projection_origin_is_center() {
        let (x, y) = position_to_map_px(Position::new(0.0, 0.0));
        assert!((x - 1024.0).abs() < 1e-9);
        assert!((y - 512.0).abs() < 1e-9);
    }

    #[test]
    fn test_map_px_to_position_and_back() {
        let original = Position::new(44.7, -63.6);
        let (px, py) = position_to_map_px(original);
        let back = map_px_to_position(px, py);
        assert!((back.lat - 44.7).abs() < 1e-9);
        assert!((back.lng - -63.6).abs() < 1e-9);
    }

    #[test]
    fn test_southern_hemisphere_is_below_equator() {
        let (_, y) = position_to_map_px(Position::new(-5.8, 11.5));
        assert!(y > MAP_HEIGHT_PX / 2.0);
    }

    #[test]
    fn test_client_to_map_px_zoomed_no_zoom() {
        // 800px wide container renders the surface at 800x400
        let result = client_to_map_px_zoomed(400.0, 200.0, 800.0, 1.0, 0.0, 0.0);
        let (x, y) = result.unwrap();
        assert!((x - 1024.0).abs() < 1e-6);
        assert!((y - 512.0).abs() < 1e-6);
    }

    #[test]
    fn test_client_to_map_px_zoomed_with_zoom() {
        let result = client_to_map_px_zoomed(400.0, 200.0, 800.0, 2.0, 0.0, 0.0);
        let (x, y) = result.unwrap();
        assert!((x - 512.0).abs() < 1e-6);
        assert!((y - 256.0).abs() < 1e-6);
    }

    #[test]
    fn test_client_to_map_px_zoomed_with_pan() {
        let result = client_to_map_px_zoomed(500.0, 250.0, 800.0, 1.0, 100.0, 50.0);
        let (x, y) = result.unwrap();
        assert!((x - 1024.0).abs() < 1e-6);
        assert!((y - 512.0).abs() < 1e-6);
    }

    #[test]
    fn test_client_to_map_px_zoomed_clamps() {
        let (x, y) = client_to_map_px_zoomed(-100.0, 5000.0, 800.0, 1.0, 0.0, 0.0).unwrap();
        assert!(x.abs() < 1e-9);
        assert!((y - MAP_HEIGHT_PX).abs() < 1e-9);
    }

    #[test]
    fn test_client_to_map_px_zoomed_invalid_container() {
        assert!(client_to_map_px_zoomed(400.0, 300.0, 0.0, 1.0, 0.0, 0.0).is_none());
        assert!(client_to_map_px_zoomed(400.0, 300.0, 800.0, 0.0, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_format_position_four_decimals() {
        assert_eq!(format_position(Position::new(13.2, 42.9)), "13.2000, 42.9000");
        assert_eq!(format_position(Position::new(-5.81234, 11.5)), "-5.8123, 11.5000");
    }
}
