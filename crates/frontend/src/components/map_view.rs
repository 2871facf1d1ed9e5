use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;
use sentinels_shared::compose::ComposedView;
use sentinels_shared::controller::{Controller, Selection};
use sentinels_shared::models::{Category, Position};
use sentinels_shared::store::Effect;

use crate::coords::{self, MAP_HEIGHT_PX, MAP_WIDTH_PX};

const MAP_CONTAINER_ID: &str = "sentinels-map-container";

/// Drag threshold in pixels. Less movement than this counts as a click.
const DRAG_THRESHOLD: f64 = 3.0;

/// Touch drag threshold in pixels.
const TOUCH_DRAG_THRESHOLD: f64 = 8.0;

const ZOOM_MIN: f64 = 1.0;
/// Deep enough to pull apart markers a few hundred meters from each other.
const ZOOM_MAX: f64 = 512.0;
const ZOOM_STEP: f64 = 1.2;

/// Click radius (in map pixels at zoom 1) that still selects a marker.
const HIT_THRESHOLD: f64 = 14.0;

/// Reference container width (desktop map panel) used to normalize marker sizes.
const REFERENCE_WIDTH: f64 = 960.0;

/// Wall-clock milliseconds, used to allocate ids for new markers.
fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

fn container_rect() -> Option<web_sys::DomRect> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(MAP_CONTAINER_ID)?;
    Some(element.get_bounding_client_rect())
}

// ---------------------------------------------------------------------------
// Zoom / pan math
// ---------------------------------------------------------------------------

/// Compute new pan offsets so that `cursor` stays over the same content point
/// when zooming from `old_zoom` to `new_zoom`.
fn zoom_pan_at_cursor(
    cursor_x: f64,
    cursor_y: f64,
    old_zoom: f64,
    new_zoom: f64,
    old_pan_x: f64,
    old_pan_y: f64,
) -> (f64, f64) {
    let content_x = (cursor_x - old_pan_x) / old_zoom;
    let content_y = (cursor_y - old_pan_y) / old_zoom;
    (
        cursor_x - content_x * new_zoom,
        cursor_y - content_y * new_zoom,
    )
}

/// Clamp pan values so the map can't be dragged off-screen.
///
/// The surface renders at the container's width with a 2:1 aspect ratio, so
/// its height follows from the width, not from the container height.
fn clamp_pan(pan_x: f64, pan_y: f64, zoom: f64, container_w: f64, container_h: f64) -> (f64, f64) {
    let content_w = container_w * zoom;
    let content_h = container_w * (MAP_HEIGHT_PX / MAP_WIDTH_PX) * zoom;
    let min_pan_x = -(content_w - container_w).max(0.0);
    let min_pan_y = -(content_h - container_h).max(0.0);
    (pan_x.clamp(min_pan_x, 0.0), pan_y.clamp(min_pan_y, 0.0))
}

fn clamp_pan_to_container(pan_x: f64, pan_y: f64, zoom: f64) -> (f64, f64) {
    match container_rect() {
        Some(rect) => clamp_pan(pan_x, pan_y, zoom, rect.width(), rect.height()),
        None => (pan_x, pan_y),
    }
}

/// Convert a wheel delta (pixels / lines / pages) to a uniform pixel-like value.
fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

fn point_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

// ---------------------------------------------------------------------------
// Marker geometry
// ---------------------------------------------------------------------------

/// A composed marker placed on the map surface.
#[derive(Debug, Clone, PartialEq)]
struct MarkerDot {
    category: Category,
    id: u64,
    name: String,
    x: f64,
    y: f64,
}

fn marker_dots(view: &ComposedView<'_>) -> Vec<MarkerDot> {
    view.iter()
        .map(|m| {
            let (x, y) = coords::position_to_map_px(m.position);
            MarkerDot {
                category: m.category,
                id: m.id,
                name: m.name.clone(),
                x,
                y,
            }
        })
        .collect()
}

/// The marker nearest to `click` within `threshold`. Later markers win ties,
/// matching draw order (they sit on top).
fn hit_test(dots: &[MarkerDot], click: (f64, f64), threshold: f64) -> Option<Selection> {
    let mut best = None;
    let mut best_dist = threshold;
    for dot in dots {
        let dist = point_distance((dot.x, dot.y), click);
        if dist <= best_dist {
            best_dist = dist;
            best = Some(Selection {
                category: dot.category,
                id: dot.id,
            });
        }
    }
    best
}

// ---------------------------------------------------------------------------
// SVG builder
// ---------------------------------------------------------------------------

/// Names are user input and end up inside raw SVG markup.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Build the full SVG content as a string for reliable rendering.
/// Positions are in native map pixel space (2048×1024).
fn build_svg_content(
    dots: &[MarkerDot],
    zoom: f64,
    container_width: f64,
    selected: Option<Selection>,
) -> String {
    let mut svg = String::with_capacity(8192);

    // Keeps markers and strokes a constant size on screen at any zoom and
    // container width.
    let mobile_boost = (REFERENCE_WIDTH / container_width).max(1.0);
    let s = mobile_boost / zoom;

    build_graticule(&mut svg, 30, "rgba(0,255,153,0.18)", s);
    if zoom >= 4.0 {
        build_graticule(&mut svg, 10, "rgba(0,255,153,0.10)", 0.6 * s);
    }
    if zoom >= 32.0 {
        build_graticule(&mut svg, 1, "rgba(0,255,153,0.06)", 0.5 * s);
    }
    build_equator(&mut svg, s);
    build_markers(&mut svg, dots, s, selected);

    svg
}

/// Meridians and parallels every `step` degrees.
fn build_graticule(svg: &mut String, step: usize, stroke: &str, s: f64) {
    let sw = 1.0 * s;
    for lng in (-180..=180).step_by(step) {
        let (x, _) = coords::position_to_map_px(Position::new(0.0, lng as f64));
        svg.push_str(&format!(
            r#"<line x1="{x}" y1="0" x2="{x}" y2="{MAP_HEIGHT_PX}" stroke="{stroke}" stroke-width="{sw}"/>"#
        ));
    }
    for lat in (-90..=90).step_by(step) {
        let (_, y) = coords::position_to_map_px(Position::new(lat as f64, 0.0));
        svg.push_str(&format!(
            r#"<line x1="0" y1="{y}" x2="{MAP_WIDTH_PX}" y2="{y}" stroke="{stroke}" stroke-width="{sw}"/>"#
        ));
    }
}

fn build_equator(svg: &mut String, s: f64) {
    let y = MAP_HEIGHT_PX / 2.0;
    let sw = 1.5 * s;
    let da1 = 10.0 * s;
    let da2 = 6.0 * s;
    svg.push_str(&format!(
        r#"<line x1="0" y1="{y}" x2="{MAP_WIDTH_PX}" y2="{y}" stroke="rgba(0,255,153,0.35)" stroke-width="{sw}" stroke-dasharray="{da1} {da2}"/>"#
    ));
}

fn build_markers(svg: &mut String, dots: &[MarkerDot], s: f64, selected: Option<Selection>) {
    for dot in dots {
        let (x, y) = (dot.x, dot.y);
        let color = dot.category.color();
        let r = 6.0 * s;
        let sw = 1.5 * s;
        let glow = 4.0 * s;
        let title = escape_xml(&dot.name);
        svg.push_str(&format!(r##"<g role="img"><title>{title}</title>"##));
        if dot.category.pulses() {
            build_pulse_ring(svg, x, y, color, s);
        }
        svg.push_str(&format!(
            r##"<circle cx="{x}" cy="{y}" r="{glow_r}" fill="{color}" opacity="0.25"/>"##,
            glow_r = r + glow
        ));
        svg.push_str(&format!(
            r##"<circle cx="{x}" cy="{y}" r="{r}" fill="{color}" stroke="#000" stroke-width="{sw}"/>"##
        ));
        if selected
            == Some(Selection {
                category: dot.category,
                id: dot.id,
            })
        {
            build_selection_ring(svg, x, y, s);
        }
        svg.push_str("</g>");
    }
}

/// Expanding, fading ring drawn around threat markers.
fn build_pulse_ring(svg: &mut String, cx: f64, cy: f64, color: &str, s: f64) {
    let r0 = 6.0 * s;
    let r1 = 20.0 * s;
    let sw = 2.0 * s;
    svg.push_str(&format!(
        r##"<circle cx="{cx}" cy="{cy}" r="{r0}" fill="none" stroke="{color}" stroke-width="{sw}"><animate attributeName="r" values="{r0};{r1}" dur="1.5s" repeatCount="indefinite"/><animate attributeName="opacity" values="0.9;0" dur="1.5s" repeatCount="indefinite"/></circle>"##
    ));
}

/// Emit an animated dashed selection ring around a marker.
fn build_selection_ring(svg: &mut String, cx: f64, cy: f64, s: f64) {
    let r = 14.0 * s;
    let sw = 2.0 * s;
    let da1 = 4.0 * s;
    let da2 = 3.0 * s;
    svg.push_str(&format!(
        r##"<circle cx="{cx}" cy="{cy}" r="{r}" fill="none" stroke="white" stroke-width="{sw}" stroke-dasharray="{da1} {da2}" opacity="0.9"><animate attributeName="opacity" values="0.5;1;0.5" dur="1.2s" repeatCount="indefinite"/></circle>"##
    ));
}

// ---------------------------------------------------------------------------
// Click handling (shared by mouse and touch)
// ---------------------------------------------------------------------------

/// A click on a marker selects it; anywhere else it goes to add mode.
fn handle_map_click(
    img_x: f64,
    img_y: f64,
    zoom: f64,
    controller: &mut Signal<Controller>,
    on_effect: &EventHandler<Effect>,
) {
    let hit = {
        let ctl = controller.read();
        let dots = marker_dots(&ctl.composed());
        hit_test(&dots, (img_x, img_y), HIT_THRESHOLD / zoom)
    };
    if let Some(sel) = hit {
        controller.write().select_marker(sel.category, sel.id);
        return;
    }
    let position = coords::map_px_to_position(img_x, img_y);
    let effect = controller.write().map_click(position, now_ms());
    if effect != Effect::None {
        on_effect.call(effect);
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

#[component]
pub fn MapView(controller: Signal<Controller>, on_effect: EventHandler<Effect>) -> Element {
    let mut controller = controller;

    let mut zoom = use_signal(|| 1.0_f64);
    let mut pan_x = use_signal(|| 0.0_f64);
    let mut pan_y = use_signal(|| 0.0_f64);

    // Drag state (mouse)
    let mut is_dragging = use_signal(|| false);
    let mut did_drag = use_signal(|| false);
    let mut drag_start_x = use_signal(|| 0.0_f64);
    let mut drag_start_y = use_signal(|| 0.0_f64);
    let mut drag_start_pan_x = use_signal(|| 0.0_f64);
    let mut drag_start_pan_y = use_signal(|| 0.0_f64);

    // Touch state
    let mut touch_start_pos = use_signal(|| None::<(f64, f64)>);
    let mut touch_did_pan = use_signal(|| false);
    let mut touch_start_pan_x = use_signal(|| 0.0_f64);
    let mut touch_start_pan_y = use_signal(|| 0.0_f64);

    // Geographic position under the cursor
    let mut cursor = use_signal(|| None::<Position>);

    // Pan changes are read outside this memo so they don't trigger SVG rebuilds.
    let svg_html = use_memo(move || {
        let ctl = controller.read();
        let dots = marker_dots(&ctl.composed());
        let cur_zoom = *zoom.read();
        let cw = container_rect().map(|r| r.width()).unwrap_or(REFERENCE_WIDTH);
        let svg_content = build_svg_content(&dots, cur_zoom, cw, ctl.selection());
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" preserveAspectRatio="none" style="position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;z-index:5;">{}</svg>"#,
            MAP_WIDTH_PX, MAP_HEIGHT_PX, svg_content
        )
    });

    let cur_pan_x = *pan_x.read();
    let cur_pan_y = *pan_y.read();
    let cur_zoom = *zoom.read();
    let add_mode = controller.read().add_mode();

    let transform_style = format!(
        "transform: translate({cur_pan_x}px, {cur_pan_y}px) scale({cur_zoom}); transform-origin: 0 0;"
    );
    let container_class = if *is_dragging.read() && *did_drag.read() {
        "map-container dragging"
    } else if add_mode.is_some() {
        "map-container adding"
    } else {
        "map-container"
    };
    let cursor_readout = (*cursor.read()).map(coords::format_position);

    rsx! {
        div {
            id: MAP_CONTAINER_ID,
            class: "{container_class}",

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();

                let delta_y = wheel_delta_y(evt.data().delta());
                let factor = if delta_y < 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
                let old_z = *zoom.read();
                let new_z = (old_z * factor).clamp(ZOOM_MIN, ZOOM_MAX);
                if (new_z - old_z).abs() < 1e-9 {
                    return;
                }

                let Some(rect) = container_rect() else { return };
                let client = evt.data().client_coordinates();
                let cx = client.x - rect.left();
                let cy = client.y - rect.top();

                let (new_px, new_py) =
                    zoom_pan_at_cursor(cx, cy, old_z, new_z, *pan_x.read(), *pan_y.read());
                let (px, py) = clamp_pan(new_px, new_py, new_z, rect.width(), rect.height());

                zoom.set(new_z);
                pan_x.set(px);
                pan_y.set(py);
            },

            onmousedown: move |evt: Event<MouseData>| {
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let client = evt.client_coordinates();
                is_dragging.set(true);
                did_drag.set(false);
                drag_start_x.set(client.x);
                drag_start_y.set(client.y);
                drag_start_pan_x.set(*pan_x.read());
                drag_start_pan_y.set(*pan_y.read());
            },

            onmousemove: move |evt: Event<MouseData>| {
                let client = evt.client_coordinates();
                if !*is_dragging.read() {
                    let at = coords::click_to_map_px_zoomed(
                        client.x, client.y, MAP_CONTAINER_ID,
                        *zoom.read(), *pan_x.read(), *pan_y.read(),
                    );
                    cursor.set(at.map(|(x, y)| coords::map_px_to_position(x, y)));
                    return;
                }
                let dx = client.x - *drag_start_x.read();
                let dy = client.y - *drag_start_y.read();

                if !*did_drag.read() && (dx.abs() > DRAG_THRESHOLD || dy.abs() > DRAG_THRESHOLD) {
                    did_drag.set(true);
                }
                if *did_drag.read() {
                    let new_px = *drag_start_pan_x.read() + dx;
                    let new_py = *drag_start_pan_y.read() + dy;
                    let (px, py) = clamp_pan_to_container(new_px, new_py, *zoom.read());
                    pan_x.set(px);
                    pan_y.set(py);
                }
            },

            onmouseup: move |evt: Event<MouseData>| {
                let was_dragging = *is_dragging.read();
                let was_drag = *did_drag.read();
                is_dragging.set(false);

                // A mouseup without drag movement = a click
                if was_dragging && !was_drag {
                    let client = evt.client_coordinates();
                    if let Some((img_x, img_y)) = coords::click_to_map_px_zoomed(
                        client.x, client.y, MAP_CONTAINER_ID,
                        *zoom.read(), *pan_x.read(), *pan_y.read(),
                    ) {
                        handle_map_click(img_x, img_y, *zoom.read(), &mut controller, &on_effect);
                    }
                }
            },

            onmouseleave: move |_| {
                is_dragging.set(false);
                cursor.set(None);
            },

            ondoubleclick: move |evt: Event<MouseData>| {
                evt.prevent_default();
                zoom.set(1.0);
                pan_x.set(0.0);
                pan_y.set(0.0);
            },

            ontouchstart: move |evt: Event<TouchData>| {
                evt.prevent_default();
                let touches = evt.data().touches();
                if let Some(t) = touches.first() {
                    touch_start_pos.set(Some((t.client_coordinates().x, t.client_coordinates().y)));
                    touch_did_pan.set(false);
                    touch_start_pan_x.set(*pan_x.read());
                    touch_start_pan_y.set(*pan_y.read());
                }
            },

            ontouchmove: move |evt: Event<TouchData>| {
                evt.prevent_default();
                let touches = evt.data().touches();
                let Some(t) = touches.first() else { return };
                let cur = (t.client_coordinates().x, t.client_coordinates().y);
                if let Some(start) = *touch_start_pos.read() {
                    if !*touch_did_pan.read() && point_distance(start, cur) > TOUCH_DRAG_THRESHOLD {
                        touch_did_pan.set(true);
                    }
                    if *touch_did_pan.read() {
                        let new_px = *touch_start_pan_x.read() + (cur.0 - start.0);
                        let new_py = *touch_start_pan_y.read() + (cur.1 - start.1);
                        let (px, py) = clamp_pan_to_container(new_px, new_py, *zoom.read());
                        pan_x.set(px);
                        pan_y.set(py);
                    }
                }
            },

            ontouchend: move |evt: Event<TouchData>| {
                evt.prevent_default();
                if !evt.data().touches().is_empty() {
                    return;
                }
                // Single-finger tap: no pan occurred
                let start = *touch_start_pos.read();
                if let (Some(start), false) = (start, *touch_did_pan.read()) {
                    if let Some((img_x, img_y)) = coords::click_to_map_px_zoomed(
                        start.0, start.1, MAP_CONTAINER_ID,
                        *zoom.read(), *pan_x.read(), *pan_y.read(),
                    ) {
                        handle_map_click(img_x, img_y, *zoom.read(), &mut controller, &on_effect);
                    }
                }
                touch_start_pos.set(None);
            },

            ontouchcancel: move |_evt: Event<TouchData>| {
                touch_start_pos.set(None);
                touch_did_pan.set(false);
            },

            // CSS transform applies zoom/pan to the whole surface
            div {
                class: "map-inner",
                style: "{transform_style}",

                div {
                    dangerous_inner_html: "{svg_html}",
                    style: "position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;",
                }
            }

            if let Some(category) = add_mode {
                div { class: "add-mode-indicator",
                    "[ CLICK MAP TO PLACE {category} ]"
                }
            }

            if let Some(readout) = cursor_readout {
                div { class: "coord-readout",
                    span { class: "coord-tag", "{readout}" }
                }
            }
        }
    }
}
