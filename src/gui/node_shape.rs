use std::cell::RefCell;
use std::collections::HashSet;

use egui::{Color32, FontId, Pos2, Shape, Stroke, Vec2, epaint::CircleShape};
use egui_graphs::{DisplayNode, DrawContext, NodeProps};
use petgraph::{EdgeType, stable_graph::IndexType};

use crate::gui::app;
use crate::gui::overlay::{self, NodeMark};
use crate::network::device::DeviceNode;

thread_local! {
    // Node ids the active type filter leaves dimmed for the frame.
    static DIMMED_IDS: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Replace the set of filtered-out node ids consumed during the draw pass.
pub fn set_dimmed_ids(ids: impl Iterator<Item = String>) {
    DIMMED_IDS.with(|v| {
        let mut set = v.borrow_mut();
        set.clear();
        set.extend(ids);
    });
}

fn is_dimmed(id: &str) -> bool {
    DIMMED_IDS.with(|v| v.borrow().contains(id))
}

/// Node shape for rendered devices: a dark disc with a neon border and a
/// soft glow, the label stacked above, selection ring on interaction.
#[derive(Clone)]
pub struct DeviceNodeShape {
    pub label: String,
    pub pos: Pos2,
    pub radius: f32,
    pub color: Option<Color32>,
    pub selected: bool,
    pub dragged: bool,
    pub hovered: bool,
    pub node_id: String,
    pub is_router: bool,
}

impl From<NodeProps<DeviceNode>> for DeviceNodeShape {
    fn from(node_props: NodeProps<DeviceNode>) -> Self {
        let payload = &node_props.payload;
        Self {
            pos: node_props.location(),
            color: node_props.color(),
            selected: node_props.selected,
            dragged: node_props.dragged,
            hovered: node_props.hovered,
            radius: payload.size,
            node_id: payload.id.clone(),
            is_router: payload.is_router,
            label: node_props.label,
        }
    }
}

impl<E: Clone, Ty: EdgeType, Ix: IndexType> DisplayNode<DeviceNode, E, Ty, Ix>
    for DeviceNodeShape
{
    fn closest_boundary_point(&self, dir: Vec2) -> Pos2 {
        closest_point_on_circle(self.pos, self.radius, dir)
    }

    fn is_inside(&self, pos: Pos2) -> bool {
        is_inside_circle(self.pos, self.radius, pos)
    }

    fn shapes(&mut self, ctx: &DrawContext) -> Vec<Shape> {
        let mut res = Vec::with_capacity(6);
        let center = ctx.meta.canvas_to_screen_pos(self.pos);
        let radius = ctx.meta.canvas_to_screen_size(self.radius);
        let base = self.effective_color(ctx);

        // Export the screen position for the animation overlay.
        overlay::publish_node_mark(NodeMark {
            id: self.node_id.clone(),
            center,
            radius,
            is_router: self.is_router,
        });

        let dimmed = is_dimmed(&self.node_id);
        let color = if dimmed { base.linear_multiply(0.15) } else { base };

        // Soft glow: two translucent halos under the disc. Dimmed nodes keep
        // just the outline so the filter reads at a glance.
        if !dimmed {
            res.push(
                CircleShape {
                    center,
                    radius: radius * 2.2,
                    fill: color.linear_multiply(0.06),
                    stroke: Stroke::NONE,
                }
                .into(),
            );
            res.push(
                CircleShape {
                    center,
                    radius: radius * 1.5,
                    fill: color.linear_multiply(0.12),
                    stroke: Stroke::NONE,
                }
                .into(),
            );
        }

        // Body: dark fill, neon border.
        res.push(
            CircleShape {
                center,
                radius,
                fill: app::get_theme().crust,
                stroke: Stroke { width: 2.0, color },
            }
            .into(),
        );

        // Selection/hover ring with a short fade.
        let fade = ctx.ctx.animate_bool(
            egui::Id::new(("device_ring", &self.node_id)),
            self.is_interacted(),
        );
        if fade > 0.01 {
            res.push(
                CircleShape {
                    center,
                    radius: radius * (1.3 + 0.1 * fade),
                    fill: Color32::TRANSPARENT,
                    stroke: Stroke {
                        width: 2.0 * fade,
                        color: Color32::WHITE.linear_multiply(fade),
                    },
                }
                .into(),
            );
        }

        // Stacked label above the node.
        let galley = ctx.ctx.fonts_mut(|fonts| {
            fonts.layout_no_wrap(self.label.clone(), FontId::monospace(11.0), color)
        });
        let anchor = Pos2::new(
            center.x - galley.size().x * 0.5,
            center.y - radius - galley.size().y - 6.0,
        );
        res.push(Shape::galley(anchor, galley, color));

        res
    }

    fn update(&mut self, state: &NodeProps<DeviceNode>) {
        self.pos = state.location();
        self.selected = state.selected;
        self.dragged = state.dragged;
        self.hovered = state.hovered;
        self.label = state.label.to_string();
        self.color = state.color();
    }
}

impl DeviceNodeShape {
    fn is_interacted(&self) -> bool {
        self.selected || self.dragged || self.hovered
    }

    fn effective_color(&self, ctx: &DrawContext) -> Color32 {
        if let Some(c) = self.color {
            return c;
        }
        let style = if self.is_interacted() {
            ctx.ctx.style().visuals.widgets.active
        } else {
            ctx.ctx.style().visuals.widgets.inactive
        };
        style.fg_stroke.color
    }
}

fn closest_point_on_circle(center: Pos2, radius: f32, dir: Vec2) -> Pos2 {
    center + dir.normalized() * (radius + 1.0)
}

fn is_inside_circle(center: Pos2, radius: f32, pos: Pos2) -> bool {
    let dir = pos - center;
    dir.length() <= radius
}
