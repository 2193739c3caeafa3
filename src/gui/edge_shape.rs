use egui::{Pos2, Shape, Stroke};
use egui_graphs::{DisplayEdge, DisplayNode, DrawContext, EdgeProps};
use petgraph::{EdgeType, stable_graph::IndexType};

use crate::gui::app;
use crate::gui::edge_anim::{self, CREATE_FADE};
use crate::gui::node_shape::DeviceNodeShape;
use crate::network::device::DeviceNode;
use crate::network::edge::Link;

/// Edge shape for router links: a faint line that fades in when the edge is
/// first reconciled into the graph.
#[derive(Clone, Debug, Default)]
pub struct LinkShape {
    edge_id: Option<String>,
}

impl From<EdgeProps<Link>> for LinkShape {
    fn from(props: EdgeProps<Link>) -> Self {
        Self {
            edge_id: Some(props.payload.id.clone()),
        }
    }
}

impl<Ty: EdgeType, Ix: IndexType> DisplayEdge<DeviceNode, Link, Ty, Ix, DeviceNodeShape>
    for LinkShape
{
    fn shapes(
        &mut self,
        start: &egui_graphs::Node<DeviceNode, Link, Ty, Ix, DeviceNodeShape>,
        end: &egui_graphs::Node<DeviceNode, Link, Ty, Ix, DeviceNodeShape>,
        ctx: &DrawContext,
    ) -> Vec<Shape> {
        // Endpoints on the node boundaries, in screen space.
        let a = start.props().location();
        let b = end.props().location();
        let a_boundary = <DeviceNodeShape as DisplayNode<DeviceNode, Link, Ty, Ix>>::closest_boundary_point(
            start.display(),
            b - a,
        );
        let b_boundary = <DeviceNodeShape as DisplayNode<DeviceNode, Link, Ty, Ix>>::closest_boundary_point(
            end.display(),
            a - b,
        );
        let a_screen = ctx.meta.canvas_to_screen_pos(a_boundary);
        let b_screen = ctx.meta.canvas_to_screen_pos(b_boundary);

        let mut base = ctx.ctx.style().visuals.widgets.inactive.fg_stroke.color;
        // Links stay faint so the nodes carry the scene.
        let mut alpha_factor = 0.35f32;
        let mut width = 1.0f32;

        if let Some(anim) = self.edge_id.as_deref().and_then(edge_anim::get_anim) {
            let p = anim.eased_progress(CREATE_FADE, ease_in_out_cubic);
            alpha_factor *= p;
            width = 0.5 + 0.5 * p;
            // Blend toward the accent for a theme-aware appearing cue.
            let accent = app::get_theme().teal;
            base = egui::Color32::from_rgb(
                ((base.r() as u16 * 2 + accent.r() as u16) / 3) as u8,
                ((base.g() as u16 * 2 + accent.g() as u16) / 3) as u8,
                ((base.b() as u16 * 2 + accent.b() as u16) / 3) as u8,
            );
        }

        let color = egui::Color32::from_rgba_unmultiplied(
            base.r(),
            base.g(),
            base.b(),
            (alpha_factor * 255.0) as u8,
        );
        vec![Shape::line_segment([a_screen, b_screen], Stroke { width, color })]
    }

    fn update(&mut self, props: &EdgeProps<Link>) {
        self.edge_id = Some(props.payload.id.clone());
    }

    fn is_inside(
        &self,
        start: &egui_graphs::Node<DeviceNode, Link, Ty, Ix, DeviceNodeShape>,
        end: &egui_graphs::Node<DeviceNode, Link, Ty, Ix, DeviceNodeShape>,
        pos: Pos2,
    ) -> bool {
        let a = start.props().location();
        let b = end.props().location();
        let a_boundary = <DeviceNodeShape as DisplayNode<DeviceNode, Link, Ty, Ix>>::closest_boundary_point(
            start.display(),
            b - a,
        );
        let b_boundary = <DeviceNodeShape as DisplayNode<DeviceNode, Link, Ty, Ix>>::closest_boundary_point(
            end.display(),
            a - b,
        );
        distance_point_to_segment(pos, a_boundary, b_boundary) <= 6.0
    }
}

fn distance_point_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ap = p - a;
    let ab = b - a;
    let ab_len2 = ab.length_sq();
    if ab_len2 <= f32::EPSILON {
        return ap.length();
    }
    let t = (ap.dot(ab) / ab_len2).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t.powi(3)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}
