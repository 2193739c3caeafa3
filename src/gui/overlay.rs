/*!
Decorative animation painted over the reconciled graph.

Three independent, idempotent effects — a radar sweep from the router, node
pulse rings, and traveling packet markers — drawn from the node screen
positions the node shape exports while the graph widget draws. Nothing here
mutates graph data, and nothing here runs unless monitoring is active.

Effective updates are capped at `TARGET_FPS` by `FrameLimiter`: the animation
clock only advances on a governed tick, so sub-interval repaints redraw the
same frame instead of speeding the effects up.
*/

use std::cell::RefCell;
use std::time::{Duration, Instant};

use egui::{Color32, Painter, Pos2, Shape, Stroke};

use crate::network::edge::edge_id;

pub const TARGET_FPS: u32 = 30;
pub const FRAME_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / TARGET_FPS as u64);

pub const SWEEP_PERIOD: Duration = Duration::from_millis(6000);
pub const SWEEP_RADIUS: f32 = 400.0;
pub const SWEEP_HALF_ANGLE: f32 = std::f32::consts::FRAC_PI_6;

pub const PULSE_PERIOD: Duration = Duration::from_millis(3000);
/// Only every n-th node pulses, bounding per-frame cost on big networks.
pub const PULSE_STRIDE: usize = 3;

pub const PACKET_PERIOD: Duration = Duration::from_millis(2200);

/// Screen-space position of one rendered node, exported by the node shape
/// during the widget pass and consumed here after it.
#[derive(Clone, Debug)]
pub struct NodeMark {
    pub id: String,
    pub center: Pos2,
    pub radius: f32,
    pub is_router: bool,
}

thread_local! {
    static NODE_MARKS: RefCell<Vec<NodeMark>> = RefCell::new(Vec::new());
}

/// Clear the mark collector before the graph widget draws.
pub fn clear_node_marks() {
    NODE_MARKS.with(|v| v.borrow_mut().clear());
}

pub fn publish_node_mark(mark: NodeMark) {
    NODE_MARKS.with(|v| v.borrow_mut().push(mark));
}

/// Take the marks collected during the widget pass.
pub fn take_node_marks() -> Vec<NodeMark> {
    NODE_MARKS.with(|v| v.borrow_mut().drain(..).collect())
}

/// Caps effective animation updates to a fixed target rate no matter how
/// often the host requests a repaint.
#[derive(Debug)]
pub struct FrameLimiter {
    interval: Duration,
    last: Option<Instant>,
}

impl FrameLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True when enough time has passed for a new animation frame. Keeps the
    /// phase remainder so the cadence does not drift.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.last {
            None => {
                self.last = Some(now);
                true
            }
            Some(last) => {
                let delta = now.saturating_duration_since(last);
                if delta < self.interval {
                    return false;
                }
                let remainder =
                    Duration::from_nanos((delta.as_nanos() % self.interval.as_nanos()) as u64);
                self.last = Some(now - remainder);
                true
            }
        }
    }
}

/// Deterministic per-identity phase so effects desynchronize across nodes
/// without stored state: first byte of the id, scaled.
pub fn phase_of(id: &str) -> Duration {
    Duration::from_millis(u64::from(id.as_bytes().first().copied().unwrap_or(0)) * 500)
}

/// Fraction of the way through a repeating cycle, in `[0, 1)`.
pub fn cycle_fraction(t: Duration, phase: Duration, period: Duration) -> f32 {
    let period_ms = period.as_millis().max(1);
    (((t + phase).as_millis() % period_ms) as f32) / period_ms as f32
}

pub fn sweep_angle(t: Duration) -> f32 {
    cycle_fraction(t, Duration::ZERO, SWEEP_PERIOD) * std::f32::consts::TAU
}

pub struct AnimationOverlay {
    limiter: FrameLimiter,
    started: Instant,
    anim_time: Duration,
}

impl Default for AnimationOverlay {
    fn default() -> Self {
        Self {
            limiter: FrameLimiter::new(FRAME_INTERVAL),
            started: Instant::now(),
            anim_time: Duration::ZERO,
        }
    }
}

impl AnimationOverlay {
    /// Paint all effects for this frame. The caller only invokes this while
    /// monitoring runs; stopping leaves the static graph untouched.
    pub fn paint(&mut self, painter: &Painter, marks: &[NodeMark], accent: Color32, now: Instant) {
        if self.limiter.tick(now) {
            self.anim_time = now.saturating_duration_since(self.started);
        }
        let t = self.anim_time;

        let router = marks.iter().find(|m| m.is_router);
        if let Some(router) = router {
            paint_sweep(painter, router, accent, t);
        }
        paint_pulses(painter, marks, accent, t);
        if let Some(router) = router {
            paint_packets(painter, router, marks, accent, t);
        }
    }
}

/// The sweep is a wedge rotating around the router. Layered wedges of
/// shrinking radius and rising alpha approximate a soft radial beam.
fn paint_sweep(painter: &Painter, router: &NodeMark, accent: Color32, t: Duration) {
    let angle = sweep_angle(t);
    // The exported mark radius is in screen units, so it carries the zoom.
    let zoom = (router.radius / crate::network::style::ROUTER_SIZE).max(0.1);
    let layers: [(f32, u8); 3] = [(1.0, 10), (0.66, 18), (0.33, 26)];
    for (factor, alpha) in layers {
        let radius = SWEEP_RADIUS * factor * zoom;
        let steps = 12;
        let mut points = Vec::with_capacity(steps + 2);
        points.push(router.center);
        for i in 0..=steps {
            let a = angle - SWEEP_HALF_ANGLE
                + (i as f32 / steps as f32) * (2.0 * SWEEP_HALF_ANGLE);
            points.push(router.center + egui::vec2(a.cos(), a.sin()) * radius);
        }
        painter.add(Shape::convex_polygon(
            points,
            Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), alpha),
            Stroke::NONE,
        ));
    }
}

fn paint_pulses(painter: &Painter, marks: &[NodeMark], accent: Color32, t: Duration) {
    for mark in marks.iter().step_by(PULSE_STRIDE) {
        let p = cycle_fraction(t, phase_of(&mark.id), PULSE_PERIOD);
        let radius = 8.0 + p * 20.0;
        let opacity = (1.0 - p) * 0.2;
        let alpha = (opacity * 255.0) as u8;
        painter.circle_stroke(
            mark.center,
            radius,
            Stroke {
                width: 1.0,
                color: Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), alpha),
            },
        );
    }
}

fn paint_packets(
    painter: &Painter,
    router: &NodeMark,
    marks: &[NodeMark],
    accent: Color32,
    t: Duration,
) {
    for mark in marks.iter().filter(|m| !m.is_router) {
        let id = edge_id(&router.id, &mark.id);
        let p = cycle_fraction(t, phase_of(&id), PACKET_PERIOD);
        let pos = router.center + (mark.center - router.center) * p;
        painter.circle_filled(
            pos,
            4.0,
            Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), 40),
        );
        painter.circle_filled(
            pos,
            2.0,
            Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), 200),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_caps_updates_at_target_rate() {
        let base = Instant::now();
        let mut limiter = FrameLimiter::new(FRAME_INTERVAL);

        // A display hammering us ~100 times per simulated second must not
        // get more than TARGET_FPS animation frames out of it.
        let mut frames = 0;
        for i in 0..100 {
            if limiter.tick(base + Duration::from_millis(10 * i)) {
                frames += 1;
            }
        }
        assert!(frames <= TARGET_FPS as usize, "got {} frames", frames);
        assert!(frames >= TARGET_FPS as usize - 2, "got {} frames", frames);
    }

    #[test]
    fn limiter_passes_slow_ticks_through() {
        let base = Instant::now();
        let mut limiter = FrameLimiter::new(FRAME_INTERVAL);
        assert!(limiter.tick(base));
        // Ticks slower than the interval are all accepted.
        assert!(limiter.tick(base + Duration::from_millis(50)));
        assert!(limiter.tick(base + Duration::from_millis(100)));
    }

    #[test]
    fn limiter_rejects_sub_interval_ticks() {
        let base = Instant::now();
        let mut limiter = FrameLimiter::new(FRAME_INTERVAL);
        assert!(limiter.tick(base));
        assert!(!limiter.tick(base + Duration::from_millis(5)));
        assert!(!limiter.tick(base + Duration::from_millis(20)));
        assert!(limiter.tick(base + Duration::from_millis(40)));
    }

    #[test]
    fn phase_is_deterministic_and_desynchronized() {
        assert_eq!(phase_of("192.168.1.5"), phase_of("192.168.1.5"));
        assert_ne!(phase_of("192.168.1.5"), phase_of("gateway"));
        assert_eq!(phase_of(""), Duration::ZERO);
    }

    #[test]
    fn cycle_fraction_wraps_at_period() {
        let period = Duration::from_millis(3000);
        assert_eq!(cycle_fraction(Duration::ZERO, Duration::ZERO, period), 0.0);
        let half = cycle_fraction(Duration::from_millis(1500), Duration::ZERO, period);
        assert!((half - 0.5).abs() < 1e-6);
        let wrapped = cycle_fraction(Duration::from_millis(3000), Duration::ZERO, period);
        assert_eq!(wrapped, 0.0);
    }

    #[test]
    fn sweep_angle_completes_a_turn_per_period() {
        assert_eq!(sweep_angle(Duration::ZERO), 0.0);
        let quarter = sweep_angle(SWEEP_PERIOD / 4);
        assert!((quarter - std::f32::consts::FRAC_PI_2).abs() < 1e-3);
    }
}
