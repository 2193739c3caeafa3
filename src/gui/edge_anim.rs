use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a newly created edge takes to fade in.
pub const CREATE_FADE: Duration = Duration::from_millis(300);

thread_local! {
    static EDGE_ANIMS: RefCell<HashMap<String, EdgeAnimation>> = RefCell::new(HashMap::new())
}

/// Register a fade-in for a freshly reconciled edge.
pub fn publish_create(edge_id: &str) {
    EDGE_ANIMS.with(|m| {
        m.borrow_mut()
            .insert(edge_id.to_string(), EdgeAnimation::new());
    });
}

pub fn get_anim(edge_id: &str) -> Option<EdgeAnimation> {
    EDGE_ANIMS.with(|m| m.borrow().get(edge_id).cloned())
}

/// Drop animations that have run their course so the registry stays small.
pub fn cleanup_finished() {
    EDGE_ANIMS.with(|m| {
        m.borrow_mut()
            .retain(|_, anim| anim.start_time.elapsed() < CREATE_FADE);
    });
}

#[derive(Clone, Debug)]
pub struct EdgeAnimation {
    pub start_time: Instant,
}

impl EdgeAnimation {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn linear_progress(&self, total: Duration) -> f32 {
        (self.start_time.elapsed().as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn eased_progress<F>(&self, total: Duration, easing: F) -> f32
    where
        F: Fn(f32) -> f32,
    {
        easing(self.linear_progress(total))
    }
}

impl Default for EdgeAnimation {
    fn default() -> Self {
        Self::new()
    }
}
