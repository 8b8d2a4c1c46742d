//! Per-tick update of the post-processing state.

use crate::effect_params::EffectParams;
use crate::input::FilterKey;
use crate::overlay::{self, OverlayText};
use crate::post_processing::PostProcessKind;
use crate::scene::Scene;

/// Window over which update times are averaged, in seconds.
pub const UPDATE_TIME_PERIOD: f32 = 0.25;

/// Average tick length over fixed windows.
#[derive(Clone, Debug, Default)]
pub struct FrameTimer {
    sum: f32,
    count: u32,
    average: Option<f32>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, dt: f32) {
        self.sum += dt;
        self.count += 1;
        if self.sum >= UPDATE_TIME_PERIOD {
            self.average = Some(self.sum / self.count as f32);
            self.sum = 0.0;
            self.count = 0;
        }
    }

    /// Average of the last completed window, if any.
    pub fn average(&self) -> Option<f32> {
        self.average
    }
}

/// Everything the update loop mutates between frames.
#[derive(Clone, Debug)]
pub struct PostProcessState {
    filter: PostProcessKind,
    pub params: EffectParams,
    timer: FrameTimer,
    /// Pointer position in pixels.
    pub pointer: glam::Vec2,
}

impl PostProcessState {
    pub fn new(filter: PostProcessKind, seed: u64) -> Self {
        Self {
            filter,
            params: EffectParams::new(seed),
            timer: FrameTimer::new(),
            pointer: glam::Vec2::ZERO,
        }
    }

    /// The current full-screen post-process.
    pub fn filter(&self) -> PostProcessKind {
        self.filter
    }

    /// Handle a filter key: select its post-process and restart it.
    pub fn press_key(&mut self, key: FilterKey) {
        self.select_filter(key.kind());
    }

    pub fn select_filter(&mut self, kind: PostProcessKind) {
        if kind != self.filter {
            log::info!("Full-screen post-process: {} -> {}", self.filter, kind);
        }
        self.filter = kind;
        self.params.activate(kind, self.pointer);
        if matches!(kind, PostProcessKind::Ripple | PostProcessKind::Shockwave) {
            log::info!("{} restarted", kind);
        }
    }

    /// One tick: scene first, then effect parameters, then timing.
    pub fn update(&mut self, dt: f32, scene: &mut dyn Scene) {
        scene.update_all(dt);
        self.params.advance(dt);
        self.timer.tick(dt);
    }

    pub fn average_frame_time(&self) -> Option<f32> {
        self.timer.average()
    }

    pub fn overlay_items(&self) -> Vec<OverlayText> {
        overlay::overlay_items(self.timer.average(), self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::DemoScene;

    #[test]
    fn test_frame_timer_windows() {
        let mut timer = FrameTimer::new();
        for _ in 0..10 {
            timer.tick(0.02);
        }
        assert_eq!(timer.average(), None);
        for _ in 0..3 {
            timer.tick(0.02);
        }
        let average = timer.average().unwrap();
        assert!((average - 0.02).abs() < 1e-6);

        // Holds until the next window completes
        timer.tick(0.1);
        assert!((timer.average().unwrap() - 0.02).abs() < 1e-6);
        timer.tick(0.2);
        assert!((timer.average().unwrap() - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_tint_over_time() {
        let mut scene = DemoScene::new();
        let mut state = PostProcessState::new(PostProcessKind::Copy, 1);
        state.press_key(FilterKey::for_kind(PostProcessKind::Tint));
        assert_eq!(state.filter(), PostProcessKind::Tint);

        state.update(2.5, &mut scene);
        assert!((state.params.tint_hue - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_ripple_key_captures_pointer() {
        let mut state = PostProcessState::new(PostProcessKind::Copy, 1);
        let mut scene = DemoScene::new();
        state.update(1.0, &mut scene);
        state.pointer = glam::Vec2::new(100.0, 50.0);
        state.press_key(FilterKey::new(9).unwrap());
        assert_eq!(state.filter(), PostProcessKind::Ripple);
        assert_eq!(state.params.ripple_time, 0.0);
        assert_eq!(state.params.ripple_position, glam::Vec2::new(100.0, 50.0));
    }

    #[test]
    fn test_overlay_shows_filter_name() {
        let mut state = PostProcessState::new(PostProcessKind::Copy, 1);
        state.select_filter(PostProcessKind::GaussianBlur);
        let items = state.overlay_items();
        assert_eq!(items.last().unwrap().text, "Fullscreen Post-Process: Gaussian Blur");
    }
}
