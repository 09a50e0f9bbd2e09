use std::collections::VecDeque;

use geo::{Coord, Rect};

use super::projection::{self, MAX_ZOOM, MIN_ZOOM};

/// Rough extent of Sri Lanka in Web Mercator meters.
pub const SRI_LANKA_EXTENT: [f64; 4] = [8_850_000.0, 700_000.0, 9_150_000.0, 1_200_000.0];
pub const INITIAL_CENTER: Coord<f64> = Coord { x: 9_900_000.0, y: 990_000.0 };
pub const INITIAL_ZOOM: f64 = 7.0;

pub fn extent_from_array([min_x, min_y, max_x, max_y]: [f64; 4]) -> Rect<f64> {
    Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTarget {
    pub center: Coord<f64>,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationTarget {
    To(ViewTarget),
    /// Resolved against the viewport size when the step starts.
    Fit {
        extent: Rect<f64>,
        padding: f64,
        max_zoom: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationStep {
    pub target: AnimationTarget,
    /// Seconds.
    pub duration: f64,
}

#[derive(Debug, Clone, Copy)]
struct RunningAnimation {
    from: ViewTarget,
    to: ViewTarget,
    start: f64,
    duration: f64,
}

fn ease_in_out(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Center and zoom of the map, plus any queued animation.
#[derive(Debug, Clone)]
pub struct View {
    center: Coord<f64>,
    zoom: f64,
    viewport: [f64; 2],
    steps: VecDeque<AnimationStep>,
    running: Option<RunningAnimation>,
}

impl Default for View {
    fn default() -> Self {
        Self::new(INITIAL_CENTER, INITIAL_ZOOM)
    }
}

impl View {
    pub fn new(center: Coord<f64>, zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            viewport: [1024.0, 768.0],
            steps: VecDeque::new(),
            running: None,
        }
    }

    pub fn center(&self) -> Coord<f64> {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn resolution(&self) -> f64 {
        projection::resolution(self.zoom)
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport = [width.max(1.0), height.max(1.0)];
    }

    /// Mercator extent currently on screen.
    pub fn extent(&self) -> Rect<f64> {
        let res = self.resolution();
        let half = Coord {
            x: self.viewport[0] * res / 2.0,
            y: self.viewport[1] * res / 2.0,
        };
        Rect::new(self.center - half, self.center + half)
    }

    /// Map coordinate under a pixel offset from the viewport center (y grows downwards).
    pub fn offset_to_map(&self, dx: f64, dy: f64) -> Coord<f64> {
        let res = self.resolution();
        Coord {
            x: self.center.x + dx * res,
            y: self.center.y - dy * res,
        }
    }

    /// Pixel offset from the viewport center of a map coordinate.
    #[cfg(test)]
    pub fn map_to_offset(&self, coord: Coord<f64>) -> (f64, f64) {
        let res = self.resolution();
        ((coord.x - self.center.x) / res, (self.center.y - coord.y) / res)
    }

    pub fn pan_pixels(&mut self, dx: f64, dy: f64) {
        self.cancel_animation();
        self.center = self.offset_to_map(-dx, -dy);
    }

    /// Change zoom keeping the map coordinate under the anchor offset in place.
    pub fn zoom_around(&mut self, zoom: f64, anchor: (f64, f64)) {
        self.cancel_animation();
        let fixed = self.offset_to_map(anchor.0, anchor.1);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let res = self.resolution();
        self.center = Coord {
            x: fixed.x - anchor.0 * res,
            y: fixed.y + anchor.1 * res,
        };
    }

    /// Center and zoom that show `extent` with `padding` pixels on every side.
    pub fn fit_target(&self, extent: Rect<f64>, padding: f64, max_zoom: f64) -> ViewTarget {
        let width = (self.viewport[0] - 2.0 * padding).max(1.0);
        let height = (self.viewport[1] - 2.0 * padding).max(1.0);
        let res = (extent.width() / width).max(extent.height() / height);
        let zoom = if res > 0.0 {
            projection::zoom_for_resolution(res).min(max_zoom)
        } else {
            max_zoom
        };
        ViewTarget {
            center: extent.center(),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    pub fn is_animating(&self) -> bool {
        self.running.is_some() || !self.steps.is_empty()
    }

    pub fn cancel_animation(&mut self) {
        self.steps.clear();
        self.running = None;
    }

    /// Replace any running animation with a new sequence of steps.
    pub fn animate(&mut self, steps: impl IntoIterator<Item = AnimationStep>, now: f64) {
        self.cancel_animation();
        self.steps.extend(steps);
        self.tick(now);
    }

    pub fn fit(&mut self, extent: Rect<f64>, padding: f64, duration: f64, now: f64) {
        self.animate(
            [AnimationStep {
                target: AnimationTarget::Fit { extent, padding, max_zoom: MAX_ZOOM },
                duration,
            }],
            now,
        );
    }

    /// Glide to the extent center, then settle on a padded fit of the extent.
    pub fn fly_to_extent(&mut self, extent: Rect<f64>, now: f64) {
        let approach = ViewTarget {
            center: extent.center(),
            zoom: self.zoom.min(13.0),
        };
        self.animate(
            [
                AnimationStep { target: AnimationTarget::To(approach), duration: 0.8 },
                AnimationStep {
                    target: AnimationTarget::Fit { extent, padding: 60.0, max_zoom: 15.0 },
                    duration: 0.4,
                },
            ],
            now,
        );
    }

    /// Advance the animation to time `now` (seconds).
    pub fn tick(&mut self, now: f64) {
        loop {
            if self.running.is_none() {
                let Some(step) = self.steps.pop_front() else {
                    return;
                };
                let to = match step.target {
                    AnimationTarget::To(target) => target,
                    AnimationTarget::Fit { extent, padding, max_zoom } => {
                        self.fit_target(extent, padding, max_zoom)
                    }
                };
                self.running = Some(RunningAnimation {
                    from: ViewTarget { center: self.center, zoom: self.zoom },
                    to,
                    start: now,
                    duration: step.duration,
                });
            }

            let Some(run) = self.running else {
                return;
            };
            let t = if run.duration <= 0.0 {
                1.0
            } else {
                ((now - run.start) / run.duration).clamp(0.0, 1.0)
            };
            let e = ease_in_out(t);
            self.center = run.from.center + (run.to.center - run.from.center) * e;
            self.zoom = run.from.zoom + (run.to.zoom - run.from.zoom) * e;

            if t < 1.0 {
                return;
            }
            self.running = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn view() -> View {
        let mut view = View::default();
        view.set_viewport_size(800.0, 600.0);
        view
    }

    #[test]
    fn offsets_round_trip() {
        let view = view();
        let coord = view.offset_to_map(120.0, -45.0);
        let (dx, dy) = view.map_to_offset(coord);
        assert_relative_eq!(dx, 120.0, epsilon = 1e-9);
        assert_relative_eq!(dy, -45.0, epsilon = 1e-9);
        assert!(coord.y > view.center().y);
    }

    #[test]
    fn fit_target_contains_extent_with_padding() {
        let view = view();
        let extent = extent_from_array(SRI_LANKA_EXTENT);
        let target = view.fit_target(extent, 40.0, MAX_ZOOM);
        assert_eq!(target.center, extent.center());

        let res = projection::resolution(target.zoom);
        // height is the limiting dimension: 500 km over 520 px
        assert_relative_eq!(res, 500_000.0 / 520.0, max_relative = 1e-9);
    }

    #[test]
    fn fit_target_respects_max_zoom() {
        let view = view();
        let tiny = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        assert_eq!(view.fit_target(tiny, 60.0, 15.0).zoom, 15.0);
        let point = Rect::new(Coord { x: 5.0, y: 5.0 }, Coord { x: 5.0, y: 5.0 });
        assert_eq!(view.fit_target(point, 60.0, 15.0).zoom, 15.0);
    }

    #[test]
    fn fly_to_extent_runs_both_stages() {
        let mut view = view();
        view.zoom_around(16.0, (0.0, 0.0));
        let extent = Rect::new(
            Coord { x: 8_880_000.0, y: 770_000.0 },
            Coord { x: 8_882_000.0, y: 772_000.0 },
        );

        view.fly_to_extent(extent, 10.0);
        assert!(view.is_animating());

        view.tick(10.8);
        assert_relative_eq!(view.center().x, extent.center().x, epsilon = 1e-6);
        assert_relative_eq!(view.zoom(), 13.0, epsilon = 1e-9);
        assert!(view.is_animating());

        view.tick(11.3);
        let expected = view.fit_target(extent, 60.0, 15.0);
        assert!(!view.is_animating());
        assert_relative_eq!(view.zoom(), expected.zoom, epsilon = 1e-9);
        assert_relative_eq!(view.center().y, expected.center.y, epsilon = 1e-6);
    }

    #[test]
    fn zero_duration_animation_jumps() {
        let mut view = view();
        let extent = extent_from_array(SRI_LANKA_EXTENT);
        view.fit(extent, 40.0, 0.0, 0.0);
        assert!(!view.is_animating());
        assert_relative_eq!(view.center().x, extent.center().x, epsilon = 1e-6);
        assert_relative_eq!(view.center().y, extent.center().y, epsilon = 1e-6);
    }

    #[test]
    fn user_input_cancels_animation() {
        let mut view = view();
        view.fit(extent_from_array(SRI_LANKA_EXTENT), 40.0, 1.2, 0.0);
        assert!(view.is_animating());
        view.pan_pixels(10.0, 0.0);
        assert!(!view.is_animating());
    }

    #[test]
    fn zoom_around_keeps_anchor_fixed() {
        let mut view = view();
        let anchor = (200.0, -100.0);
        let before = view.offset_to_map(anchor.0, anchor.1);
        view.zoom_around(9.5, anchor);
        let after = view.offset_to_map(anchor.0, anchor.1);
        assert_relative_eq!(before.x, after.x, epsilon = 1e-6);
        assert_relative_eq!(before.y, after.y, epsilon = 1e-6);
        assert_relative_eq!(view.zoom(), 9.5);
    }
}
