//! Touch gesture classification and routing.
//!
//! Raw touch sequences are classified by measured displacement, velocity and
//! timing into taps, double taps, long presses, swipes, pinches and pans.
//! Timed outcomes (the delayed single tap and the long press) are emitted
//! from [`GestureRouter::tick`]. [`route`] turns gestures into reader
//! operations for the current reading direction and mode.

use crate::config::{
    DOUBLE_TAP_MAX_DISTANCE, DOUBLE_TAP_WINDOW, DOUBLE_TAP_ZOOM, LONG_PRESS_DURATION,
    LONG_PRESS_TOLERANCE, PAN_THRESHOLD, SWIPE_MIN_DISTANCE, SWIPE_MIN_VELOCITY, TAP_MAX_MOVEMENT,
};
use crate::settings::ReadingDirection;
use crate::state::{Operation, ReaderState};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: u64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// A touch event carrying the touches still active after it.
#[derive(Debug, Clone)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub touches: Vec<TouchPoint>,
    pub time: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct GestureConfig {
    pub swipe_min_distance: f64,
    /// px per millisecond.
    pub swipe_min_velocity: f64,
    pub tap_max_movement: f64,
    pub double_tap_window: Duration,
    pub double_tap_max_distance: f64,
    pub long_press_duration: Duration,
    pub long_press_tolerance: f64,
    pub pan_threshold: f64,
    pub pan_enabled: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_min_distance: SWIPE_MIN_DISTANCE,
            swipe_min_velocity: SWIPE_MIN_VELOCITY,
            tap_max_movement: TAP_MAX_MOVEMENT,
            double_tap_window: DOUBLE_TAP_WINDOW,
            double_tap_max_distance: DOUBLE_TAP_MAX_DISTANCE,
            long_press_duration: LONG_PRESS_DURATION,
            long_press_tolerance: LONG_PRESS_TOLERANCE,
            pan_threshold: PAN_THRESHOLD,
            pan_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Tap { x: f64, y: f64 },
    DoubleTap { x: f64, y: f64 },
    LongPress { x: f64, y: f64 },
    Swipe {
        direction: SwipeDirection,
        distance: f64,
        velocity: f64,
    },
    /// `zoom` is the zoom at pinch start multiplied by `scale`.
    Pinch {
        scale: f64,
        zoom: f32,
        center_x: f64,
        center_y: f64,
    },
    PinchEnd { scale: f64 },
    Pan { dx: f64, dy: f64 },
}

#[derive(Debug, Clone, Copy)]
struct SingleTouch {
    id: u64,
    start: (f64, f64),
    start_time: Instant,
    last: (f64, f64),
    max_movement: f64,
    panning: bool,
    long_press_fired: bool,
}

#[derive(Debug, Clone, Copy)]
struct PinchState {
    start_distance: f64,
    base_zoom: f32,
    last_scale: f64,
}

#[derive(Debug, Clone, Copy)]
struct PendingTap {
    x: f64,
    y: f64,
    deadline: Instant,
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

#[derive(Debug)]
pub struct GestureRouter {
    config: GestureConfig,
    zoom: f32,
    single: Option<SingleTouch>,
    pinch: Option<PinchState>,
    /// Set once a sequence went multi-touch; cleared when every finger lifts.
    multi_touch: bool,
    pending_tap: Option<PendingTap>,
}

impl Default for GestureRouter {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureRouter {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            zoom: 1.0,
            single: None,
            pinch: None,
            multi_touch: false,
            pending_tap: None,
        }
    }

    /// Keeps the router aware of the current zoom (enables panning, anchors pinches).
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
    }

    fn is_zoomed(&self) -> bool {
        self.zoom > 1.0
    }

    pub fn handle(&mut self, event: &TouchEvent) -> Vec<Gesture> {
        let mut gestures = Vec::new();

        if event.phase == TouchPhase::Cancel {
            if let Some(pinch) = self.pinch.take() {
                gestures.push(Gesture::PinchEnd {
                    scale: pinch.last_scale,
                });
            }
            self.single = None;
            self.multi_touch = false;
            self.pending_tap = None;
            return gestures;
        }

        if event.touches.len() >= 2 && event.phase != TouchPhase::End {
            self.handle_pinch(event, &mut gestures);
            return gestures;
        }

        if let Some(pinch) = self.pinch.take() {
            gestures.push(Gesture::PinchEnd {
                scale: pinch.last_scale,
            });
        }

        match event.phase {
            TouchPhase::Start => {
                if let (false, [touch]) = (self.multi_touch, event.touches.as_slice()) {
                    self.single = Some(SingleTouch {
                        id: touch.id,
                        start: (touch.x, touch.y),
                        start_time: event.time,
                        last: (touch.x, touch.y),
                        max_movement: 0.0,
                        panning: false,
                        long_press_fired: false,
                    });
                }
            }
            TouchPhase::Move => self.handle_move(event, &mut gestures),
            TouchPhase::End => {
                if event.touches.is_empty() {
                    if let Some(touch) = self.single.take() {
                        if !self.multi_touch {
                            self.classify_release(touch, event.time, &mut gestures);
                        }
                    }
                    self.multi_touch = false;
                }
            }
            TouchPhase::Cancel => {}
        }

        gestures
    }

    fn handle_pinch(&mut self, event: &TouchEvent, gestures: &mut Vec<Gesture>) {
        self.single = None;
        self.multi_touch = true;

        let a = (event.touches[0].x, event.touches[0].y);
        let b = (event.touches[1].x, event.touches[1].y);
        let current = distance(a, b);
        let center = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);

        let zoom = self.zoom;
        let pinch = self.pinch.get_or_insert(PinchState {
            start_distance: current,
            base_zoom: zoom,
            last_scale: 1.0,
        });
        if pinch.start_distance <= f64::EPSILON {
            return;
        }
        let scale = current / pinch.start_distance;
        if (scale - pinch.last_scale).abs() <= f64::EPSILON {
            return;
        }
        pinch.last_scale = scale;
        gestures.push(Gesture::Pinch {
            scale,
            zoom: pinch.base_zoom * scale as f32,
            center_x: center.0,
            center_y: center.1,
        });
    }

    fn handle_move(&mut self, event: &TouchEvent, gestures: &mut Vec<Gesture>) {
        let pan_allowed = self.config.pan_enabled && self.is_zoomed();
        let pan_threshold = self.config.pan_threshold;
        let Some(single) = self.single.as_mut() else {
            return;
        };
        let Some(touch) = event.touches.iter().find(|t| t.id == single.id) else {
            return;
        };

        let previous = single.last;
        single.last = (touch.x, touch.y);
        single.max_movement = single.max_movement.max(distance(single.start, single.last));

        if pan_allowed && (single.panning || single.max_movement > pan_threshold) {
            single.panning = true;
            gestures.push(Gesture::Pan {
                dx: single.last.0 - previous.0,
                dy: single.last.1 - previous.1,
            });
        }
    }

    fn classify_release(&mut self, touch: SingleTouch, time: Instant, gestures: &mut Vec<Gesture>) {
        if touch.panning {
            return;
        }
        if touch.long_press_fired {
            return;
        }

        let elapsed = time.saturating_duration_since(touch.start_time);
        if elapsed >= self.config.long_press_duration
            && touch.max_movement <= self.config.long_press_tolerance
        {
            gestures.push(Gesture::LongPress {
                x: touch.last.0,
                y: touch.last.1,
            });
            return;
        }

        let dx = touch.last.0 - touch.start.0;
        let dy = touch.last.1 - touch.start.1;
        let travelled = dx.hypot(dy);
        let velocity = travelled / (elapsed.as_secs_f64() * 1000.0).max(1.0);

        if travelled >= self.config.swipe_min_distance && velocity > self.config.swipe_min_velocity
        {
            let direction = if dx.abs() >= dy.abs() {
                if dx < 0.0 {
                    SwipeDirection::Left
                } else {
                    SwipeDirection::Right
                }
            } else if dy < 0.0 {
                SwipeDirection::Up
            } else {
                SwipeDirection::Down
            };
            gestures.push(Gesture::Swipe {
                direction,
                distance: travelled,
                velocity,
            });
            return;
        }

        if touch.max_movement < self.config.tap_max_movement {
            let (x, y) = touch.last;
            if let Some(pending) = self.pending_tap.take() {
                let gap = distance((pending.x, pending.y), (x, y));
                if time <= pending.deadline && gap <= self.config.double_tap_max_distance {
                    gestures.push(Gesture::DoubleTap { x, y });
                    return;
                }
                gestures.push(Gesture::Tap {
                    x: pending.x,
                    y: pending.y,
                });
            }
            self.pending_tap = Some(PendingTap {
                x,
                y,
                deadline: time + self.config.double_tap_window,
            });
        }
    }

    /// Fires timers: long press on a still finger, and the single tap whose
    /// double-tap window has elapsed.
    pub fn tick(&mut self, now: Instant) -> Vec<Gesture> {
        let mut gestures = Vec::new();

        if let Some(single) = self.single.as_mut() {
            let held = now.saturating_duration_since(single.start_time);
            if !single.long_press_fired
                && !single.panning
                && single.max_movement <= self.config.long_press_tolerance
                && held >= self.config.long_press_duration
            {
                single.long_press_fired = true;
                gestures.push(Gesture::LongPress {
                    x: single.last.0,
                    y: single.last.1,
                });
            }
        }

        if let Some(pending) = self.pending_tap {
            if now > pending.deadline {
                self.pending_tap = None;
                gestures.push(Gesture::Tap {
                    x: pending.x,
                    y: pending.y,
                });
            }
        }

        gestures
    }

    /// Drops any pending tap and in-progress touch.
    pub fn reset(&mut self) {
        self.single = None;
        self.pinch = None;
        self.multi_touch = false;
        self.pending_tap = None;
    }
}

/// What the host should do with a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureAction {
    Apply(Operation),
    ToggleControls,
    ContextMenu { x: f64, y: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Left,
    Center,
    Right,
}

/// Maps a gesture to a reader action for the current state.
pub fn route(gesture: &Gesture, state: &ReaderState, viewport_width: f64) -> Option<GestureAction> {
    let scrolling = state.mode().is_scrolling();
    let direction = state.direction();

    match *gesture {
        Gesture::Swipe { direction: swipe, .. } => {
            if scrolling || state.is_zoomed() {
                return None;
            }
            let op = match (direction, swipe) {
                (ReadingDirection::Ltr, SwipeDirection::Left) => Operation::NextPage,
                (ReadingDirection::Ltr, SwipeDirection::Right) => Operation::PrevPage,
                (ReadingDirection::Rtl, SwipeDirection::Left) => Operation::PrevPage,
                (ReadingDirection::Rtl, SwipeDirection::Right) => Operation::NextPage,
                (ReadingDirection::Vertical, SwipeDirection::Up) => Operation::NextPage,
                (ReadingDirection::Vertical, SwipeDirection::Down) => Operation::PrevPage,
                _ => return None,
            };
            Some(GestureAction::Apply(op))
        }
        Gesture::Tap { x, .. } => {
            if scrolling || viewport_width <= 0.0 {
                return Some(GestureAction::ToggleControls);
            }
            let zone = if x < viewport_width / 3.0 {
                Zone::Left
            } else if x > viewport_width * 2.0 / 3.0 {
                Zone::Right
            } else {
                Zone::Center
            };
            let op = match (zone, direction) {
                (Zone::Center, _) => return Some(GestureAction::ToggleControls),
                (Zone::Left, ReadingDirection::Rtl) => Operation::NextPage,
                (Zone::Left, _) => Operation::PrevPage,
                (Zone::Right, ReadingDirection::Rtl) => Operation::PrevPage,
                (Zone::Right, _) => Operation::NextPage,
            };
            Some(GestureAction::Apply(op))
        }
        Gesture::DoubleTap { .. } => {
            let op = if state.is_zoomed() {
                Operation::ResetZoom
            } else {
                Operation::SetZoom(DOUBLE_TAP_ZOOM)
            };
            Some(GestureAction::Apply(op))
        }
        Gesture::LongPress { x, y } => Some(GestureAction::ContextMenu { x, y }),
        Gesture::Pinch { zoom, .. } => Some(GestureAction::Apply(Operation::SetZoom(zoom))),
        Gesture::PinchEnd { .. } => None,
        Gesture::Pan { dx, dy } => Some(GestureAction::Apply(Operation::PanBy {
            dx: dx as f32,
            dy: dy as f32,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReaderSettings;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn event(phase: TouchPhase, touches: &[(u64, f64, f64)], time: Instant) -> TouchEvent {
        TouchEvent {
            phase,
            touches: touches
                .iter()
                .map(|&(id, x, y)| TouchPoint { id, x, y })
                .collect(),
            time,
        }
    }

    fn tap(router: &mut GestureRouter, x: f64, y: f64, at: Instant) -> Vec<Gesture> {
        let mut out = router.handle(&event(TouchPhase::Start, &[(1, x, y)], at));
        out.extend(router.handle(&event(TouchPhase::End, &[], at + ms(80))));
        out
    }

    #[test]
    fn fast_horizontal_drag_is_a_swipe() {
        let t0 = Instant::now();
        let mut router = GestureRouter::default();
        router.handle(&event(TouchPhase::Start, &[(1, 300.0, 200.0)], t0));
        router.handle(&event(TouchPhase::Move, &[(1, 200.0, 210.0)], t0 + ms(100)));
        let out = router.handle(&event(TouchPhase::End, &[], t0 + ms(150)));
        assert!(matches!(
            out.as_slice(),
            [Gesture::Swipe {
                direction: SwipeDirection::Left,
                ..
            }]
        ));
    }

    #[test]
    fn swipe_needs_the_minimum_travel() {
        let t0 = Instant::now();
        let mut router = GestureRouter::default();
        let short = SWIPE_MIN_DISTANCE - 1.0;
        router.handle(&event(TouchPhase::Start, &[(1, 300.0, 200.0)], t0));
        router.handle(&event(TouchPhase::Move, &[(1, 300.0 - short, 200.0)], t0 + ms(20)));
        assert!(router.handle(&event(TouchPhase::End, &[], t0 + ms(40))).is_empty());

        let t1 = t0 + ms(1000);
        router.handle(&event(TouchPhase::Start, &[(2, 300.0, 200.0)], t1));
        router.handle(&event(
            TouchPhase::Move,
            &[(2, 300.0 - SWIPE_MIN_DISTANCE, 200.0)],
            t1 + ms(20),
        ));
        let out = router.handle(&event(TouchPhase::End, &[], t1 + ms(40)));
        assert!(matches!(
            out.as_slice(),
            [Gesture::Swipe {
                direction: SwipeDirection::Left,
                ..
            }]
        ));
    }

    #[test]
    fn single_tap_waits_for_double_tap_window() {
        let t0 = Instant::now();
        let mut router = GestureRouter::default();
        assert!(tap(&mut router, 100.0, 100.0, t0).is_empty());
        assert!(router.tick(t0 + ms(200)).is_empty());
        assert_eq!(
            router.tick(t0 + ms(400)),
            vec![Gesture::Tap { x: 100.0, y: 100.0 }]
        );
    }

    #[test]
    fn second_close_tap_is_a_double_tap() {
        let t0 = Instant::now();
        let mut router = GestureRouter::default();
        tap(&mut router, 100.0, 100.0, t0);
        let out = tap(&mut router, 110.0, 105.0, t0 + ms(150));
        assert_eq!(out, vec![Gesture::DoubleTap { x: 110.0, y: 105.0 }]);
        assert!(router.tick(t0 + ms(1000)).is_empty());
    }

    #[test]
    fn still_finger_becomes_long_press_unless_it_moves() {
        let t0 = Instant::now();
        let mut router = GestureRouter::default();
        router.handle(&event(TouchPhase::Start, &[(1, 50.0, 50.0)], t0));
        assert!(router.tick(t0 + ms(400)).is_empty());
        assert_eq!(
            router.tick(t0 + ms(500)),
            vec![Gesture::LongPress { x: 50.0, y: 50.0 }]
        );
        assert!(router.handle(&event(TouchPhase::End, &[], t0 + ms(700))).is_empty());

        router.handle(&event(TouchPhase::Start, &[(2, 50.0, 50.0)], t0 + ms(1000)));
        router.handle(&event(TouchPhase::Move, &[(2, 65.0, 50.0)], t0 + ms(1100)));
        assert!(router.tick(t0 + ms(1600)).is_empty());
    }

    #[test]
    fn pinch_scales_from_starting_zoom() {
        let t0 = Instant::now();
        let mut router = GestureRouter::default();
        router.set_zoom(1.5);
        router.handle(&event(
            TouchPhase::Start,
            &[(1, 100.0, 100.0), (2, 200.0, 100.0)],
            t0,
        ));
        let out = router.handle(&event(
            TouchPhase::Move,
            &[(1, 50.0, 100.0), (2, 250.0, 100.0)],
            t0 + ms(50),
        ));
        assert_eq!(
            out,
            vec![Gesture::Pinch {
                scale: 2.0,
                zoom: 3.0,
                center_x: 150.0,
                center_y: 100.0
            }]
        );

        let out = router.handle(&event(TouchPhase::End, &[(2, 250.0, 100.0)], t0 + ms(80)));
        assert_eq!(out, vec![Gesture::PinchEnd { scale: 2.0 }]);
        assert!(router.handle(&event(TouchPhase::End, &[], t0 + ms(90))).is_empty());
    }

    #[test]
    fn zoomed_drag_pans_incrementally() {
        let t0 = Instant::now();
        let mut router = GestureRouter::default();
        router.set_zoom(2.0);
        router.handle(&event(TouchPhase::Start, &[(1, 100.0, 100.0)], t0));
        let first = router.handle(&event(TouchPhase::Move, &[(1, 110.0, 100.0)], t0 + ms(20)));
        let second = router.handle(&event(TouchPhase::Move, &[(1, 115.0, 98.0)], t0 + ms(40)));
        assert_eq!(first, vec![Gesture::Pan { dx: 10.0, dy: 0.0 }]);
        assert_eq!(second, vec![Gesture::Pan { dx: 5.0, dy: -2.0 }]);
        assert!(router.handle(&event(TouchPhase::End, &[], t0 + ms(60))).is_empty());
    }

    #[test]
    fn routing_follows_reading_direction() {
        let ltr = ReaderState::new("f", Vec::new(), ReaderSettings::default());
        let rtl = ReaderState::new(
            "f",
            Vec::new(),
            ReaderSettings {
                direction: ReadingDirection::Rtl,
                ..Default::default()
            },
        );
        let swipe = Gesture::Swipe {
            direction: SwipeDirection::Left,
            distance: 100.0,
            velocity: 1.0,
        };
        assert_eq!(
            route(&swipe, &ltr, 300.0),
            Some(GestureAction::Apply(Operation::NextPage))
        );
        assert_eq!(
            route(&swipe, &rtl, 300.0),
            Some(GestureAction::Apply(Operation::PrevPage))
        );

        let left_tap = Gesture::Tap { x: 10.0, y: 10.0 };
        assert_eq!(
            route(&left_tap, &rtl, 300.0),
            Some(GestureAction::Apply(Operation::NextPage))
        );
        let centre_tap = Gesture::Tap { x: 150.0, y: 10.0 };
        assert_eq!(
            route(&centre_tap, &ltr, 300.0),
            Some(GestureAction::ToggleControls)
        );
    }
}
