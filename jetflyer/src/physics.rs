use winit::keyboard::KeyCode;

use crate::input::InputState;
use crate::math::Vec2;

/// Velocity gained per frame while a thrust key is held.
pub const THRUST: f32 = 0.5;
/// Cap applied to the thrust contribution on each axis.
pub const MAX_THRUST_SPEED: f32 = 5.0;
/// Constant downward acceleration, applied every frame after the thrust cap.
pub const GRAVITY: f32 = 0.2;
/// Isotropic per-frame velocity damping.
pub const FRICTION: f32 = 0.98;
/// Side length of the square flyer sprite in pixels.
pub const FLYER_SIZE: f32 = 50.0;

/// Current drawable area in pixels. External input, re-read every frame so
/// window resizes take effect immediately.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Largest x the flyer's top-left corner may take.
    pub fn max_x(&self) -> f32 {
        self.width - FLYER_SIZE
    }

    /// Largest y the flyer's top-left corner may take.
    pub fn max_y(&self) -> f32 {
        self.height - FLYER_SIZE
    }
}

/// One frame's sample of the held directional keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThrustInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl ThrustInput {
    /// Sample the arrow keys from the input tracker. All other keys are
    /// ignored.
    pub fn from_input(input: &InputState) -> Self {
        Self {
            left: input.is_key_down(KeyCode::ArrowLeft),
            right: input.is_key_down(KeyCode::ArrowRight),
            up: input.is_key_down(KeyCode::ArrowUp),
            down: input.is_key_down(KeyCode::ArrowDown),
        }
    }
}

/// Position and velocity of the jetpack flyer.
///
/// `position` is the top-left corner of the sprite in screen pixels,
/// y pointing down. Velocity components stay within ±[`MAX_THRUST_SPEED`]
/// as far as thrust is concerned; gravity is added after the cap, so while
/// falling vy can settle above it (see `step`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlyerState {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl FlyerState {
    /// A flyer at rest at the given position.
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
        }
    }

    /// Facing angle in radians, derived from velocity. Zero velocity faces
    /// right (atan2(0, 0) is 0).
    pub fn heading(&self) -> f32 {
        self.velocity.y.atan2(self.velocity.x)
    }

    /// Advance the flyer by one frame.
    ///
    /// Order is load-bearing:
    /// 1. thrust per held key, each axis capped at ±MAX_THRUST_SPEED,
    /// 2. gravity (after the cap: vy may exceed it while falling),
    /// 3. friction on both axes,
    /// 4. position integrates the velocity from *before* this step's update;
    ///    using the freshly computed velocity instead would change every
    ///    motion curve (one frame of input-to-motion lag, deliberate),
    /// 5. hard clamp of position to the viewport minus the sprite extent.
    pub fn step(&mut self, input: ThrustInput, viewport: &Viewport) {
        let carried = self.velocity;

        if input.left {
            self.velocity.x = (self.velocity.x - THRUST).max(-MAX_THRUST_SPEED);
        }
        if input.right {
            self.velocity.x = (self.velocity.x + THRUST).min(MAX_THRUST_SPEED);
        }
        if input.up {
            self.velocity.y = (self.velocity.y - THRUST).max(-MAX_THRUST_SPEED);
        }
        if input.down {
            self.velocity.y = (self.velocity.y + THRUST).min(MAX_THRUST_SPEED);
        }

        self.velocity.y += GRAVITY;
        self.velocity *= FRICTION;

        self.position += carried;
        // Lower bound first; the upper bound wins if the viewport is smaller
        // than the sprite.
        self.position.x = self.position.x.max(0.0).min(viewport.max_x());
        self.position.y = self.position.y.max(0.0).min(viewport.max_y());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 800.0,
        height: 600.0,
    };

    fn held(left: bool, right: bool, up: bool, down: bool) -> ThrustInput {
        ThrustInput {
            left,
            right,
            up,
            down,
        }
    }

    const NO_KEYS: ThrustInput = ThrustInput {
        left: false,
        right: false,
        up: false,
        down: false,
    };

    #[test]
    fn thrust_input_samples_only_arrow_keys() {
        let mut input = InputState::new();
        input.press(KeyCode::ArrowRight);
        input.press(KeyCode::ArrowUp);
        input.press(KeyCode::KeyW);
        input.press(KeyCode::Space);

        let thrust = ThrustInput::from_input(&input);
        assert_eq!(thrust, held(false, true, true, false));
    }

    #[test]
    fn velocity_stays_within_bounds_under_any_thrust() {
        // Cycle through every key combination for a while; thrust never
        // pushes a component past ±5. Gravity lands after the cap, so vy can
        // drift above it, but never past the free-fall terminal velocity
        // FRICTION * GRAVITY / (1 - FRICTION) = 9.8.
        let terminal_vy = FRICTION * GRAVITY / (1.0 - FRICTION);
        let mut flyer = FlyerState::new(Vec2::new(400.0, 300.0));
        for i in 0..1000 {
            let input = held((i & 1) != 0, (i & 2) != 0, (i & 4) != 0, (i & 8) != 0);
            flyer.step(input, &VIEWPORT);
            assert!(flyer.velocity.x.abs() <= MAX_THRUST_SPEED);
            assert!(flyer.velocity.y >= -MAX_THRUST_SPEED);
            assert!(flyer.velocity.y <= terminal_vy + 1e-3);
        }
    }

    #[test]
    fn position_stays_within_viewport() {
        let mut flyer = FlyerState::new(Vec2::new(10.0, 10.0));
        for i in 0..1000 {
            let input = held(i % 7 == 0, i % 3 == 0, i % 5 == 0, i % 2 == 0);
            flyer.step(input, &VIEWPORT);
            assert!(flyer.position.x >= 0.0);
            assert!(flyer.position.x <= VIEWPORT.max_x());
            assert!(flyer.position.y >= 0.0);
            assert!(flyer.position.y <= VIEWPORT.max_y());
        }
    }

    #[test]
    fn down_thrust_settles_just_above_nominal_cap() {
        // Gravity lands after the thrust cap, so the held-Down fixed point is
        // (5 + 0.2) * 0.98 = 5.096, slightly above MAX_THRUST_SPEED.
        let mut flyer = FlyerState::new(Vec2::new(400.0, 100.0));
        for _ in 0..200 {
            flyer.step(held(false, false, false, true), &VIEWPORT);
        }
        let expected = (MAX_THRUST_SPEED + GRAVITY) * FRICTION;
        assert!(flyer.velocity.y > MAX_THRUST_SPEED);
        assert!((flyer.velocity.y - expected).abs() < 1e-3);
    }

    #[test]
    fn free_fall_converges_to_terminal_velocity() {
        // vy' = (vy + 0.2) * 0.98 has fixed point 0.98 * 0.2 / 0.02 = 9.8.
        let mut flyer = FlyerState::new(Vec2::new(100.0, 0.0));
        let mut last_vy = flyer.velocity.y;
        for _ in 0..500 {
            flyer.step(NO_KEYS, &VIEWPORT);
            assert!(flyer.velocity.y >= last_vy);
            last_vy = flyer.velocity.y;
        }
        assert!((flyer.velocity.y - 9.8).abs() < 1e-3);
    }

    #[test]
    fn left_and_right_thrust_are_mirror_images() {
        let mut leftward = FlyerState::new(Vec2::new(400.0, 300.0));
        let mut rightward = FlyerState::new(Vec2::new(400.0, 300.0));
        for _ in 0..25 {
            leftward.step(held(true, false, false, false), &VIEWPORT);
            rightward.step(held(false, true, false, false), &VIEWPORT);
            assert_eq!(leftward.velocity.x, -rightward.velocity.x);
        }
        assert!(rightward.velocity.x > 0.0);
    }

    #[test]
    fn opposed_keys_cancel() {
        let mut flyer = FlyerState::new(Vec2::new(400.0, 300.0));
        for _ in 0..50 {
            flyer.step(held(true, true, false, false), &VIEWPORT);
            assert_eq!(flyer.velocity.x, 0.0);
        }
    }

    #[test]
    fn position_integrates_previous_frame_velocity() {
        // First step from rest: velocity was zero when the step began, so the
        // flyer does not move even though it now has velocity.
        let mut flyer = FlyerState::new(Vec2::new(100.0, 200.0));
        flyer.step(held(false, true, false, false), &VIEWPORT);
        assert_eq!(flyer.position.x, 100.0);
        assert_eq!(flyer.velocity.x, THRUST * FRICTION);

        let carried = flyer.velocity.x;
        flyer.step(held(false, true, false, false), &VIEWPORT);
        assert_eq!(flyer.position.x, 100.0 + carried);
    }

    #[test]
    fn origin_corner_does_not_go_negative() {
        let mut flyer = FlyerState::new(Vec2::ZERO);
        flyer.velocity = Vec2::new(-3.0, -3.0);
        flyer.step(NO_KEYS, &VIEWPORT);
        assert_eq!(flyer.position, Vec2::ZERO);
    }

    #[test]
    fn far_corner_clamps_exactly_to_viewport_minus_sprite() {
        let mut flyer = FlyerState::new(Vec2::new(VIEWPORT.max_x(), VIEWPORT.max_y()));
        flyer.velocity = Vec2::new(4.0, 4.0);
        flyer.step(NO_KEYS, &VIEWPORT);
        assert_eq!(flyer.position.x, 750.0);
        assert_eq!(flyer.position.y, 550.0);
    }

    #[test]
    fn held_right_accelerates_monotonically_toward_cap() {
        let mut flyer = FlyerState::new(Vec2::new(100.0, 200.0));
        let mut last_x = flyer.position.x;
        let mut last_vx = flyer.velocity.x;
        for _ in 0..10 {
            let carried = flyer.velocity.x;
            flyer.step(held(false, true, false, false), &VIEWPORT);
            assert_eq!(flyer.position.x, last_x + carried);
            assert!(flyer.velocity.x > last_vx);
            assert!(flyer.velocity.x <= MAX_THRUST_SPEED);
            last_x = flyer.position.x;
            last_vx = flyer.velocity.x;
        }
    }

    #[test]
    fn gravity_brings_flyer_to_rest_on_the_floor() {
        let mut flyer = FlyerState::new(Vec2::new(100.0, 200.0));
        for _ in 0..200 {
            flyer.step(NO_KEYS, &VIEWPORT);
        }
        assert_eq!(flyer.position.y, 550.0);
        // The floor is a position clamp only; velocity keeps pointing down.
        flyer.step(NO_KEYS, &VIEWPORT);
        assert_eq!(flyer.position.y, 550.0);
        assert!(flyer.velocity.y > 0.0);
    }

    #[test]
    fn heading_follows_velocity() {
        let mut flyer = FlyerState::new(Vec2::new(400.0, 300.0));
        assert_eq!(flyer.heading(), 0.0);

        flyer.velocity = Vec2::new(0.0, 1.0);
        assert!((flyer.heading() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);

        flyer.velocity = Vec2::new(-1.0, 0.0);
        assert!((flyer.heading().abs() - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn resized_viewport_reclamps_on_next_step() {
        let mut flyer = FlyerState::new(Vec2::new(700.0, 500.0));
        let shrunk = Viewport::new(400.0, 300.0);
        flyer.step(NO_KEYS, &shrunk);
        assert_eq!(flyer.position.x, shrunk.max_x());
        assert_eq!(flyer.position.y, shrunk.max_y());
    }
}
