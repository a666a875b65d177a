use anyhow::Result;
use jetflyer::{Engine, EngineContext, FlyerState, Game, ThrustInput, Vec2, FLYER_SIZE};

const SKY: [f32; 4] = [0.33, 0.55, 0.95, 1.0];
const SILVER: [f32; 4] = [0.75, 0.75, 0.75, 1.0];
const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const ORANGE: [f32; 4] = [1.0, 0.65, 0.0, 0.8];
const YELLOW: [f32; 4] = [1.0, 1.0, 0.0, 1.0];

/// Arrow-key jetpack flight: one sprite over a full-window sky.
struct BasicFlight {
    flyer: FlyerState,
}

impl BasicFlight {
    fn new() -> Self {
        Self {
            flyer: FlyerState::new(Vec2::new(100.0, 200.0)),
        }
    }
}

impl Game for BasicFlight {
    fn init(&mut self, _ctx: &mut EngineContext<'_>) -> Result<()> {
        log::info!("flyer starting at {:?}", self.flyer.position);
        Ok(())
    }

    fn update(&mut self, ctx: &mut EngineContext<'_>) -> Result<()> {
        let thrust = ThrustInput::from_input(ctx.input());
        let viewport = ctx.viewport();
        self.flyer.step(thrust, &viewport);
        Ok(())
    }

    fn draw(&mut self, ctx: &mut EngineContext<'_>) -> Result<()> {
        // The sprite rotates about its center; part offsets below are local
        // to that center within the 50x50 sprite box.
        let center = self.flyer.position + Vec2::new(FLYER_SIZE * 0.5, FLYER_SIZE * 0.5);
        let angle = self.flyer.heading();
        let at = |local: Vec2| center + local.rotate(angle);

        let renderer = ctx.renderer();
        let mut frame = renderer.begin_frame()?;
        renderer.clear(&mut frame, SKY)?;

        // Pack body with a thin dark outline behind it
        renderer.draw_rect(&mut frame, at(Vec2::ZERO), Vec2::new(22.0, 32.0), angle, BLACK)?;
        renderer.draw_rect(&mut frame, at(Vec2::ZERO), Vec2::new(20.0, 30.0), angle, SILVER)?;

        // Straps
        for &side in &[-12.5, 12.5] {
            for &height in &[-9.0, 1.0] {
                renderer.draw_rect(
                    &mut frame,
                    at(Vec2::new(side, height)),
                    Vec2::new(5.0, 2.0),
                    angle,
                    BLACK,
                )?;
            }
        }

        // Jets and their flames
        for &side in &[-5.0, 5.0] {
            renderer.draw_ellipse(
                &mut frame,
                at(Vec2::new(side, 20.0)),
                Vec2::new(5.0, 8.0),
                angle,
                ORANGE,
            )?;
            renderer.draw_ellipse(
                &mut frame,
                at(Vec2::new(side, 25.0)),
                Vec2::new(3.0, 5.0),
                angle,
                YELLOW,
            )?;
        }

        renderer.end_frame(frame)?;
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    Engine::new()
        .with_title("Flying Jet Pack - arrow keys to fly")
        .run(BasicFlight::new())
}
