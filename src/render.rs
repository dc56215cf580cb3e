use macroquad::prelude::*;

use crate::config::GameConfig;
use crate::game::FrameState;

const SKY: Color = Color::new(0.44, 0.77, 0.81, 1.0);
const PIPE_BODY: Color = Color::new(0.33, 0.66, 0.2, 1.0);
const PIPE_EDGE: Color = Color::new(0.2, 0.4, 0.12, 1.0);
const BIRD: Color = Color::new(0.98, 0.8, 0.2, 1.0);
const BIRD_DEAD: Color = Color::new(0.85, 0.3, 0.2, 1.0);

pub const SCORE_TEXT_SIZE: f32 = 36.0;

pub fn draw_centered_text(text: &str, y: f32, size: f32) {
    let dims = measure_text(text, None, size as u16, 1.0);
    draw_text(text, screen_width() / 2.0 - dims.width / 2.0, y, size, WHITE);
}

// one tick of the world, scaled to the current window
pub fn draw_frame(frame: &FrameState, config: &GameConfig) {
    let sx = screen_width() / config.screen_width;
    let sy = screen_height() / config.screen_height;

    clear_background(SKY);

    let edge = 2.0;
    for pipe in &frame.pipes {
        let x = pipe.x * sx;
        let w = config.pipe_width * sx;

        let top_h = pipe.top_height() * sy;
        draw_rectangle(x, 0.0, w, top_h, PIPE_EDGE);
        draw_rectangle(x + edge, 0.0, w - 2.0 * edge, top_h - edge, PIPE_BODY);

        let bottom_y = pipe.bottom_start() * sy;
        let bottom_h = screen_height() - bottom_y;
        draw_rectangle(x, bottom_y, w, bottom_h, PIPE_EDGE);
        draw_rectangle(x + edge, bottom_y + edge, w - 2.0 * edge, bottom_h - edge, PIPE_BODY);
    }

    // tilt with velocity, like the sprite would
    let bird_w = config.bird_width * sx;
    let bird_h = config.bird_height * sy;
    let color = if frame.terminal { BIRD_DEAD } else { BIRD };
    let rotation = (frame.bird_velocity / config.velocity_scale).clamp(-0.5, 1.2);
    draw_rectangle_ex(
        frame.bird_x * sx + bird_w / 2.0,
        frame.bird_y * sy + bird_h / 2.0,
        bird_w,
        bird_h,
        DrawRectangleParams { offset: vec2(0.5, 0.5), rotation, color },
    );

    draw_centered_text(&frame.score.to_string(), 50.0, SCORE_TEXT_SIZE);
}
