//! CAPTCHA image generation.
//!
//! Renders a prompt shape in a header band above a grid of tiles. Exactly
//! one tile repeats the prompt shape; the rest are decoys. Colours and sizes
//! vary per tile so the match has to be made on shape alone.

use base64::{Engine, engine::general_purpose::STANDARD};
use hangar_common::{CaptchaChallenge, CaptchaDifficulty, CaptchaOption, GuardError};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut,
    draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use rand::Rng;
use std::io::Cursor;

use super::{ChallengeStore, StoredChallenge, answer_hash};

/// Tile edge length in pixels
const TILE: u32 = 96;
/// Height of the prompt band
const HEADER: u32 = 112;
const BACKGROUND: Rgba<u8> = Rgba([26, 26, 46, 255]);
const TILE_BACKGROUND: Rgba<u8> = Rgba([40, 40, 64, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Circle,
    Square,
    Triangle,
    Diamond,
    Ring,
    Cross,
}

impl Shape {
    const ALL: [Shape; 6] = [
        Shape::Circle,
        Shape::Square,
        Shape::Triangle,
        Shape::Diamond,
        Shape::Ring,
        Shape::Cross,
    ];

    fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    fn random_except(rng: &mut impl Rng, excluded: Shape) -> Self {
        loop {
            let shape = Self::random(rng);
            if shape != excluded {
                return shape;
            }
        }
    }
}

/// Rendered puzzle before it is stored
pub(crate) struct Puzzle {
    pub answer: String,
    pub options: Vec<CaptchaOption>,
    pub png: Vec<u8>,
}

/// CAPTCHA generator service
pub struct CaptchaGenerator {
    /// Challenge TTL in seconds
    pub challenge_ttl: u64,
}

impl CaptchaGenerator {
    pub fn new(challenge_ttl: u64) -> Self {
        Self { challenge_ttl }
    }

    /// Generate and store a new CAPTCHA challenge
    pub async fn generate(
        &self,
        store: &ChallengeStore,
        difficulty: CaptchaDifficulty,
    ) -> Result<CaptchaChallenge, GuardError> {
        self.issue(store, difficulty)
            .await
            .map(|(challenge, _)| challenge)
    }

    /// Generate and store a challenge, also returning the correct option id
    pub(crate) async fn issue(
        &self,
        store: &ChallengeStore,
        difficulty: CaptchaDifficulty,
    ) -> Result<(CaptchaChallenge, String), GuardError> {
        let challenge_id = random_id(16);
        let puzzle = self.build_puzzle(difficulty)?;

        let now = chrono::Utc::now().timestamp();
        let expires_at = now + self.challenge_ttl as i64;

        let stored = StoredChallenge {
            id: challenge_id.clone(),
            answer_hash: answer_hash(&challenge_id, &puzzle.answer),
            difficulty,
            created_at: now,
            expires_at,
            used_at: None,
        };
        store.insert(&stored).await?;

        tracing::debug!(
            challenge_id = %challenge_id,
            difficulty = ?difficulty,
            "Generated CAPTCHA challenge"
        );

        let challenge = CaptchaChallenge {
            challenge_id,
            image_data: format!("data:image/png;base64,{}", STANDARD.encode(&puzzle.png)),
            options: puzzle.options,
            grid_size: difficulty.grid_size(),
            instructions: instructions(difficulty).to_string(),
            expires_at,
        };

        Ok((challenge, puzzle.answer))
    }

    /// Render the puzzle image and pick the answer tile
    pub(crate) fn build_puzzle(&self, difficulty: CaptchaDifficulty) -> Result<Puzzle, GuardError> {
        let mut rng = rand::rng();

        let (cols, rows) = difficulty.grid_size();
        let count = difficulty.option_count();
        let width = u32::from(cols) * TILE;
        let height = HEADER + u32::from(rows) * TILE;
        let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

        let target = Shape::random(&mut rng);
        let answer_index = rng.random_range(0..count);
        let header_center = ((width / 2) as i32, (HEADER / 2) as i32);
        draw_shape(&mut canvas, target, header_center, 36, random_color(&mut rng));

        let mut options = Vec::with_capacity(count);
        let mut answer = String::new();

        for i in 0..count {
            let col = (i % usize::from(cols)) as u8;
            let row = (i / usize::from(cols)) as u8;
            let left = i32::from(col) * TILE as i32;
            let top = HEADER as i32 + i32::from(row) * TILE as i32;

            draw_filled_rect_mut(
                &mut canvas,
                Rect::at(left + 4, top + 4).of_size(TILE - 8, TILE - 8),
                TILE_BACKGROUND,
            );

            let shape = if i == answer_index {
                target
            } else {
                Shape::random_except(&mut rng, target)
            };
            let size = rng.random_range(18..34);
            let center = (left + TILE as i32 / 2, top + TILE as i32 / 2);
            draw_shape(&mut canvas, shape, center, size, random_color(&mut rng));

            let id = random_id(8);
            if i == answer_index {
                answer = id.clone();
            }
            options.push(CaptchaOption { id, cell: (col, row) });
        }

        for _ in 0..difficulty.noise_strokes() {
            let start = (
                rng.random_range(0..width) as f32,
                rng.random_range(0..height) as f32,
            );
            let end = (
                rng.random_range(0..width) as f32,
                rng.random_range(0..height) as f32,
            );
            let alpha = rng.random_range(60..140);
            draw_line_segment_mut(&mut canvas, start, end, Rgba([255, 255, 255, alpha]));
        }

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| GuardError::Captcha(format!("PNG encoding failed: {e}")))?;

        Ok(Puzzle {
            answer,
            options,
            png,
        })
    }
}

/// Cryptographically random URL-safe id from `len` bytes
fn random_id(len: usize) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let mut bytes = vec![0u8; len];
    rand::rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

fn random_color(rng: &mut impl Rng) -> Rgba<u8> {
    Rgba([
        rng.random_range(150..=255),
        rng.random_range(150..=255),
        rng.random_range(150..=255),
        255,
    ])
}

fn draw_shape(canvas: &mut RgbaImage, shape: Shape, (cx, cy): (i32, i32), size: i32, color: Rgba<u8>) {
    match shape {
        Shape::Circle => draw_filled_circle_mut(canvas, (cx, cy), size, color),
        Shape::Ring => {
            for r in (size - 4)..=size {
                draw_hollow_circle_mut(canvas, (cx, cy), r, color);
            }
        }
        Shape::Square => draw_filled_rect_mut(
            canvas,
            Rect::at(cx - size, cy - size).of_size((size * 2) as u32, (size * 2) as u32),
            color,
        ),
        Shape::Triangle => draw_polygon_mut(
            canvas,
            &[
                Point::new(cx, cy - size),
                Point::new(cx + size, cy + size),
                Point::new(cx - size, cy + size),
            ],
            color,
        ),
        Shape::Diamond => draw_polygon_mut(
            canvas,
            &[
                Point::new(cx, cy - size),
                Point::new(cx + size, cy),
                Point::new(cx, cy + size),
                Point::new(cx - size, cy),
            ],
            color,
        ),
        Shape::Cross => {
            let arm = (size / 3).max(2);
            draw_filled_rect_mut(
                canvas,
                Rect::at(cx - size, cy - arm).of_size((size * 2) as u32, (arm * 2) as u32),
                color,
            );
            draw_filled_rect_mut(
                canvas,
                Rect::at(cx - arm, cy - size).of_size((arm * 2) as u32, (size * 2) as u32),
                color,
            );
        }
    }
}

fn instructions(difficulty: CaptchaDifficulty) -> &'static str {
    match difficulty {
        CaptchaDifficulty::Easy | CaptchaDifficulty::Medium => {
            "Select the tile showing the same shape as the one above"
        }
        CaptchaDifficulty::Hard | CaptchaDifficulty::Extreme => {
            "Select the tile with the same shape as above; colour and size may differ"
        }
    }
}
