//! Drives the page's actual cursor position via CDP `Input.dispatchMouseEvent`
//! so `:hover` states and any on-page cursor overlays react like a real pointer.

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::input::{DispatchMouseEventParams, MouseButton};
use chromiumoxide::page::Page;

use crate::path::PathSample;

#[derive(Debug, Clone, Copy)]
pub struct CursorState {
    pub x: f64,
    pub y: f64,
}

impl CursorState {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Walk `page`'s cursor along `path`, sleeping between samples to honor their
    /// relative timing, and leave `self` at the path's final position.
    pub async fn move_along(&mut self, page: &Page, path: &[PathSample]) {
        let mut last_elapsed = 0.0;
        for sample in path {
            let gap_ms = (sample.elapsed_ms - last_elapsed).max(0.0);
            if gap_ms > 0.0 {
                tokio::time::sleep(Duration::from_millis(gap_ms as u64)).await;
            }
            last_elapsed = sample.elapsed_ms;

            let _ = page
                .execute(
                    DispatchMouseEventParams::builder()
                        .r#type(chromiumoxide::cdp::browser_protocol::input::DispatchMouseEventType::MouseMoved)
                        .x(sample.x)
                        .y(sample.y)
                        .button(MouseButton::None)
                        .build()
                        .unwrap(),
                )
                .await;

            self.x = sample.x;
            self.y = sample.y;
        }
    }

    pub async fn hover_jitter(&mut self, page: &Page, rng: &mut crate::rng::Mulberry32, moves: u32) {
        for _ in 0..moves {
            let dx = rng.range(-3.0, 3.0);
            let dy = rng.range(-3.0, 3.0);
            let x = self.x + dx;
            let y = self.y + dy;
            let _ = page
                .execute(
                    DispatchMouseEventParams::builder()
                        .r#type(chromiumoxide::cdp::browser_protocol::input::DispatchMouseEventType::MouseMoved)
                        .x(x)
                        .y(y)
                        .button(MouseButton::None)
                        .build()
                        .unwrap(),
                )
                .await;
            self.x = x;
            self.y = y;
            tokio::time::sleep(Duration::from_millis(rng.range_i(120, 220) as u64)).await;
        }
    }
}
