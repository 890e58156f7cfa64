//! Display list and its BGRA rasterization.

use kinect_device::ColorSpacePoint;

use crate::style::{Color, Pen};

/// One primitive of the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Line {
        from: ColorSpacePoint,
        to: ColorSpacePoint,
        pen: Pen,
    },
    /// Filled circle.
    Ellipse {
        center: ColorSpacePoint,
        radius: f32,
        color: Color,
    },
}

/// The overlay image. Cleared and redrawn in place on every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub width: u32,
    pub height: u32,
    /// Primitives in paint order.
    pub commands: Vec<DrawCommand>,
    /// BGRA pixels, transparent where nothing was drawn.
    pub pixels: Vec<u8>,
}

impl Drawing {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Reset to a fully transparent canvas.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.pixels.fill(0);
    }

    pub(crate) fn push(&mut self, command: DrawCommand) {
        self.rasterize(&command);
        self.commands.push(command);
    }

    /// BGRA value at `(x, y)`, if inside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels
            .get(idx..idx + 4)
            .and_then(|px| px.try_into().ok())
    }

    /// An owned copy that outlives the next frame.
    pub fn snapshot(&self) -> Drawing {
        self.clone()
    }

    fn rasterize(&mut self, command: &DrawCommand) {
        match *command {
            DrawCommand::Line { from, to, pen } => self.draw_line(from, to, pen),
            DrawCommand::Ellipse {
                center,
                radius,
                color,
            } => self.draw_circle(center, radius, color.to_bgra()),
        }
    }

    fn draw_line(&mut self, from: ColorSpacePoint, to: ColorSpacePoint, pen: Pen) {
        let radius = (pen.thickness.max(1) as i32 - 1) / 2;
        let Some((p0, p1)) = self.clip_line(from, to, radius as f32) else {
            return;
        };
        let color = pen.color.to_bgra();

        let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
        let (x1, y1) = (p1.0 as i32, p1.1 as i32);
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if ox.abs() + oy.abs() <= radius {
                        self.put_pixel(x0 + ox, y0 + oy, color);
                    }
                }
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Liang-Barsky clip against the canvas grown by `pad`.
    fn clip_line(
        &self,
        from: ColorSpacePoint,
        to: ColorSpacePoint,
        pad: f32,
    ) -> Option<((f32, f32), (f32, f32))> {
        if ![from.x, from.y, to.x, to.y].iter().all(|v| v.is_finite()) {
            return None;
        }

        let (min_x, min_y) = (-pad, -pad);
        let max_x = self.width as f32 - 1.0 + pad;
        let max_y = self.height as f32 - 1.0 + pad;
        let (dx, dy) = (to.x - from.x, to.y - from.y);

        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;
        for (p, q) in [
            (-dx, from.x - min_x),
            (dx, max_x - from.x),
            (-dy, from.y - min_y),
            (dy, max_y - from.y),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return None;
            }
        }

        Some((
            (from.x + t0 * dx, from.y + t0 * dy),
            (from.x + t1 * dx, from.y + t1 * dy),
        ))
    }

    fn draw_circle(&mut self, center: ColorSpacePoint, radius: f32, color: [u8; 4]) {
        if !center.x.is_finite() || !center.y.is_finite() {
            return;
        }

        let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);
        let r = radius.round() as i64;
        let x_range = (cx - r).max(0)..=(cx + r).min(self.width as i64 - 1);
        let y_range = (cy - r).max(0)..=(cy + r).min(self.height as i64 - 1);

        for y in y_range {
            for x in x_range.clone() {
                let (ox, oy) = (x - cx, y - cy);
                if ox * ox + oy * oy <= r * r {
                    self.put_pixel(x as i32, y as i32, color);
                }
            }
        }
    }

    fn put_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(px) = self.pixels.get_mut(idx..idx + 4) {
            px.copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32) -> ColorSpacePoint {
        ColorSpacePoint { x, y }
    }

    #[test]
    fn test_line_pixels() {
        let mut drawing = Drawing::new(10, 10);
        drawing.push(DrawCommand::Line {
            from: point(0.0, 5.0),
            to: point(9.0, 5.0),
            pen: Pen::new(Color::RED, 1),
        });

        for x in 0..10 {
            assert_eq!(drawing.pixel(x, 5), Some(Color::RED.to_bgra()));
        }
        assert_eq!(drawing.pixel(0, 4), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_far_off_canvas_line_is_clipped() {
        let mut drawing = Drawing::new(10, 10);
        drawing.push(DrawCommand::Line {
            from: point(-1.0e4, 2.0),
            to: point(1.0e4, 2.0),
            pen: Pen::new(Color::BLUE, 1),
        });
        assert_eq!(drawing.pixel(4, 2), Some(Color::BLUE.to_bgra()));

        drawing.push(DrawCommand::Line {
            from: point(f32::INFINITY, 0.0),
            to: point(3.0, 3.0),
            pen: Pen::new(Color::GREEN, 1),
        });
        assert_eq!(drawing.pixel(3, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_filled_circle_clipped_at_edges() {
        let mut drawing = Drawing::new(8, 8);
        drawing.push(DrawCommand::Ellipse {
            center: point(0.0, 0.0),
            radius: 3.0,
            color: Color::YELLOW,
        });

        assert_eq!(drawing.pixel(0, 0), Some(Color::YELLOW.to_bgra()));
        assert_eq!(drawing.pixel(3, 0), Some(Color::YELLOW.to_bgra()));
        assert_eq!(drawing.pixel(3, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_clear_resets_commands_and_pixels() {
        let mut drawing = Drawing::new(4, 4);
        drawing.push(DrawCommand::Ellipse {
            center: point(2.0, 2.0),
            radius: 1.0,
            color: Color::RED,
        });
        drawing.clear();

        assert!(drawing.commands.is_empty());
        assert!(drawing.pixels.iter().all(|&b| b == 0));
    }
}
