//! Colors and pens for the skeleton overlay.

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const ORANGE: Self = Self::rgb(255, 165, 0);
    pub const GREEN: Self = Self::rgb(0, 128, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const INDIGO: Self = Self::rgb(75, 0, 130);
    pub const VIOLET: Self = Self::rgb(238, 130, 238);
    pub const GRAY: Self = Self::rgb(128, 128, 128);
    pub const YELLOW: Self = Self::rgb(255, 255, 0);

    /// Pixel bytes in BGRA order.
    pub const fn to_bgra(self) -> [u8; 4] {
        [self.b, self.g, self.r, 255]
    }
}

/// Stroke color and width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pen {
    pub color: Color,
    pub thickness: u32,
}

impl Pen {
    pub const fn new(color: Color, thickness: u32) -> Self {
        Self { color, thickness }
    }
}

/// Bone pens assigned round-robin by body slot.
pub const BODY_PENS: [Pen; 6] = [
    Pen::new(Color::RED, 6),
    Pen::new(Color::ORANGE, 6),
    Pen::new(Color::GREEN, 6),
    Pen::new(Color::BLUE, 6),
    Pen::new(Color::INDIGO, 6),
    Pen::new(Color::VIOLET, 6),
];

/// Bones with an inferred endpoint.
pub const INFERRED_BONE_PEN: Pen = Pen::new(Color::GRAY, 1);

pub const TRACKED_JOINT_COLOR: Color = Color::rgb(68, 192, 68);
pub const INFERRED_JOINT_COLOR: Color = Color::YELLOW;
pub const JOINT_RADIUS: f32 = 3.0;

pub const HAND_RADIUS: f32 = 30.0;
pub const HAND_CLOSED_COLOR: Color = Color::RED;
pub const HAND_OPEN_COLOR: Color = Color::GREEN;
pub const HAND_LASSO_COLOR: Color = Color::BLUE;

/// Bone pen for the body in `slot`.
pub fn body_pen(slot: usize) -> Pen {
    BODY_PENS[slot % BODY_PENS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_wraps_every_six_slots() {
        assert_eq!(body_pen(6), body_pen(0));
        assert_eq!(body_pen(7), body_pen(1));
        assert_ne!(body_pen(0), body_pen(1));
    }

    #[test]
    fn test_bgra_byte_order() {
        assert_eq!(Color::rgb(1, 2, 3).to_bgra(), [3, 2, 1, 255]);
    }
}
