//! Skeleton overlay rendering.
//!
//! [`SkeletonRenderer`] projects tracked bodies into color-image space and
//! records a display list of bones, joints and hand markers into a reusable
//! [`Drawing`], which is also rasterized into a transparent BGRA canvas.

mod drawing;
mod renderer;
mod style;

pub use drawing::{DrawCommand, Drawing};
pub use renderer::{clamp_depth, SkeletonRenderer, BONES, MIN_JOINT_DEPTH};
pub use style::{
    body_pen, Color, Pen, BODY_PENS, HAND_CLOSED_COLOR, HAND_LASSO_COLOR, HAND_OPEN_COLOR,
    HAND_RADIUS, INFERRED_BONE_PEN, INFERRED_JOINT_COLOR, JOINT_RADIUS, TRACKED_JOINT_COLOR,
};
