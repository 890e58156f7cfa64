//! Skeleton projection and styling.

use std::sync::Arc;

use tracing::trace;

use kinect_device::{
    Body, CameraSpacePoint, ColorSpacePoint, CoordinateMapper, HandState, JointType, TrackingState,
    JOINT_COUNT,
};

use crate::drawing::{DrawCommand, Drawing};
use crate::style::{
    body_pen, Color, Pen, HAND_CLOSED_COLOR, HAND_LASSO_COLOR, HAND_OPEN_COLOR, HAND_RADIUS,
    INFERRED_BONE_PEN, INFERRED_JOINT_COLOR, JOINT_RADIUS, TRACKED_JOINT_COLOR,
};

/// Depth substituted for joints at or behind the sensor plane.
pub const MIN_JOINT_DEPTH: f32 = 0.1;

/// Joint pairs connected when drawing a skeleton.
pub const BONES: [(JointType, JointType); 24] = [
    // Torso
    (JointType::Head, JointType::Neck),
    (JointType::Neck, JointType::SpineShoulder),
    (JointType::SpineShoulder, JointType::SpineMid),
    (JointType::SpineMid, JointType::SpineBase),
    (JointType::SpineShoulder, JointType::ShoulderRight),
    (JointType::SpineShoulder, JointType::ShoulderLeft),
    (JointType::SpineBase, JointType::HipRight),
    (JointType::SpineBase, JointType::HipLeft),
    // Right arm
    (JointType::ShoulderRight, JointType::ElbowRight),
    (JointType::ElbowRight, JointType::WristRight),
    (JointType::WristRight, JointType::HandRight),
    (JointType::HandRight, JointType::HandTipRight),
    (JointType::WristRight, JointType::ThumbRight),
    // Left arm
    (JointType::ShoulderLeft, JointType::ElbowLeft),
    (JointType::ElbowLeft, JointType::WristLeft),
    (JointType::WristLeft, JointType::HandLeft),
    (JointType::HandLeft, JointType::HandTipLeft),
    (JointType::WristLeft, JointType::ThumbLeft),
    // Right leg
    (JointType::HipRight, JointType::KneeRight),
    (JointType::KneeRight, JointType::AnkleRight),
    (JointType::AnkleRight, JointType::FootRight),
    // Left leg
    (JointType::HipLeft, JointType::KneeLeft),
    (JointType::KneeLeft, JointType::AnkleLeft),
    (JointType::AnkleLeft, JointType::FootLeft),
];

/// Replace a non-positive depth with [`MIN_JOINT_DEPTH`].
pub fn clamp_depth(mut position: CameraSpacePoint) -> CameraSpacePoint {
    if position.z <= 0.0 {
        position.z = MIN_JOINT_DEPTH;
    }
    position
}

/// Draws tracked bodies into a reusable [`Drawing`].
pub struct SkeletonRenderer {
    mapper: Arc<dyn CoordinateMapper>,
    drawing: Drawing,
}

impl SkeletonRenderer {
    pub fn new(mapper: Arc<dyn CoordinateMapper>, width: u32, height: u32) -> Self {
        Self {
            mapper,
            drawing: Drawing::new(width, height),
        }
    }

    /// The last rendered image.
    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    /// Redraw the canvas from one body set. Slot order picks the bone color.
    pub fn process_frame(&mut self, bodies: &[Body]) -> &Drawing {
        self.drawing.clear();

        for (slot, body) in bodies.iter().enumerate() {
            if !body.is_tracked {
                continue;
            }

            let points = self.project(body);
            self.draw_body(body, &points, body_pen(slot));
            self.draw_hand(body.hand_left_state, points[JointType::HandLeft.index()]);
            self.draw_hand(body.hand_right_state, points[JointType::HandRight.index()]);
        }

        trace!(commands = self.drawing.commands.len(), "Skeleton frame rendered");
        &self.drawing
    }

    fn project(&self, body: &Body) -> [ColorSpacePoint; JOINT_COUNT] {
        body.joints.map(|joint| {
            self.mapper
                .map_camera_point_to_color_space(clamp_depth(joint.position))
        })
    }

    fn draw_body(&mut self, body: &Body, points: &[ColorSpacePoint; JOINT_COUNT], pen: Pen) {
        for (a, b) in BONES {
            let state_a = body.joint(a).tracking_state;
            let state_b = body.joint(b).tracking_state;
            if state_a == TrackingState::NotTracked || state_b == TrackingState::NotTracked {
                continue;
            }

            let pen = if state_a == TrackingState::Tracked && state_b == TrackingState::Tracked {
                pen
            } else {
                INFERRED_BONE_PEN
            };
            self.drawing.push(DrawCommand::Line {
                from: points[a.index()],
                to: points[b.index()],
                pen,
            });
        }

        for joint in &body.joints {
            let color = match joint.tracking_state {
                TrackingState::Tracked => TRACKED_JOINT_COLOR,
                TrackingState::Inferred => INFERRED_JOINT_COLOR,
                TrackingState::NotTracked => continue,
            };
            self.drawing.push(DrawCommand::Ellipse {
                center: points[joint.joint_type.index()],
                radius: JOINT_RADIUS,
                color,
            });
        }
    }

    fn draw_hand(&mut self, state: HandState, center: ColorSpacePoint) {
        let Some(color) = hand_color(state) else {
            return;
        };
        self.drawing.push(DrawCommand::Ellipse {
            center,
            radius: HAND_RADIUS,
            color,
        });
    }
}

fn hand_color(state: HandState) -> Option<Color> {
    match state {
        HandState::Closed => Some(HAND_CLOSED_COLOR),
        HandState::Open => Some(HAND_OPEN_COLOR),
        HandState::Lasso => Some(HAND_LASSO_COLOR),
        HandState::Unknown | HandState::NotTracked => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::BODY_PENS;
    use parking_lot::Mutex;

    /// Drops depth and records every point it sees.
    #[derive(Default)]
    struct OrthoMapper {
        seen: Mutex<Vec<CameraSpacePoint>>,
    }

    impl CoordinateMapper for OrthoMapper {
        fn map_camera_point_to_color_space(&self, point: CameraSpacePoint) -> ColorSpacePoint {
            self.seen.lock().push(point);
            ColorSpacePoint {
                x: point.x,
                y: point.y,
            }
        }
    }

    fn renderer() -> (Arc<OrthoMapper>, SkeletonRenderer) {
        let mapper = Arc::new(OrthoMapper::default());
        let renderer = SkeletonRenderer::new(mapper.clone(), 64, 64);
        (mapper, renderer)
    }

    fn tracked_body() -> Body {
        Body::uniform(1, CameraSpacePoint::new(10.0, 10.0, 2.0), TrackingState::Tracked)
    }

    fn lines(drawing: &Drawing) -> Vec<Pen> {
        drawing
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Line { pen, .. } => Some(*pen),
                DrawCommand::Ellipse { .. } => None,
            })
            .collect()
    }

    fn ellipses(drawing: &Drawing) -> Vec<(f32, Color)> {
        drawing
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Ellipse { radius, color, .. } => Some((*radius, *color)),
                DrawCommand::Line { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_fully_tracked_body() {
        let (_mapper, mut renderer) = renderer();
        let drawing = renderer.process_frame(&[tracked_body()]);

        let bones = lines(drawing);
        assert_eq!(bones.len(), 24);
        assert!(bones.iter().all(|pen| *pen == BODY_PENS[0]));

        let joints = ellipses(drawing);
        assert_eq!(joints.len(), JOINT_COUNT);
        assert!(joints
            .iter()
            .all(|&(r, c)| r == JOINT_RADIUS && c == TRACKED_JOINT_COLOR));
    }

    #[test]
    fn test_bone_style_follows_tracking_state() {
        let (_mapper, mut renderer) = renderer();
        let mut body = tracked_body();
        body.joint_mut(JointType::FootLeft).tracking_state = TrackingState::Inferred;
        body.joint_mut(JointType::FootRight).tracking_state = TrackingState::NotTracked;

        let drawing = renderer.process_frame(&[body]);
        let bones = lines(drawing);

        // AnkleRight-FootRight skipped, AnkleLeft-FootLeft inferred.
        assert_eq!(bones.len(), 23);
        assert_eq!(bones.iter().filter(|p| **p == INFERRED_BONE_PEN).count(), 1);

        let joints = ellipses(drawing);
        assert_eq!(joints.len(), JOINT_COUNT - 1);
        assert_eq!(
            joints.iter().filter(|(_, c)| *c == INFERRED_JOINT_COLOR).count(),
            1
        );
    }

    #[test]
    fn test_untracked_slots_and_palette_order() {
        let (_mapper, mut renderer) = renderer();
        let mut bodies = vec![Body::untracked(); 7];
        bodies[6] = tracked_body();
        bodies[1] = tracked_body();

        let bones = lines(renderer.process_frame(&bodies));
        assert_eq!(bones.len(), 48);
        assert!(bones[..24].iter().all(|p| *p == BODY_PENS[1]));
        assert!(bones[24..].iter().all(|p| *p == BODY_PENS[0]));
    }

    #[test]
    fn test_negative_depth_clamped_before_projection() {
        let (mapper, mut renderer) = renderer();
        let body = Body::uniform(3, CameraSpacePoint::new(1.0, 2.0, -5.0), TrackingState::Tracked);
        renderer.process_frame(&[body]);

        let seen = mapper.seen.lock();
        assert_eq!(seen.len(), JOINT_COUNT);
        assert!(seen.iter().all(|p| p.z == MIN_JOINT_DEPTH));
        assert_eq!(
            clamp_depth(CameraSpacePoint::new(0.0, 0.0, -5.0)).z,
            MIN_JOINT_DEPTH
        );
        assert_eq!(clamp_depth(CameraSpacePoint::new(0.0, 0.0, 1.5)).z, 1.5);
    }

    #[test]
    fn test_hand_markers() {
        let (_mapper, mut renderer) = renderer();
        let mut body = tracked_body();
        body.hand_left_state = HandState::Closed;
        body.hand_right_state = HandState::Lasso;

        let hands: Vec<Color> = ellipses(renderer.process_frame(&[body.clone()]))
            .into_iter()
            .filter(|(r, _)| *r == HAND_RADIUS)
            .map(|(_, c)| c)
            .collect();
        assert_eq!(hands, vec![HAND_CLOSED_COLOR, HAND_LASSO_COLOR]);

        body.hand_left_state = HandState::Open;
        body.hand_right_state = HandState::Unknown;
        let hands: Vec<Color> = ellipses(renderer.process_frame(&[body]))
            .into_iter()
            .filter(|(r, _)| *r == HAND_RADIUS)
            .map(|(_, c)| c)
            .collect();
        assert_eq!(hands, vec![HAND_OPEN_COLOR]);
    }

    #[test]
    fn test_canvas_redrawn_each_frame() {
        let (_mapper, mut renderer) = renderer();
        renderer.process_frame(&[tracked_body()]);
        assert_eq!(
            renderer.drawing().pixel(10, 10),
            Some(TRACKED_JOINT_COLOR.to_bgra())
        );

        renderer.process_frame(&[Body::untracked()]);
        assert!(renderer.drawing().commands.is_empty());
        assert_eq!(renderer.drawing().pixel(10, 10), Some([0, 0, 0, 0]));
    }
}
