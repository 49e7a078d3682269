use crate::math::attitude::AttitudeMatrix;
use crate::math::vector::Vector;

/// Three orthonormal axes plus the attitude matrix relating them to the
/// parent frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    attitude: AttitudeMatrix,
    x_axis: Vector,
    y_axis: Vector,
    z_axis: Vector,
}

impl ReferenceFrame {
    pub fn from_axes(x_axis: Vector, y_axis: Vector, z_axis: Vector) -> Self {
        Self {
            attitude: AttitudeMatrix::from_axes(&x_axis, &y_axis, &z_axis),
            x_axis,
            y_axis,
            z_axis,
        }
    }

    pub fn from_angles(roll_rad: f64, pitch_rad: f64, yaw_rad: f64) -> Self {
        Self {
            attitude: AttitudeMatrix::from_angles(roll_rad, pitch_rad, yaw_rad),
            x_axis: Vector::new(1.0, 0.0, 0.0),
            y_axis: Vector::new(0.0, 1.0, 0.0),
            z_axis: Vector::new(0.0, 0.0, 1.0),
        }
    }

    /// A frame rotated by the given angles inside `parent`.
    pub fn nested(parent: &ReferenceFrame, roll_rad: f64, pitch_rad: f64, yaw_rad: f64) -> Self {
        let mut frame = Self::from_angles(roll_rad, pitch_rad, yaw_rad);
        frame.update(parent);
        frame
    }

    /// A frame rotated by the given angles inside `inner`, itself inside
    /// `outer`.
    pub fn nested2(
        outer: &ReferenceFrame,
        inner: &ReferenceFrame,
        roll_rad: f64,
        pitch_rad: f64,
        yaw_rad: f64,
    ) -> Self {
        let mut frame = Self::from_angles(roll_rad, pitch_rad, yaw_rad);
        frame.update2(outer, inner);
        frame
    }

    /// Re-derives the axes after the parent frame has moved.
    pub fn update(&mut self, parent: &ReferenceFrame) {
        self.x_axis = parent
            .attitude
            .transform(&self.attitude.transform(&Vector::new(1.0, 0.0, 0.0)));
        self.y_axis = parent
            .attitude
            .transform(&self.attitude.transform(&Vector::new(0.0, 1.0, 0.0)));
        self.z_axis = parent
            .attitude
            .transform(&self.attitude.transform(&Vector::new(0.0, 0.0, 1.0)));
    }

    /// Re-derives the axes through two moved parents, innermost last.
    pub fn update2(&mut self, outer: &ReferenceFrame, inner: &ReferenceFrame) {
        self.x_axis = outer.attitude.transform(
            &inner
                .attitude
                .transform(&self.attitude.transform(&Vector::new(1.0, 0.0, 0.0))),
        );
        self.y_axis = outer.attitude.transform(
            &inner
                .attitude
                .transform(&self.attitude.transform(&Vector::new(0.0, 1.0, 0.0))),
        );
        self.z_axis = outer.attitude.transform(
            &inner
                .attitude
                .transform(&self.attitude.transform(&Vector::new(0.0, 0.0, 1.0))),
        );
    }

    pub fn attitude(&self) -> &AttitudeMatrix {
        &self.attitude
    }

    pub fn x_axis(&self) -> &Vector {
        &self.x_axis
    }

    pub fn y_axis(&self) -> &Vector {
        &self.y_axis
    }

    pub fn z_axis(&self) -> &Vector {
        &self.z_axis
    }
}
