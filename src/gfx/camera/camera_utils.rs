use cgmath::{Matrix4, SquareMatrix};

/// Maps OpenGL clip-space depth (-1..1) onto the wgpu range (0..1)
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}

/// Inverse-transpose of the upper 3x3 of `model`, padded back to 4x4.
///
/// Falls back to identity when the model matrix is singular.
pub fn normal_matrix(model: Matrix4<f32>) -> Matrix4<f32> {
    let mut upper = model;
    upper.x.w = 0.0;
    upper.y.w = 0.0;
    upper.z.w = 0.0;
    upper.w = cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);

    match upper.invert() {
        Some(inverse) => cgmath::Matrix::transpose(&inverse),
        None => Matrix4::identity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Matrix, Vector3};

    #[test]
    fn test_normal_matrix_of_uniform_scale_is_rescaled_identity() {
        let model = Matrix4::from_scale(2.0) * Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        let normal = normal_matrix(model);
        assert_eq!(normal.w, cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0));
        assert!((normal.x.x - 0.5).abs() < 1e-6);
        assert!((normal.y.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_singular_model_falls_back_to_identity() {
        let normal = normal_matrix(Matrix4::from_scale(0.0));
        assert_eq!(normal, Matrix4::identity());
        assert_eq!(normal.transpose(), normal);
    }

    #[test]
    fn test_matrix_array_is_column_major() {
        let m = Matrix4::from_translation(Vector3::new(4.0, 5.0, 6.0));
        let array = convert_matrix4_to_array(m);
        assert_eq!(array[3], [4.0, 5.0, 6.0, 1.0]);
    }
}
