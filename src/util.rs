use glam::{Mat4, Vec3};

/// Column-major dump of a matrix, one axis per line.
pub fn format_mat4(name: &str, mat: &Mat4) -> String {
    let axes = [
        ("x_axis", mat.x_axis),
        ("y_axis", mat.y_axis),
        ("z_axis", mat.z_axis),
        ("w_axis", mat.w_axis),
    ];
    let mut output = format!("{}:\n", name);
    for (label, axis) in axes {
        output.push_str(&format!(
            "{}: [{:8.3},{:8.3},{:8.3},{:8.3}]\n",
            label, axis.x, axis.y, axis.z, axis.w
        ));
    }
    output
}

pub fn format_vec3(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_prints_four_axes() {
        let out = format_mat4("view", &Mat4::IDENTITY);
        assert!(out.starts_with("view:\n"));
        assert_eq!(out.lines().count(), 5);
        assert!(out.contains("w_axis: [   0.000,   0.000,   0.000,   1.000]"));
    }

    #[test]
    fn vec3_two_decimals() {
        assert_eq!(format_vec3(Vec3::new(0.0, 1.234, -3.0)), "(0.00, 1.23, -3.00)");
    }
}
