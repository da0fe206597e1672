use glam::{Vec2, Vec3, Vec4};

/// Clip space view volume, `-w <= x, y, z <= w`, as plane vectors.
const FRUSTUM_PLANES: [Vec4; 6] = [
    Vec4::new(1.0, 0.0, 0.0, 1.0),
    Vec4::new(-1.0, 0.0, 0.0, 1.0),
    Vec4::new(0.0, 1.0, 0.0, 1.0),
    Vec4::new(0.0, -1.0, 0.0, 1.0),
    Vec4::new(0.0, 0.0, 1.0, 1.0),
    Vec4::new(0.0, 0.0, -1.0, 1.0),
];

/// Shrinks `[0, 1]` to the part of a segment on the inner side of every boundary.
///
/// Each pair is the signed distance of the segment's start and end to one boundary,
/// positive inside.
fn clip_range(distances: impl IntoIterator<Item = (f32, f32)>) -> Option<(f32, f32)> {
    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    for (start, end) in distances {
        if !(start.is_finite() && end.is_finite()) {
            return None;
        }
        if start < 0.0 && end < 0.0 {
            return None;
        }
        if start < 0.0 {
            t0 = t0.max(start / (start - end));
        } else if end < 0.0 {
            t1 = t1.min(start / (start - end));
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}

/// Clips a segment in homogeneous clip space against the view volume.
pub fn clip_line(a: Vec4, b: Vec4) -> Option<(Vec4, Vec4)> {
    let (t0, t1) = clip_range(FRUSTUM_PLANES.iter().map(|p| (p.dot(a), p.dot(b))))?;
    Some((a.lerp(b, t0), b.lerp(a, 1.0 - t1)))
}

/// Clips a window space segment to the pixel rectangle `[0, width) x [0, height)`.
/// Depth in `z` is interpolated along.
pub fn clip_to_rect(a: Vec3, b: Vec3, width: usize, height: usize) -> Option<(Vec3, Vec3)> {
    if width == 0 || height == 0 {
        return None;
    }
    let (max_x, max_y) = ((width - 1) as f32, (height - 1) as f32);
    let (t0, t1) = clip_range([
        (a.x, b.x),
        (max_x - a.x, max_x - b.x),
        (a.y, b.y),
        (max_y - a.y, max_y - b.y),
    ])?;
    Some((a.lerp(b, t0), b.lerp(a, 1.0 - t1)))
}

/// Walks the pixels between `start` and `end`, interpolating depth linearly along the way.
///
/// Endpoints are expected on screen, see [`clip_to_rect`].
pub fn bresenham<F>(start: Vec2, start_depth: f32, end: Vec2, end_depth: f32, mut plot: F)
where
    F: FnMut(i32, i32, f32),
{
    let mut x0 = start.x as i32;
    let mut y0 = start.y as i32;
    let x1 = end.x as i32;
    let y1 = end.y as i32;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let steps = dx.max(-dy).max(1) as f32;
    let mut step = 0.0;

    loop {
        let depth = start_depth + (end_depth - start_depth) * (step / steps);
        plot(x0, y0, depth);

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
        step += 1.0;
    }
}

/// Clip space to window coordinates, y pointing down. `None` if the vertex is behind the
/// eye or outside the depth range.
pub fn project_to_screen(clip: Vec4, width: usize, height: usize) -> Option<Vec3> {
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    // clipped endpoints sit on the boundary, allow for rounding
    if !(-1.0 - 1e-4..=1.0 + 1e-4).contains(&ndc.z) {
        return None;
    }
    Some(Vec3::new(
        (ndc.x + 1.0) * 0.5 * width as f32,
        (1.0 - ndc.y) * 0.5 * height as f32,
        ndc.z,
    ))
}
