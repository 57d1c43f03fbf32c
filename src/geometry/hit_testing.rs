use super::Point;

/// Radius of a draggable control point, in pixels. The view uses it both for
/// drawing handles and as the pick tolerance.
pub const CONTROL_POINT_RADIUS: i32 = 8;

/// Index of the point in `points` closest to `target` whose squared distance
/// does not exceed `tolerance_squared`. Ties go to the lowest index.
pub fn closest_control_point(points: &[Point], target: Point, tolerance_squared: i64) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;

    for (index, point) in points.iter().enumerate() {
        let distance = point.distance_squared(target);
        if distance > tolerance_squared {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((index, distance)),
        }
    }

    best.map(|(index, _)| index)
}
