use eframe::egui::Pos2;

/// Samples a clamped uniform cubic B-spline through `control` into `samples`
/// points. The curve starts at the first and ends at the last control point.
pub fn sample_basis(control: &[Pos2], samples: usize) -> Vec<Pos2> {
    let samples = samples.max(2);
    match control {
        [] => return Vec::new(),
        [only] => return vec![*only; samples],
        _ => {}
    }

    let first = control[0];
    let last = control[control.len() - 1];
    let mut padded = Vec::with_capacity(control.len() + 4);
    padded.extend([first, first]);
    padded.extend_from_slice(control);
    padded.extend([last, last]);

    let segments = padded.len() - 3;
    (0..samples)
        .map(|index| {
            let t = index as f32 / (samples - 1) as f32 * segments as f32;
            let segment = (t.floor() as usize).min(segments - 1);
            let local = t - segment as f32;
            basis_point(&padded[segment..segment + 4], local)
        })
        .collect()
}

fn basis_point(window: &[Pos2], t: f32) -> Pos2 {
    let t2 = t * t;
    let t3 = t2 * t;
    let b0 = (1.0 - t).powi(3) / 6.0;
    let b1 = (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0;
    let b2 = (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0;
    let b3 = t3 / 6.0;

    Pos2::new(
        window[0].x * b0 + window[1].x * b1 + window[2].x * b2 + window[3].x * b3,
        window[0].y * b0 + window[1].y * b1 + window[2].y * b2 + window[3].y * b3,
    )
}

/// Resamples a polyline to `count` points evenly spaced by arc length.
pub fn resample(points: &[Pos2], count: usize) -> Vec<Pos2> {
    let count = count.max(2);
    match points {
        [] => return Vec::new(),
        [only] => return vec![*only; count],
        _ => {}
    }

    let mut cumulative = Vec::with_capacity(points.len());
    cumulative.push(0.0_f32);
    for pair in points.windows(2) {
        let previous = cumulative.last().copied().unwrap_or(0.0);
        cumulative.push(previous + pair[0].distance(pair[1]));
    }
    let total = cumulative.last().copied().unwrap_or(0.0);
    if total <= f32::EPSILON {
        return vec![points[0]; count];
    }

    let mut result = Vec::with_capacity(count);
    let mut segment = 0usize;
    for index in 0..count {
        let target = total * index as f32 / (count - 1) as f32;
        while segment + 2 < points.len() && cumulative[segment + 1] < target {
            segment += 1;
        }
        let span = cumulative[segment + 1] - cumulative[segment];
        let t = if span > f32::EPSILON {
            ((target - cumulative[segment]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        result.push(points[segment].lerp(points[segment + 1], t));
    }
    result
}
