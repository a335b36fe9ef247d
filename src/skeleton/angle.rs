use std::f32::consts::{PI, TAU};

/// 角度を (-π, π] に正規化
pub fn normalize_angle(a: f32) -> f32 {
    if a > -PI && a <= PI {
        return a;
    }
    let folded = (a + PI).rem_euclid(TAU) - PI;
    if folded <= -PI {
        folded + TAU
    } else {
        folded
    }
}
