use rand::Rng;

/// Relative humidity over one simulated day, swinging from below 30% at night to above 50% at midday.
pub fn simulated_humidity(day_fraction: f64) -> f64 {
    let radians = day_fraction * 2.0 * std::f64::consts::PI;

    (40.0 - radians.cos() * 16.0).round()
}

/// Add a small random fluctuation and keep the result a valid percentage.
pub fn with_noise<R: Rng>(value: f64, rng: &mut R) -> f64 {
    (value + rng.random_range(-1.5..1.5)).clamp(0.0, 100.0)
}
