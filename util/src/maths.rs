//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Clamp a value into `[min, max]`.
///
/// Unlike `f64::clamp` this does not panic if `min > max`, the upper limit
/// wins. A NaN value is returned unchanged.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let mut ret = value;

    if ret < min {
        ret = min
    }
    if ret > max {
        ret = max
    }

    ret
}

/// Arithmetic mean of the values, or `None` if there are none.
pub fn mean<T, I>(values: I) -> Option<T>
where
    T: Float,
    I: IntoIterator<Item = T>
{
    let mut sum = T::zero();
    let mut count = 0usize;

    for v in values {
        sum = sum + v;
        count += 1;
    }

    if count == 0 {
        return None
    }

    T::from(count).map(|n| sum / n)
}

/// Returns true if every value is strictly larger than the one before it.
pub fn is_strictly_increasing<T: Float>(values: &[T]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// Returns true if the values mirror each other about zero, i.e.
/// `values[i] == -values[n - 1 - i]` to within `tolerance`.
pub fn is_symmetric_about_zero<T: Float>(values: &[T], tolerance: T) -> bool {
    values
        .iter()
        .zip(values.iter().rev())
        .all(|(a, b)| (*a + *b).abs() <= tolerance)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 65535f64), (0f64, 1f64), 65535f64), 1f64);
        assert_eq!(lin_map((0f64, 100f64), (0f64, 4096f64), 50f64), 2048f64);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 10f64), 0f64), 5f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(3f64, 0f64, 2f64), 2f64);
        assert_eq!(clamp(-3f64, 0f64, 2f64), 0f64);
        assert_eq!(clamp(1f64, 0f64, 2f64), 1f64);
        assert_eq!(clamp(f64::INFINITY, 0f64, 2f64), 2f64);
        assert!(clamp(f64::NAN, 0f64, 2f64).is_nan());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(vec![-1f64, 1f64]), Some(0f64));
        assert_eq!(mean(vec![3f64, 5f64, 7f64]), Some(5f64));
        assert_eq!(mean(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_weight_shape() {
        let w = [-7f64, -5f64, -3f64, -1f64, 1f64, 3f64, 5f64, 7f64];
        assert!(is_strictly_increasing(&w));
        assert!(is_symmetric_about_zero(&w, 1e-9));

        assert!(!is_strictly_increasing(&[-1f64, -1f64, 1f64]));
        assert!(!is_symmetric_about_zero(&[-2f64, 0f64, 1f64], 1e-9));
        assert!(is_symmetric_about_zero(&[-1f64, 0f64, 1f64], 1e-9));
    }
}
