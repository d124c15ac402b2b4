/// Exponentially weighted moving average over a stream of samples.
///
/// `alpha` is the weight of the newest sample; the first sample seeds the
/// average as-is.
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    value: Option<f64>,
}

impl Ewma {
    /// # Panics
    ///
    /// Panics unless `0 < alpha <= 1`.
    pub fn new(alpha: f64) -> Self {
        assert!(
            alpha > 0.0 && alpha <= 1.0,
            "EWMA weight must be in (0, 1], got {}",
            alpha
        );
        Self { alpha, value: None }
    }

    /// Folds `sample` into the average and returns the new value.
    pub fn update(&mut self, sample: f64) -> f64 {
        let value = match self.value {
            Some(current) => current.mul_add(1.0 - self.alpha, sample * self.alpha),
            None => sample,
        };
        self.value = Some(value);
        value
    }

    /// Current average, `None` before the first sample.
    pub fn get(&self) -> Option<f64> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_seeds_average() {
        let mut average = Ewma::new(0.2);
        assert_eq!(average.get(), None);

        assert_eq!(average.update(40.0), 40.0);
        assert_eq!(average.get(), Some(40.0));
    }

    #[test]
    fn test_weights_newest_sample_by_alpha() {
        let mut average = Ewma::new(0.25);
        average.update(100.0);

        // 100 * 0.75 + 200 * 0.25
        assert_eq!(average.update(200.0), 125.0);
    }

    #[test]
    fn test_alpha_one_tracks_last_sample() {
        let mut average = Ewma::new(1.0);
        average.update(3.0);
        average.update(8.0);
        assert_eq!(average.get(), Some(8.0));
    }

    #[test]
    #[should_panic]
    fn test_rejects_zero_alpha() {
        Ewma::new(0.0);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut average = Ewma::new(0.5);
        average.update(10.0);

        average.reset();

        assert_eq!(average.update(2.0), 2.0);
    }
}
