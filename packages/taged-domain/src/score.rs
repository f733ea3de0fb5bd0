/// Denominator for relevance normalisation. Absent or zero maxima fall back to 1.
pub fn max_score<I>(scores: I) -> f64
where
	I: IntoIterator<Item = Option<f64>>,
{
	let max = scores.into_iter().flatten().filter(|score| score.is_finite()).fold(0.0, f64::max);

	if max > 0.0 { max } else { 1.0 }
}

/// `raw / max` rounded to three decimals.
pub fn normalize(raw: Option<f64>, max: f64) -> f64 {
	let raw = raw.filter(|score| score.is_finite()).unwrap_or(0.0);
	let max = if max > 0.0 { max } else { 1.0 };

	(raw / max * 1_000.0).round() / 1_000.0
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_or_missing_max_defaults_to_one() {
		assert_eq!(max_score([None, None]), 1.0);
		assert_eq!(max_score([Some(0.0)]), 1.0);
		assert_eq!(max_score(Vec::new()), 1.0);
	}

	#[test]
	fn scores_are_rounded_ratios() {
		let max = max_score([Some(3.0), Some(1.0), None]);

		assert_eq!(max, 3.0);
		assert_eq!(normalize(Some(3.0), max), 1.0);
		assert_eq!(normalize(Some(1.0), max), 0.333);
		assert_eq!(normalize(Some(2.0), max), 0.667);
		assert_eq!(normalize(None, max), 0.0);
	}
}
