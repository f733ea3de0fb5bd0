use regex::Regex;

const FIRST_IMAGE_PATTERN: &str = r#"<img .*?src="(\S+)""#;

/// URL of the first `<img>` in a note body, used as the listing preview.
pub fn first_image_url(content: &str) -> Option<String> {
	let re = Regex::new(FIRST_IMAGE_PATTERN).ok()?;

	re.captures(content).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn picks_the_first_image() {
		let html = r#"<p>intro</p><img alt="a" src="/media/1/a.png"><img src="/media/1/b.png">"#;

		assert_eq!(first_image_url(html).as_deref(), Some("/media/1/a.png"));
	}

	#[test]
	fn no_image_yields_none() {
		assert_eq!(first_image_url("<p>x</p>"), None);
		assert_eq!(first_image_url(r#"<img src="">"#), None);
	}
}
