//! Russian/English keyboard layout transliteration for search strings typed with the wrong
//! layout active.

const RU: &str = "йцукенгшщзхъфывапролджэячсмитьбю.ёЙЦУКЕНГШЩЗХЪФЫВАПРОЛДЖЭЯЧСМИТЬБЮ,Ё";
const EN: &str = "qwertyuiop[]asdfghjkl;'zxcvbnm,./`QWERTYUIOP{}ASDFGHJKL:\"ZXCVBNM<>?~";

pub fn en_to_ru(input: &str) -> String {
	translate(input, EN, RU)
}

pub fn ru_to_en(input: &str) -> String {
	translate(input, RU, EN)
}

/// The original string followed by both transliterations.
pub fn expand_search(input: &str) -> String {
	format!("{input} {} {}", en_to_ru(input), ru_to_en(input)).trim().to_string()
}

fn translate(input: &str, from: &str, to: &str) -> String {
	input
		.chars()
		.map(|c| match from.chars().position(|candidate| candidate == c) {
			Some(index) => to.chars().nth(index).unwrap_or(c),
			None => c,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn layouts_have_matching_length() {
		assert_eq!(RU.chars().count(), EN.chars().count());
	}

	#[test]
	fn translates_both_directions() {
		assert_eq!(en_to_ru("ljrth"), "докер");
		assert_eq!(ru_to_en("вщслук"), "docker");
	}

	#[test]
	fn expansion_keeps_the_original_first() {
		assert_eq!(expand_search("ljrth"), "ljrth докер ljrth");
	}
}
