//! Display labels derived from identifiers.

/// Splits a camel-case identifier into capitalized words joined by spaces.
///
/// A word boundary falls before an uppercase character whose predecessor is
/// not uppercase, so runs of capitals stay together:
///
/// ```
/// use opsdeck_ops::label::name_from_camel_case;
///
/// assert_eq!(name_from_camel_case("GoldenRetriever"), "Golden Retriever");
/// assert_eq!(name_from_camel_case("parseHTTPHeader"), "Parse HTTPHeader");
/// ```
pub fn name_from_camel_case(ident: &str) -> String {
	let mut out = String::with_capacity(ident.len() + 4);
	let mut prev: Option<char> = None;
	for ch in ident.chars() {
		match prev {
			None => out.extend(ch.to_uppercase()),
			Some(p) if ch.is_uppercase() && !p.is_uppercase() => {
				out.push(' ');
				out.push(ch);
			}
			Some(_) => out.push(ch),
		}
		prev = Some(ch);
	}
	out
}
