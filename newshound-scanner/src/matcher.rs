/// Case-insensitive substring test of `text` against every term.
///
/// No terms means no match; an empty term matches anything.
pub fn contains_any_term<S: AsRef<str>>(text: &str, terms: &[S]) -> bool {
    let haystack = text.to_lowercase();
    terms
        .iter()
        .any(|term| haystack.contains(&term.as_ref().to_lowercase()))
}
