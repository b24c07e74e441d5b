//! Nearest-name suggestions for unknown identifiers.

/// Levenshtein distance between two strings, counted in characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// The dictionary entry closest to `word`. Ties keep the first entry found.
pub fn nearest<'a, I>(word: &str, dictionary: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let word = word.to_lowercase();
    let mut best: Option<(usize, &'a str)> = None;
    for candidate in dictionary {
        let distance = edit_distance(&word, &candidate.to_lowercase());
        match best {
            Some((min, _)) if distance >= min => {}
            _ => best = Some((distance, candidate)),
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// Message for an unknown name, with a suggestion when the dictionary is not empty.
pub fn unknown_message<'a, I>(word: &str, dictionary: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    match nearest(word, dictionary) {
        Some(suggestion) => format!("{} is unknown. Suggestion: {}", word, suggestion),
        None => format!("{} is unknown.", word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("servers", "server"), 1);
    }

    #[test]
    fn test_nearest_ties_keep_first() {
        assert_eq!(nearest("ab", ["ax", "ay"]), Some("ax"));
        assert_eq!(nearest("ab", Vec::<&str>::new()), None);
    }

    #[test]
    fn test_unknown_message() {
        assert_eq!(
            unknown_message("serie", ["widget", "series"]),
            "serie is unknown. Suggestion: series"
        );
        assert_eq!(unknown_message("x", Vec::<&str>::new()), "x is unknown.");
    }
}
