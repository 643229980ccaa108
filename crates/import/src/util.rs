/// Edit distance over Unicode scalar values, so accented labels count one
/// edit per character rather than per byte.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    let (a, b) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if a.is_empty() {
        return b.len();
    }

    let mut prev: Vec<usize> = (0..=a.len()).collect();
    let mut curr = vec![0usize; a.len() + 1];

    for (j, cb) in b.iter().enumerate() {
        curr[0] = j + 1;
        for (i, ca) in a.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[i + 1] = (prev[i + 1] + 1).min(curr[i] + 1).min(prev[i] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[a.len()]
}

/// Similarity in `0.0..=1.0`; two empty strings are identical.
pub fn similarity(s1: &str, s2: &str) -> f32 {
    let max_len = s1.chars().count().max(s2.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein_distance(s1, s2) as f32 / max_len as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_and_empty() {
        assert_eq!(levenshtein_distance("caisse", "caisse"), 0);
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("", "401"), 3);
        assert_eq!(levenshtein_distance("401", ""), 3);
    }

    #[test]
    fn accents_are_single_edits() {
        assert_eq!(levenshtein_distance("créances", "creances"), 1);
        assert_eq!(levenshtein_distance("libellé", "libelle"), 1);
    }

    #[test]
    fn insertion_and_symmetry() {
        assert_eq!(levenshtein_distance("client", "clients"), 1);
        assert_eq!(
            levenshtein_distance("fournisseur", "frnsr"),
            levenshtein_distance("frnsr", "fournisseur")
        );
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert!(similarity("banque", "banques") > 0.8);
    }
}
