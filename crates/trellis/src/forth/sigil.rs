//! `$`-sigil expansion.
//!
//! Runs once over a node message before it is interpreted, rewriting each
//! `$<kind><arg>` word to a literal token. Operates on a plain space-split
//! view of the text, so sigils inside quoted spans are rewritten too; node
//! messages like `` `$r1:4 "freq" m-osc` `` rely on that.

use rand::Rng;

pub fn expand(input: &str) -> Result<String, String> {
    let mut words: Vec<String> = input.split(' ').map(str::to_string).collect();

    for word in &mut words {
        if !word.starts_with('$') {
            continue;
        }
        let mut chars = word[1..].chars();
        let Some(kind) = chars.next() else {
            return Err(format!("error processing sigil \"{word}\": missing sigil kind"));
        };
        let replacement = process(kind, chars.as_str())
            .map_err(|reason| format!("error processing sigil \"{word}\": {reason}"))?;
        *word = replacement;
    }

    Ok(words.join(" "))
}

fn process(kind: char, arg: &str) -> Result<String, String> {
    match kind {
        // $r<lo>:<hi>, uniform integer in the inclusive range
        'r' => {
            let (lo, hi) = arg.split_once(':').ok_or_else(|| {
                format!("invalid range format: expected <number>:<number>, got \"{arg}\"")
            })?;
            let lo: i64 = lo
                .parse()
                .map_err(|e| format!("invalid start number: {e}"))?;
            let hi: i64 = hi.parse().map_err(|e| format!("invalid end number: {e}"))?;
            let (lo, hi) = if lo > hi { (hi, lo) } else { (lo, hi) };
            Ok(rand::thread_rng().gen_range(lo..=hi).to_string())
        }
        other => Err(format!("unknown sigil kind \"{other}\"")),
    }
}

#[cfg(test)]
mod tests {
    use super::expand;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(expand("1 2 +"), Ok("1 2 +".to_string()));
    }

    #[test]
    fn range_sigil_expands_within_bounds() {
        for _ in 0..50 {
            let out = expand("$r3:7").unwrap();
            let n: i64 = out.parse().unwrap();
            assert!((3..=7).contains(&n), "{n} out of range");
        }
    }

    #[test]
    fn reversed_bounds_are_normalised() {
        for _ in 0..50 {
            let n: i64 = expand("$r7:3").unwrap().parse().unwrap();
            assert!((3..=7).contains(&n));
        }
    }

    #[test]
    fn degenerate_range_is_constant() {
        assert_eq!(expand("$r5:5"), Ok("5".to_string()));
    }

    #[test]
    fn negative_bounds_work() {
        for _ in 0..50 {
            let n: i64 = expand("$r-2:1").unwrap().parse().unwrap();
            assert!((-2..=1).contains(&n));
        }
    }

    #[test]
    fn surrounding_words_are_kept_in_place() {
        let out = expand("$r1:1 \"freq\" m-osc").unwrap();
        assert_eq!(out, "1 \"freq\" m-osc");
    }

    #[test]
    fn unknown_kind_fails_whole_expansion() {
        let err = expand("1 $z9 2").unwrap_err();
        assert!(err.contains("unknown sigil kind"), "{err}");
    }

    #[test]
    fn malformed_range_fails() {
        assert!(expand("$r10").is_err());
        assert!(expand("$rx:2").is_err());
    }
}
