//! Word-gap encoding: one space after a word is a 0 bit, two spaces a 1.

use crate::bits::{bits_to_bytes, bytes_to_bits};
use crate::error::{Error, Result};
use crate::text::TextReport;
use tracing::debug;

/// Split text into words (maximal runs of non-whitespace).
pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Number of bits the cover text can carry, terminator included.
pub fn capacity(text: &str) -> usize {
    words(text).len()
}

/// Hide `message` in the gaps after the words of `cover`.
///
/// The message is followed by a zero byte. The original line structure of
/// the cover is not kept: words are rejoined with spaces only.
pub fn embed(cover: &str, message: &[u8]) -> Result<(String, TextReport)> {
    let words = words(cover);
    if words.is_empty() {
        return Err(Error::NoWords);
    }

    let mut payload = message.to_vec();
    payload.push(0);
    let bits = bytes_to_bits(&payload);

    if words.len() < bits.len() {
        return Err(Error::InsufficientCapacity {
            needed: bits.len(),
            available: words.len(),
        });
    }

    let mut out = String::with_capacity(cover.len() + bits.len());
    for (i, word) in words.iter().enumerate() {
        out.push_str(word);
        out.push_str(match bits.get(i) {
            Some(1) => "  ",
            _ => " ",
        });
    }

    let report = TextReport::new(words.len(), bits.len());
    debug!(words = report.words, bits = report.bits_used, "Embedded text payload");
    Ok((out, report))
}

/// Recover a message hidden by [`embed`].
///
/// Gaps of exactly one or two spaces carry bits; any other whitespace run is
/// ignored. Decoding stops at the first zero byte.
pub fn extract(stego: &str) -> Vec<u8> {
    let mut bits = Vec::new();
    let mut run = String::new();

    for ch in stego.chars() {
        if ch.is_whitespace() {
            run.push(ch);
            continue;
        }
        push_gap(&run, &mut bits);
        run.clear();
    }
    push_gap(&run, &mut bits);

    bits_to_bytes(&bits)
        .into_iter()
        .take_while(|&b| b != 0)
        .collect()
}

fn push_gap(run: &str, bits: &mut Vec<u8>) {
    match run {
        " " => bits.push(0),
        "  " => bits.push(1),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cover(words: usize) -> String {
        (0..words)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_roundtrip() {
        let (stego, report) = embed(&cover(100), b"Hi!").unwrap();
        assert_eq!(extract(&stego), b"Hi!");
        assert_eq!(report.words, 100);
        assert_eq!(report.bits_used, 32);
        assert!((report.utilisation - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_layout() {
        // "A" = 0100_0001, then the terminator.
        let (stego, _) = embed(&cover(17), b"A").unwrap();
        assert!(stego.starts_with("w0 w1  w2 w3 "));
        assert!(stego.ends_with("w16 "));
        assert!(!stego.contains('\n'));
    }

    #[test]
    fn test_exact_capacity() {
        let (stego, _) = embed(&cover(16), b"z").unwrap();
        assert_eq!(extract(&stego), b"z");
    }

    #[test]
    fn test_insufficient_words() {
        let result = embed(&cover(15), b"z");
        assert!(matches!(
            result,
            Err(Error::InsufficientCapacity {
                needed: 16,
                available: 15
            })
        ));
    }

    #[test]
    fn test_empty_cover() {
        assert!(matches!(embed("  \n\t ", b""), Err(Error::NoWords)));
    }

    #[test]
    fn test_other_whitespace_ignored() {
        // Tabs and triple spaces carry nothing.
        let (stego, _) = embed(&cover(20), b"k").unwrap();
        let noisy = format!("intro\t{stego}");
        assert_eq!(extract(&noisy), b"k");
        assert_eq!(extract("a   b\tc\n\nd"), b"");
    }

    #[test]
    fn test_capacity_counts_words() {
        assert_eq!(capacity("one two\n three\t\tfour"), 4);
        assert_eq!(words("  lead trail  "), vec!["lead", "trail"]);
    }
}
