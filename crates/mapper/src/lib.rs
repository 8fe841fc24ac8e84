//! Speaker–Word Mapper (spec.md §4.5), ported from
//! `original_source/app/processing/mapper.py::map_speaker_to_text`.

use confab_domain::{SpeakerRegion, SpeakerSegment, WordSegment};

/// Maps a speaker timeline onto a word-level transcript, single linear pass,
/// `O(words + speakers)`.
///
/// Inputs must be pre-sorted by `start` (the Diarization Worker's regions
/// and the Transcript's word segments both are, by construction). A word's
/// center is `(start + end) / 2`; a word whose center falls strictly before
/// the current speaker segment is a silent gap and is discarded; a word
/// whose center is at or before the segment's end is assigned to it; the
/// cursor never advances past a word that belongs to a later segment, so it
/// is picked up on the next iteration (spec.md's stated tie-break: a
/// boundary-exact center belongs to the earlier segment).
pub fn map_speakers_to_words(
    speaker_timeline: &[SpeakerRegion],
    word_timeline: &[WordSegment],
) -> Vec<SpeakerSegment> {
    let mut out = Vec::new();
    let mut cursor = 0usize;

    for region in speaker_timeline {
        let mut words: Vec<&str> = Vec::new();

        while cursor < word_timeline.len() {
            let word = &word_timeline[cursor];
            let center = (word.start + word.end) / 2.0;

            if center < region.start {
                cursor += 1;
                continue;
            }

            if center <= region.end {
                words.push(&word.text);
                cursor += 1;
            } else {
                break;
            }
        }

        if !words.is_empty() {
            out.push(SpeakerSegment {
                speaker: region.speaker_label.clone(),
                text: words.join(" "),
                start: region.start,
                end: region.end,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64) -> WordSegment {
        WordSegment {
            id: None,
            text: text.to_string(),
            start,
            end,
        }
    }

    fn region(start: f64, end: f64, speaker: &str) -> SpeakerRegion {
        SpeakerRegion {
            start,
            end,
            speaker_label: speaker.to_string(),
        }
    }

    /// spec.md §8 scenario 6, literal inputs.
    #[test]
    fn spec_scenario_boundary_word_goes_to_earlier_segment() {
        let speakers = vec![region(0.0, 5.0, "S1"), region(5.0, 10.0, "S2")];
        let words = vec![
            word("a", 0.1, 0.5),
            word("b", 4.8, 5.2), // center 5.0 -> S1
            word("c", 6.0, 6.4),
        ];

        let result = map_speakers_to_words(&speakers, &words);

        assert_eq!(
            result,
            vec![
                SpeakerSegment {
                    speaker: "S1".into(),
                    text: "a b".into(),
                    start: 0.0,
                    end: 5.0
                },
                SpeakerSegment {
                    speaker: "S2".into(),
                    text: "c".into(),
                    start: 5.0,
                    end: 10.0
                },
            ]
        );
    }

    #[test]
    fn leading_silence_is_discarded() {
        let speakers = vec![region(2.0, 4.0, "S1")];
        let words = vec![word("early", 0.0, 0.5), word("in", 2.5, 3.0)];

        let result = map_speakers_to_words(&speakers, &words);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, "in");
    }

    #[test]
    fn segment_with_no_words_is_not_emitted() {
        let speakers = vec![region(0.0, 1.0, "S1"), region(1.0, 2.0, "S2")];
        let words = vec![word("only", 1.5, 1.6)];

        let result = map_speakers_to_words(&speakers, &words);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].speaker, "S2");
    }

    #[test]
    fn no_word_is_emitted_twice_and_order_is_nondecreasing() {
        let speakers = vec![
            region(0.0, 2.0, "S1"),
            region(2.0, 4.0, "S2"),
            region(4.0, 6.0, "S1"),
        ];
        let words = vec![
            word("one", 0.1, 0.3),
            word("two", 1.9, 2.1), // center 2.0 -> segment ending at 2.0
            word("three", 3.0, 3.2),
            word("four", 5.0, 5.2),
        ];

        let result = map_speakers_to_words(&speakers, &words);

        let all_text: Vec<&str> = result.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(all_text, vec!["one two", "three", "four"]);
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        assert!(map_speakers_to_words(&[], &[]).is_empty());
        assert!(map_speakers_to_words(&[region(0.0, 1.0, "S1")], &[]).is_empty());
    }
}
