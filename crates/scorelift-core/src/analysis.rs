//! Structural summary of a MusicXML document.
//!
//! The summary is informational: it is reported alongside a written score so
//! a caller can tell an engine transcription from the one-note fallback at a
//! glance. A document that does not parse simply has no summary.

use roxmltree::{Document, Node, ParsingOptions};
use serde::Serialize;

const BASE_CONFIDENCE: f64 = 0.6;

/// Element counts for a MusicXML document plus a heuristic confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub parts: usize,
    pub measures: usize,
    pub notes: usize,
    pub rests: usize,
    pub clefs: usize,
    pub time_signatures: usize,
    pub key_signatures: usize,
    /// Heuristic in `[0.0, 1.0]`; see [`ScoreSummary::confidence_for`].
    pub confidence: f64,
}

impl ScoreSummary {
    /// Confidence grows with each kind of element present: notes count for
    /// most, then measures, clefs, time signatures and key signatures.
    #[must_use]
    pub fn confidence_for(&self) -> f64 {
        let mut score = BASE_CONFIDENCE;
        if self.notes > 0 {
            score += 0.2;
        }
        if self.measures > 0 {
            score += 0.1;
        }
        if self.clefs > 0 {
            score += 0.05;
        }
        if self.time_signatures > 0 {
            score += 0.03;
        }
        if self.key_signatures > 0 {
            score += 0.02;
        }
        score.min(1.0)
    }
}

/// Parse `musicxml` and count its parts, measures and notes.
///
/// Only `score-partwise` documents are counted; any other well-formed root
/// yields an all-zero summary. Returns `None` if the text is not XML.
pub fn analyze(musicxml: &str) -> Option<ScoreSummary> {
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };

    let doc = match Document::parse_with_options(musicxml, opts) {
        Ok(doc) => doc,
        Err(e) => {
            log::debug!("MusicXML analysis skipped: {e}");
            return None;
        }
    };

    let mut summary = ScoreSummary::default();
    let root = doc.root_element();

    if root.has_tag_name("score-partwise") {
        for part in children_named(root, "part") {
            summary.parts += 1;
            for measure in children_named(part, "measure") {
                summary.measures += 1;
                count_measure(measure, &mut summary);
            }
        }
    }

    summary.confidence = summary.confidence_for();
    Some(summary)
}

fn count_measure(measure: Node<'_, '_>, summary: &mut ScoreSummary) {
    for note in children_named(measure, "note") {
        if note.children().any(|c| c.has_tag_name("rest")) {
            summary.rests += 1;
        } else {
            summary.notes += 1;
        }
    }

    for attributes in children_named(measure, "attributes") {
        if attributes.children().any(|c| c.has_tag_name("clef")) {
            summary.clefs += 1;
        }
        if attributes.children().any(|c| c.has_tag_name("time")) {
            summary.time_signatures += 1;
        }
        if attributes.children().any(|c| c.has_tag_name("key")) {
            summary.key_signatures += 1;
        }
    }
}

fn children_named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |c| c.has_tag_name(name))
}
